use recordit_core::{Entity, FieldKind};
use recordit_macros::Entity;

#[derive(Entity, Clone, Debug, PartialEq)]
#[entity(table = "people", pk = "person_id")]
struct Person {
    person_id: i64,
    #[fetch(column = "email_address")]
    email: String,
    #[fetch(column = "full_name")]
    name: String,
    #[fetch(skip)]
    cache: Vec<String>,
}

fn main() {
    assert_eq!(Person::TYPE_NAME, "Person");
    assert_eq!(Person::TABLE, Some("people"));
    assert_eq!(Person::PRIMARY_KEY, Some("person_id"));
    let columns: Vec<_> = Person::FIELDS.iter().map(|f| f.column).collect();
    assert_eq!(columns, ["person_id", "email_address", "full_name"]);
    assert_eq!(Person::FIELDS[1].kind, FieldKind::String);
}
