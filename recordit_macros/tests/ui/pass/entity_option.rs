use recordit_core::{Entity, FieldKind, FromRow, Row, Value};
use recordit_macros::Entity;

#[derive(Entity, Clone, Debug, PartialEq)]
struct UserInfo {
    #[fetch(id)]
    id: Option<i64>,
    nick_name: Option<String>,
    tags: Vec<String>,
}

fn main() {
    assert_eq!(UserInfo::TABLE, None);
    assert_eq!(UserInfo::PRIMARY_KEY, Some("id"));
    assert_eq!(UserInfo::FIELDS[0].kind, FieldKind::I64);
    assert_eq!(UserInfo::FIELDS[2].kind, FieldKind::Unsupported);

    let u = UserInfo { id: None, nick_name: Some("jo".into()), tags: vec![] };
    assert_eq!(u.field_value("id"), Some(Value::Null));
    assert_eq!(u.field_value("tags"), None);

    let row = Row::from_pairs([("id", Value::I64(3)), ("nick_name", Value::Null)]);
    let back = UserInfo::from_row(&row).unwrap();
    assert_eq!(back, UserInfo { id: Some(3), nick_name: None, tags: vec![] });
}
