use recordit_macros::Entity;

#[derive(Entity)]
#[entity(table = "user accounts")]
struct User {
    id: i64,
}

fn main() {}
