use recordit_macros::Entity;

#[derive(Entity)]
struct User {
    #[fetch(primary)]
    id: i64,
}

fn main() {}
