use recordit_macros::Entity;

#[derive(Entity)]
enum Status {
    Active,
}

fn main() {}
