//! Resolution of table names, primary keys and column names from entity metadata.

use inflections::Inflect;

use crate::{Entity, FieldDescriptor};

/// Primary key column used when an entity declares no override.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// Serialization-version fields never map to a column.
const VERSION_FIELDS: [&str; 2] = ["serialVersionUID", "serial_version_uid"];

/// Table and primary key names resolved for one entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMeta {
    pub table: String,
    pub primary_key: String,
}

/// Resolve the table and primary key for `E`. Never fails: missing overrides
/// fall back to derived defaults.
pub fn resolve<E: Entity>(table_prefix: &str) -> TableMeta {
    let table = match E::TABLE {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => to_table_name(E::TYPE_NAME, table_prefix),
    };
    let primary_key = E::PRIMARY_KEY.unwrap_or(DEFAULT_PRIMARY_KEY).to_string();
    TableMeta { table, primary_key }
}

/// `Order` with prefix `app_` becomes `app_orders`; `UserInfo` becomes `user_infos`.
pub fn to_table_name(type_name: &str, table_prefix: &str) -> String {
    format!("{}{}", table_prefix, pluralize(&type_name.to_snake_case()))
}

/// Field name to column name: `userName` and `user_name` both become `user_name`.
pub fn to_column_name(field: &str) -> String {
    field.to_snake_case()
}

fn pluralize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix('y') {
        let before = stem.chars().last();
        if before.is_some_and(|c| !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')) {
            return format!("{}ies", stem);
        }
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|s| word.ends_with(s)) {
        return format!("{}es", word);
    }
    format!("{}s", word)
}

/// Whether a field takes part in persistence at all.
///
/// Knows nothing about per-query exclusions; those are applied by the caller.
pub fn is_mapping(field: &FieldDescriptor) -> bool {
    if VERSION_FIELDS.contains(&field.name) {
        return false;
    }
    field.kind.is_supported()
}
