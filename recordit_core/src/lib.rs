#![forbid(unsafe_code)]
//! Core traits for the recordit active-record library.
//! This crate is database-agnostic and should not contain any backend-specific logic.

pub mod config;
pub mod meta;
mod row;
mod value;

pub use row::Row;
pub use value::{FromValue, MappingError, Value};

/// The closed set of scalar kinds a field may have.
///
/// `Unsupported` covers everything else (collections, nested structs, arrays,
/// 64-bit unsigned integers); such fields never take part in persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    F32,
    F64,
    Char,
    String,
    Unsupported,
}

impl FieldKind {
    pub fn is_supported(self) -> bool {
        !matches!(self, FieldKind::Unsupported)
    }
}

/// Compile-time description of one entity field and the column it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, column: &'static str, kind: FieldKind) -> Self {
        Self { name, column, kind }
    }
}

/// Metadata for a mapped entity type. Implemented via `#[derive(Entity)]`.
///
/// Everything here is known before any instance exists; table and primary key
/// names are resolved from it by [`meta::resolve`].
pub trait Entity {
    /// Simple name of the Rust type, used to derive the default table name.
    const TYPE_NAME: &'static str;

    /// Explicit table name from `#[entity(table = "...")]`.
    const TABLE: Option<&'static str>;

    /// Explicit primary key column from `#[entity(pk = "...")]`.
    const PRIMARY_KEY: Option<&'static str>;

    /// Non-skipped fields in declaration order.
    const FIELDS: &'static [FieldDescriptor];

    /// Current value of the named field, or `None` when the field is unknown
    /// or its kind cannot be converted into a [`Value`].
    fn field_value(&self, field: &str) -> Option<Value>;
}

/// Builds an entity from a backend-neutral [`Row`].
#[allow(clippy::wrong_self_convention)]
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> RecordResult<Self>;
}

/// Error type shared by every recordit layer.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The process-wide configuration (or the executor it carries) is missing.
    #[error("configuration error: {0}")]
    Config(String),
    /// Error while reading an entity field or mapping a row into an entity.
    #[error("mapping error")]
    Mapping {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Opaque error from the execution collaborator.
    #[error("backend error")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl RecordError {
    pub fn config(msg: impl Into<String>) -> Self {
        RecordError::Config(msg.into())
    }
    /// Wrap a backend/driver error.
    pub fn backend<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RecordError::Backend {
            source: Box::new(e),
        }
    }
    /// Wrap a row or field mapping error.
    pub fn mapping<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RecordError::Mapping {
            source: Box::new(e),
        }
    }
}

/// Convenience alias for results returned by recordit operations.
pub type RecordResult<T> = Result<T, RecordError>;

/// The execution collaborator: hands out one connection per statement.
pub trait Executor: Send + Sync {
    /// Acquire a connection. Dropping the returned handle releases it.
    fn connect(&self) -> RecordResult<Box<dyn Connection + '_>>;
}

/// A connection-scoped handle able to run parametrized statements.
///
/// Implementations are responsible for expanding a [`Value::List`] bound to a
/// single `?` into a positional list.
pub trait Connection {
    /// Run a read and return every row.
    fn query(&mut self, sql: &str, params: &[Value]) -> RecordResult<Vec<Row>>;

    /// Run a read and return only the first row, if any.
    fn query_first(&mut self, sql: &str, params: &[Value]) -> RecordResult<Option<Row>> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    /// Run an insert and return the key the backend generated for the new row.
    fn insert(&mut self, sql: &str, params: &[Value]) -> RecordResult<i64>;
}
