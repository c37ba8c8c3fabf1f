#![forbid(unsafe_code)]
//! Facade crate for the `recordit` active-record library.
//!
//! This crate provides the main public API: it re-exports the core traits and
//! the `Entity` derive, and owns the [`Query`] builder that compiles chained
//! predicates into SQL and runs them through the configured executor.
//!
//! # Example
//!
//! ```ignore
//! // Non-runnable: needs an installed executor (see `recordit_libsql`).
//! use recordit::{ActiveRecord, Entity};
//!
//! // The table name is deduced by pluralizing the snake_case struct name
//! // (`users`), prefixed with the configured table prefix.
//! #[derive(Entity, Debug, Clone)]
//! pub struct User {
//!     pub id: Option<i64>,
//!     pub name: Option<String>,
//!     pub age: i32,
//! }
//!
//! recordit::config::install(recordit::Config::new(executor));
//!
//! let adults = User::where_value("age > ?", 15).is_not_null("name").count()?;
//! let user = User::find_by_id(2)?;
//! let id: i64 = User { id: None, name: Some("jack".into()), age: 20 }.save()?;
//! ```

mod query;

pub use query::{Page, Query};

// Re-export all core traits and types.
pub use recordit_core::config::{self, Config};
pub use recordit_core::meta;
pub use recordit_core::{
    Connection, Entity, Executor, FieldDescriptor, FieldKind, FromRow, FromValue, MappingError,
    RecordError, RecordResult, Row, Value,
};

// Re-export the derive macro.
pub use recordit_macros::Entity;

// Re-export the SQL builder helpers.
pub use recordit_sql_builder as sql_builder;

use serde::de::DeserializeOwned;

/// Active-record entry points available on every derived entity type.
///
/// Each call starts a fresh [`Query`] against the process-wide configuration,
/// so `User::where_value("age > ?", 15).count()` reads like the model itself
/// is being queried. `group`, `distinct` and the paging calls start from
/// [`ActiveRecord::query`].
pub trait ActiveRecord: Entity + FromRow + Sized {
    fn query() -> Query<Self> {
        Query::new()
    }

    fn find_by_id(id: impl Into<Value>) -> RecordResult<Option<Self>> {
        Self::query().find_by_id(id)
    }

    fn all() -> RecordResult<Vec<Self>> {
        Self::query().all()
    }

    fn count() -> RecordResult<i64> {
        Self::query().count()
    }

    fn where_(predicate: &str) -> Query<Self> {
        let mut q = Self::query();
        q.where_(predicate);
        q
    }

    fn where_value(predicate: &str, value: impl Into<Value>) -> Query<Self> {
        let mut q = Self::query();
        q.where_value(predicate, value);
        q
    }

    fn in_<I, V>(column: &str, values: I) -> Query<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut q = Self::query();
        q.in_(column, values);
        q
    }

    #[allow(clippy::should_implement_trait)]
    fn not(column: &str, value: impl Into<Value>) -> Query<Self> {
        let mut q = Self::query();
        q.not(column, value);
        q
    }

    fn is_not_null(column: &str) -> Query<Self> {
        let mut q = Self::query();
        q.is_not_null(column);
        q
    }

    fn like(column: &str, value: impl Into<Value>) -> Query<Self> {
        let mut q = Self::query();
        q.like(column, value);
        q
    }

    fn order(clause: &str) -> Query<Self> {
        let mut q = Self::query();
        q.order(clause);
        q
    }

    fn select(columns: &str) -> Query<Self> {
        let mut q = Self::query();
        q.select(columns);
        q
    }

    fn exclude<I, S>(fields: I) -> Query<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut q = Self::query();
        q.exclude(fields);
        q
    }

    /// Insert this entity and return the generated key.
    fn save<K: DeserializeOwned>(&self) -> RecordResult<K> {
        Self::query().save(self)
    }
}

impl<T: Entity + FromRow> ActiveRecord for T {}

// Backend executors re-exported under a neutral namespace, so end-users don't
// have to depend on backend crates directly. These are feature-gated.
pub mod backends {
    #[cfg(feature = "libsql-backend")]
    pub use recordit_libsql::LibsqlExecutor;
}
