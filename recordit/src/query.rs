//! The per-entity query builder.
//!
//! A [`Query`] accumulates predicate, grouping and ordering fragments plus
//! positional parameters across chained calls. Each terminal call takes the
//! accumulated state out of the builder before doing anything else, so the
//! builder is fresh again afterwards whether the call succeeded or not.

use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use recordit_core::config::{self, Config};
use recordit_core::meta;
use recordit_core::{
    Connection, Entity, FromRow, MappingError, RecordError, RecordResult, Row, Value,
};
use recordit_sql_builder::{Conditions, SelectParts, DEFAULT_PROJECTION};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// One page of entities plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    /// 1-based page number.
    pub page: usize,
    pub size: usize,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> usize {
        if self.size == 0 {
            0
        } else {
            (self.total + self.size - 1) / self.size
        }
    }
}

/// Mutable builder state, reset after every terminal call.
#[derive(Debug, Clone, Default, PartialEq)]
struct Clauses {
    conditions: Conditions,
    order: Vec<String>,
    group: Vec<String>,
    excluded: BTreeSet<String>,
    projection: Option<String>,
}

/// A stateful query builder bound to the entity type `T`.
///
/// Fragment methods take raw, trusted SQL and are not validated. Builders are
/// owned by a single call chain; use one per thread.
pub struct Query<T> {
    table: String,
    primary_key: String,
    config: Option<Arc<Config>>,
    state: Clauses,
    _marker: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("table", &self.table)
            .field("primary_key", &self.primary_key)
            .field("state", &self.state)
            .finish()
    }
}

impl<T: Entity> Default for Query<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> Query<T> {
    /// A builder using the process-wide configuration.
    ///
    /// Construction never fails; a missing executor is reported by the first
    /// terminal call.
    pub fn new() -> Self {
        Self::build(config::current(), false)
    }

    /// A builder bound to an explicit configuration instead of the global one.
    pub fn with_config(config: Arc<Config>) -> Self {
        Self::build(Some(config), true)
    }

    fn build(config: Option<Arc<Config>>, pinned: bool) -> Self {
        let prefix = config.as_deref().map(Config::table_prefix).unwrap_or("");
        let meta = meta::resolve::<T>(prefix);
        Self {
            table: meta.table,
            primary_key: meta.primary_key,
            config: if pinned { config } else { None },
            state: Clauses::default(),
            _marker: PhantomData,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Accumulated predicate text, each fragment prefixed with `" AND "`.
    pub fn predicate(&self) -> &str {
        self.state.conditions.text()
    }

    /// Bound parameters in placeholder order.
    pub fn params(&self) -> &[Value] {
        self.state.conditions.params()
    }

    pub fn order_clauses(&self) -> &[String] {
        &self.state.order
    }

    pub fn excluded(&self) -> impl Iterator<Item = &str> {
        self.state.excluded.iter().map(String::as_str)
    }

    /// True when nothing has been accumulated since construction or the last terminal call.
    pub fn is_fresh(&self) -> bool {
        self.state == Clauses::default()
    }

    // --- fragment accumulation ---

    /// `AND <predicate>`, no parameter.
    pub fn where_(&mut self, predicate: &str) -> &mut Self {
        self.state.conditions.and(predicate);
        self
    }

    /// `AND <predicate>` where the predicate holds exactly one `?`.
    pub fn where_value(&mut self, predicate: &str, value: impl Into<Value>) -> &mut Self {
        self.state.conditions.and_bind(predicate, value.into());
        self
    }

    /// `AND <column> != ?`
    #[allow(clippy::should_implement_trait)]
    pub fn not(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.state
            .conditions
            .and_bind(&format!("{} != ?", column), value.into());
        self
    }

    /// `AND <column> IS NOT NULL`
    pub fn is_not_null(&mut self, column: &str) -> &mut Self {
        self.state
            .conditions
            .and(&format!("{} IS NOT NULL", column));
        self
    }

    /// `AND <column> LIKE ?`
    pub fn like(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.state
            .conditions
            .and_bind(&format!("{} LIKE ?", column), value.into());
        self
    }

    /// `AND <column> IN ?`, binding the whole collection as one list parameter.
    /// The executor expands it into a positional list.
    pub fn in_<I, V>(&mut self, column: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let list = Value::List(values.into_iter().map(Into::into).collect());
        self.state
            .conditions
            .and_bind(&format!("{} IN ?", column), list);
        self
    }

    /// Append a raw ordering fragment such as `"age DESC"`.
    pub fn order(&mut self, clause: &str) -> &mut Self {
        self.state.order.push(clause.to_string());
        self
    }

    /// Append a GROUP BY column.
    pub fn group(&mut self, column: &str) -> &mut Self {
        self.state.group.push(column.to_string());
        self
    }

    /// Project `DISTINCT <column>` instead of `*`.
    pub fn distinct(&mut self, column: &str) -> &mut Self {
        self.state.projection = Some(format!("DISTINCT {}", column));
        self
    }

    /// Override the `*` projection of read queries.
    pub fn select(&mut self, columns: &str) -> &mut Self {
        self.state.projection = Some(columns.to_string());
        self
    }

    /// Leave the named fields out of the next `save`. Reads are unaffected.
    pub fn exclude<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.excluded.extend(fields.into_iter().map(Into::into));
        self
    }

    // --- terminal helpers ---

    fn take_state(&mut self) -> Clauses {
        std::mem::take(&mut self.state)
    }

    fn config(&self) -> RecordResult<Arc<Config>> {
        match &self.config {
            Some(c) => Ok(c.clone()),
            None => config::require(),
        }
    }

    /// Run `f` on a freshly acquired connection, released when this returns.
    fn execute<R>(
        &self,
        config: &Config,
        op: &'static str,
        sql: &str,
        params: &[Value],
        f: impl FnOnce(&mut dyn Connection) -> RecordResult<R>,
    ) -> RecordResult<R> {
        debug!(table = %self.table, op, sql, params = params.len(), "executing statement");
        let result = config
            .executor()
            .connect()
            .and_then(|mut conn| f(conn.as_mut()));
        if let Err(e) = &result {
            warn!(table = %self.table, op, error = %e, "statement failed");
        }
        result
    }

    /// Insert `entity` and return the key the backend generated for it.
    ///
    /// Fields are written in declaration order, skipping excluded names,
    /// serialization-version fields and unsupported kinds.
    pub fn save<K: DeserializeOwned>(&mut self, entity: &T) -> RecordResult<K> {
        let state = self.take_state();
        let config = self.config()?;

        let mut columns = Vec::with_capacity(T::FIELDS.len());
        let mut values = Vec::with_capacity(T::FIELDS.len());
        for field in T::FIELDS {
            if state.excluded.contains(field.name) || !meta::is_mapping(field) {
                continue;
            }
            let value = entity.field_value(field.name).ok_or_else(|| {
                RecordError::mapping(MappingError::UnreadableField {
                    entity: T::TYPE_NAME,
                    field: field.name,
                })
            })?;
            columns.push(field.column);
            values.push(value);
        }
        if columns.is_empty() {
            return Err(RecordError::mapping(MappingError::NothingToSave(
                T::TYPE_NAME,
            )));
        }

        let sql = recordit_sql_builder::insert(&self.table, &columns);
        let key = self.execute(&config, "save", &sql, &values, |conn| {
            conn.insert(&sql, &values)
        })?;
        serde_json::from_value(serde_json::Value::from(key)).map_err(RecordError::mapping)
    }
}

fn map_rows<T: FromRow>(rows: Vec<Row>) -> RecordResult<Vec<T>> {
    rows.iter().map(T::from_row).collect()
}

impl<T: Entity + FromRow> Query<T> {
    fn select_parts<'a>(&'a self, state: &'a Clauses) -> SelectParts<'a> {
        SelectParts {
            columns: state.projection.as_deref().unwrap_or(DEFAULT_PROJECTION),
            table: &self.table,
            where_sql: state.conditions.where_sql(),
            group_by: &state.group,
            order_by: &state.order,
        }
    }

    /// Fetch the row whose primary key equals `id`; `Ok(None)` when there is none.
    pub fn find_by_id(&mut self, id: impl Into<Value>) -> RecordResult<Option<T>> {
        let state = self.take_state();
        let config = self.config()?;
        let columns = state.projection.as_deref().unwrap_or(DEFAULT_PROJECTION);
        let sql = recordit_sql_builder::select_by_id(columns, &self.table, &self.primary_key);
        let params: [Value; 1] = [id.into()];
        let row = self.execute(&config, "find_by_id", &sql, &params, |conn| {
            conn.query_first(&sql, &params)
        })?;
        row.as_ref().map(T::from_row).transpose()
    }

    /// Fetch every row matching the accumulated predicates, grouping and ordering.
    pub fn all(&mut self) -> RecordResult<Vec<T>> {
        let state = self.take_state();
        let config = self.config()?;
        let sql = recordit_sql_builder::select(&self.select_parts(&state));
        let params = state.conditions.params();
        let rows = self.execute(&config, "all", &sql, params, |conn| {
            conn.query(&sql, params)
        })?;
        map_rows(rows)
    }

    /// Like [`Query::all`], keeping at most `n` rows.
    pub fn limit(&mut self, n: usize) -> RecordResult<Vec<T>> {
        let state = self.take_state();
        let config = self.config()?;
        let sql =
            recordit_sql_builder::select_with_pagination(&self.select_parts(&state), Some(n), None);
        let params = state.conditions.params();
        let rows = self.execute(&config, "limit", &sql, params, |conn| {
            conn.query(&sql, params)
        })?;
        map_rows(rows)
    }

    /// Fetch one 1-based page of `size` rows together with the total match count.
    /// Page 0 is treated as page 1.
    pub fn page(&mut self, page: usize, size: usize) -> RecordResult<Page<T>> {
        let state = self.take_state();
        let config = self.config()?;
        let page = page.max(1);
        let parts = self.select_parts(&state);
        let count_sql = recordit_sql_builder::select_count_of(&parts);
        let sql = recordit_sql_builder::select_with_pagination(
            &parts,
            Some(size),
            Some((page - 1).saturating_mul(size)),
        );
        let params = state.conditions.params();
        let (total, rows) = self.execute(&config, "page", &sql, params, |conn| {
            let total = count_from(conn.query_first(&count_sql, params)?)?;
            let rows = conn.query(&sql, params)?;
            Ok((total, rows))
        })?;
        let total = usize::try_from(total).map_err(|_| {
            RecordError::mapping(MappingError::OutOfRange {
                target: "usize",
                value: total,
            })
        })?;
        Ok(Page {
            items: map_rows(rows)?,
            total,
            page,
            size,
        })
    }

    /// `SELECT COUNT(*)` over the accumulated predicates.
    pub fn count(&mut self) -> RecordResult<i64> {
        let state = self.take_state();
        let config = self.config()?;
        let sql = recordit_sql_builder::select_count(&self.table, state.conditions.where_sql());
        let params = state.conditions.params();
        let row = self.execute(&config, "count", &sql, params, |conn| {
            conn.query_first(&sql, params)
        })?;
        count_from(row)
    }
}

fn count_from(row: Option<Row>) -> RecordResult<i64> {
    match row {
        Some(r) => r.get_index(0),
        None => Ok(0),
    }
}
