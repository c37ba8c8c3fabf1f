//! Common testing utilities: a shared entity, its schema, a recording
//! in-memory executor, and scenarios reusable across real backends.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use recordit::{Config, Entity, Query};
use recordit_core::{Connection, Executor, RecordError, RecordResult, Row, Value};

#[derive(Entity, Clone, Debug, PartialEq)]
#[entity(table = "users")] // consistent across backends
pub struct User {
    #[fetch(id)]
    pub id: Option<i64>,
    pub name: Option<String>,
    pub age: i32,
    pub active: bool,
}

impl User {
    pub fn new(name: &str, age: i32) -> Self {
        Self {
            id: None,
            name: Some(name.to_string()),
            age,
            active: true,
        }
    }
}

/// Expose migration SQL via constants for harnesses.
pub mod migrations {
    pub const LIBSQL_USERS_SQL: &str = include_str!("../migrations/libsql/001_users.sql");
}

/// One statement as received by [`RecordingExecutor`].
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub sql: String,
    pub params: Vec<Value>,
    /// The statement after `IN ?` expansion, as a real backend would run it.
    pub expanded_sql: String,
    pub expanded_params: Vec<Value>,
}

#[derive(Default)]
struct RecState {
    statements: Vec<Recorded>,
    responses: VecDeque<Vec<Row>>,
    fail_next: Option<String>,
    next_key: i64,
    opened: usize,
    open: usize,
}

/// An executor that records every statement and serves queued rows.
///
/// Queries without a queued response return no rows; inserts return
/// increasing keys starting at 1.
#[derive(Clone, Default)]
pub struct RecordingExecutor {
    state: Arc<Mutex<RecState>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RecState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue the rows returned by the next query.
    pub fn push_rows(&self, rows: Vec<Row>) {
        self.lock().responses.push_back(rows);
    }

    /// Make the next statement fail with a backend error.
    pub fn fail_next(&self, message: &str) {
        self.lock().fail_next = Some(message.to_string());
    }

    pub fn statements(&self) -> Vec<Recorded> {
        self.lock().statements.clone()
    }

    pub fn last(&self) -> Option<Recorded> {
        self.lock().statements.last().cloned()
    }

    pub fn connections_opened(&self) -> usize {
        self.lock().opened
    }

    /// Connections acquired and not yet released.
    pub fn connections_open(&self) -> usize {
        self.lock().open
    }

    /// Wrap this executor in a configuration sharing the same recorded state.
    pub fn config(&self) -> Arc<Config> {
        Arc::new(Config::new(self.clone()))
    }

    pub fn config_with_prefix(&self, prefix: &str) -> Arc<Config> {
        Arc::new(Config::new(self.clone()).with_table_prefix(prefix))
    }

    fn record(&self, sql: &str, params: &[Value]) -> RecordResult<()> {
        let (expanded_sql, expanded_params) =
            recordit_sql_builder::expand_params(sql, params).map_err(RecordError::backend)?;
        let mut g = self.lock();
        g.statements.push(Recorded {
            sql: sql.to_string(),
            params: params.to_vec(),
            expanded_sql,
            expanded_params,
        });
        match g.fail_next.take() {
            Some(msg) => Err(RecordError::backend(std::io::Error::new(
                std::io::ErrorKind::Other,
                msg,
            ))),
            None => Ok(()),
        }
    }
}

struct RecordingConnection<'a> {
    executor: &'a RecordingExecutor,
}

impl Drop for RecordingConnection<'_> {
    fn drop(&mut self) {
        self.executor.lock().open -= 1;
    }
}

impl Connection for RecordingConnection<'_> {
    fn query(&mut self, sql: &str, params: &[Value]) -> RecordResult<Vec<Row>> {
        self.executor.record(sql, params)?;
        Ok(self.executor.lock().responses.pop_front().unwrap_or_default())
    }

    fn insert(&mut self, sql: &str, params: &[Value]) -> RecordResult<i64> {
        self.executor.record(sql, params)?;
        let mut g = self.executor.lock();
        g.next_key += 1;
        Ok(g.next_key)
    }
}

impl Executor for RecordingExecutor {
    fn connect(&self) -> RecordResult<Box<dyn Connection + '_>> {
        let mut g = self.lock();
        g.opened += 1;
        g.open += 1;
        Ok(Box::new(RecordingConnection { executor: self }))
    }
}

/// Build a `users` row the way a backend would return it.
pub fn user_row(id: i64, name: Option<&str>, age: i32, active: bool) -> Row {
    Row::from_pairs([
        ("id", Value::I64(id)),
        ("name", Value::from(name)),
        ("age", Value::from(age)),
        ("active", Value::I64(active as i64)),
    ])
}

// --- scenarios for real backends; each expects an empty `users` table ---

/// Save then read back through find_by_id, all and count.
pub fn test_save_and_find(config: &Arc<Config>) -> RecordResult<()> {
    let mut q = Query::<User>::with_config(config.clone());
    let id: i64 = q.save(&User::new("jack", 20))?;
    let _: i64 = q.save(&User::new("rose", 10))?;

    let found = q.find_by_id(id)?.expect("saved user is found");
    assert_eq!(found.name.as_deref(), Some("jack"));
    assert_eq!(found.age, 20);
    assert!(found.active);

    assert!(q.find_by_id(id + 1000)?.is_none());
    assert_eq!(q.all()?.len(), 2);
    assert_eq!(q.count()?, 2);
    Ok(())
}

/// Predicates, IN expansion, ordering and pagination against real SQL.
pub fn test_predicates(config: &Arc<Config>) -> RecordResult<()> {
    let mut q = Query::<User>::with_config(config.clone());
    let mut ids = Vec::new();
    for (name, age) in [("a", 12), ("b", 16), ("c", 30), ("d", 45)] {
        ids.push(q.save::<i64>(&User::new(name, age))?);
    }
    let mut nameless = User::new("x", 50);
    nameless.name = None;
    q.save::<i64>(&nameless)?;

    assert_eq!(q.where_value("age > ?", 15).is_not_null("name").count()?, 3);
    assert_eq!(q.count()?, 5);

    let picked = q.in_("id", ids[..3].to_vec()).order("age DESC").all()?;
    let ages: Vec<i32> = picked.iter().map(|u| u.age).collect();
    assert_eq!(ages, vec![30, 16, 12]);

    assert_eq!(q.like("name", "%b%").all()?.len(), 1);
    assert_eq!(q.not("name", "a").is_not_null("name").count()?, 3);
    assert_eq!(q.in_("id", Vec::<i64>::new()).count()?, 0);

    let page = q.order("age ASC").page(2, 2)?;
    assert_eq!(page.total, 5);
    assert_eq!(page.items.iter().map(|u| u.age).collect::<Vec<_>>(), vec![30, 45]);

    let top = q.order("age DESC").limit(1)?;
    assert_eq!(top[0].age, 50);
    Ok(())
}

/// Excluded fields fall back to column defaults; narrowed projections default the rest.
pub fn test_exclude_and_projection(config: &Arc<Config>) -> RecordResult<()> {
    let mut q = Query::<User>::with_config(config.clone());
    let mut u = User::new("eve", 33);
    u.active = false;
    let id: i64 = q.exclude(["active"]).save(&u)?;

    let stored = q.find_by_id(id)?.expect("row exists");
    assert!(stored.active, "excluded column takes the table default");

    let narrow = q.select("id, name").all()?;
    assert_eq!(narrow[0].name.as_deref(), Some("eve"));
    assert_eq!(narrow[0].age, 0);
    Ok(())
}
