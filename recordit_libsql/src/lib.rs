#![forbid(unsafe_code)]
#![cfg_attr(
    not(feature = "libsql-backend"),
    doc = "Enable feature `libsql-backend` to use this executor."
)]

#[cfg(feature = "libsql-backend")]
mod backend {
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Instant;

    use libsql::Database;
    use recordit_core::{Connection, Executor, RecordError, RecordResult, Row, Value};
    use tokio::runtime::Runtime;

    #[cfg(feature = "tracing")]
    use tracing::info;

    #[inline]
    #[allow(unused_variables)]
    fn obs_record(op: &str, start: Instant, rows: usize, success: bool) {
        let elapsed = start.elapsed().as_millis() as u64;
        #[cfg(feature = "tracing")]
        {
            info!(
                sql_kind = "sql",
                op = op,
                rows = rows,
                elapsed_ms = elapsed,
                success = success,
                "record op"
            );
        }
        #[cfg(feature = "metrics")]
        {
            metrics::counter!("record_ops_total", 1, "op" => op.to_string(), "success" => success.to_string());
            metrics::histogram!("record_op_duration_ms", elapsed as f64, "op" => op.to_string());
            if !success {
                metrics::counter!("record_op_errors_total", 1, "op" => op.to_string());
            }
        }
    }

    fn invalid_param(msg: &str) -> RecordError {
        RecordError::backend(std::io::Error::new(std::io::ErrorKind::InvalidInput, msg.to_string()))
    }

    // Convert a flattened recordit value into a libsql parameter.
    fn to_libsql_value(v: Value) -> RecordResult<libsql::Value> {
        Ok(match v {
            Value::Null => libsql::Value::Null,
            Value::Bool(b) => libsql::Value::Integer(b as i64), // SQLite bools are 0/1
            Value::I64(i) => libsql::Value::Integer(i),
            Value::F64(f) => libsql::Value::Real(f),
            Value::String(s) => libsql::Value::Text(s),
            Value::Bytes(b) => libsql::Value::Blob(b),
            Value::List(_) => return Err(invalid_param("nested list parameters are not supported")),
        })
    }

    fn from_libsql_value(v: libsql::Value) -> Value {
        match v {
            libsql::Value::Null => Value::Null,
            libsql::Value::Integer(i) => Value::I64(i),
            libsql::Value::Real(f) => Value::F64(f),
            libsql::Value::Text(s) => Value::String(s),
            libsql::Value::Blob(b) => Value::Bytes(b),
        }
    }

    /// Expand list parameters and convert the result for libsql.
    fn prepare(sql: &str, params: &[Value]) -> RecordResult<(String, Vec<libsql::Value>)> {
        let (sql, flat) =
            recordit_sql_builder::expand_params(sql, params).map_err(RecordError::backend)?;
        let values = flat
            .into_iter()
            .map(to_libsql_value)
            .collect::<RecordResult<Vec<_>>>()?;
        Ok((sql, values))
    }

    /// A blocking [`Executor`] over a `libsql::Database`.
    ///
    /// Statements run on a private current-thread tokio runtime, so callers
    /// must not invoke it from inside another async runtime.
    #[derive(Clone)]
    pub struct LibsqlExecutor {
        db: Arc<Database>,
        runtime: Arc<Runtime>,
    }

    impl LibsqlExecutor {
        /// Wrap an existing database.
        pub fn new(db: Arc<Database>) -> RecordResult<Self> {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(RecordError::backend)?;
            Ok(Self {
                db,
                runtime: Arc::new(runtime),
            })
        }

        /// Open (or create) a local database file.
        pub fn open(path: impl AsRef<Path>) -> RecordResult<Self> {
            let url = format!("file:{}?mode=rwc", path.as_ref().display());
            Self::from_url(&url)
        }

        /// Open a database by libsql URL, e.g. `file::memory:?cache=shared`.
        pub fn from_url(url: &str) -> RecordResult<Self> {
            // Database::open is deprecated upstream; keep a narrow allow here until Builder migration
            #[allow(deprecated)]
            let db = Database::open(url).map_err(RecordError::backend)?;
            Self::new(Arc::new(db))
        }

        /// Run a batch of `;`-separated statements, e.g. schema migrations.
        pub fn execute_batch(&self, sql: &str) -> RecordResult<()> {
            let conn = self.db.connect().map_err(RecordError::backend)?;
            self.runtime
                .block_on(conn.execute_batch(sql))
                .map_err(RecordError::backend)?;
            Ok(())
        }
    }

    impl Executor for LibsqlExecutor {
        fn connect(&self) -> RecordResult<Box<dyn Connection + '_>> {
            let conn = self.db.connect().map_err(RecordError::backend)?;
            Ok(Box::new(LibsqlConnection {
                conn,
                runtime: &self.runtime,
            }))
        }
    }

    struct LibsqlConnection<'a> {
        conn: libsql::Connection,
        runtime: &'a Runtime,
    }

    impl LibsqlConnection<'_> {
        async fn fetch(&self, sql: &str, params: Vec<libsql::Value>) -> RecordResult<Vec<Row>> {
            let mut rows = self
                .conn
                .query(sql, params)
                .await
                .map_err(RecordError::backend)?;
            let columns: Arc<[String]> = (0..rows.column_count())
                .map(|i| rows.column_name(i).unwrap_or_default().to_string())
                .collect::<Vec<_>>()
                .into();
            let mut out = Vec::new();
            while let Some(row) = rows.next().await.map_err(RecordError::backend)? {
                let values = (0..columns.len() as i32)
                    .map(|i| row.get_value(i).map(from_libsql_value))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(RecordError::backend)?;
                out.push(Row::new(columns.clone(), values));
            }
            Ok(out)
        }
    }

    impl Connection for LibsqlConnection<'_> {
        fn query(&mut self, sql: &str, params: &[Value]) -> RecordResult<Vec<Row>> {
            let start = Instant::now();
            let (sql, values) = prepare(sql, params)?;
            let result = self.runtime.block_on(self.fetch(&sql, values));
            match &result {
                Ok(rows) => obs_record("query", start, rows.len(), true),
                Err(_) => obs_record("query", start, 0, false),
            }
            result
        }

        fn insert(&mut self, sql: &str, params: &[Value]) -> RecordResult<i64> {
            let start = Instant::now();
            let (sql, values) = prepare(sql, params)?;
            let result = self
                .runtime
                .block_on(self.conn.execute(&sql, values))
                .map_err(RecordError::backend);
            match result {
                Ok(n) => {
                    obs_record("insert", start, n as usize, true);
                    Ok(self.conn.last_insert_rowid())
                }
                Err(e) => {
                    obs_record("insert", start, 0, false);
                    Err(e)
                }
            }
        }
    }

}

#[cfg(feature = "libsql-backend")]
pub use backend::LibsqlExecutor;
