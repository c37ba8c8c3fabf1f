//! Process-wide configuration: the active executor and the table-name prefix.
//!
//! Installed once during start-up and read by every query builder that is not
//! bound to an explicit [`Config`].

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::{Executor, RecordError, RecordResult};

static REGISTRY: RwLock<Option<Arc<Config>>> = RwLock::new(None);

/// Shared handle to the execution collaborator plus naming settings.
#[derive(Clone)]
pub struct Config {
    executor: Arc<dyn Executor>,
    table_prefix: String,
}

impl Config {
    pub fn new<E: Executor + 'static>(executor: E) -> Self {
        Self::from_arc(Arc::new(executor))
    }

    pub fn from_arc(executor: Arc<dyn Executor>) -> Self {
        Self {
            executor,
            table_prefix: String::new(),
        }
    }

    /// Prefix prepended to every derived (non-overridden) table name.
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    pub fn executor(&self) -> &dyn Executor {
        self.executor.as_ref()
    }

    pub fn table_prefix(&self) -> &str {
        &self.table_prefix
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("table_prefix", &self.table_prefix)
            .finish_non_exhaustive()
    }
}

/// Install `config` as the process-wide configuration, replacing any previous one.
pub fn install(config: Config) -> Arc<Config> {
    let config = Arc::new(config);
    *REGISTRY.write().unwrap_or_else(PoisonError::into_inner) = Some(config.clone());
    config
}

/// Remove the process-wide configuration.
pub fn clear() {
    *REGISTRY.write().unwrap_or_else(PoisonError::into_inner) = None;
}

pub fn current() -> Option<Arc<Config>> {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// The installed configuration, or a configuration error when none is.
pub fn require() -> RecordResult<Arc<Config>> {
    current().ok_or_else(|| RecordError::config("no executor installed; call config::install first"))
}

/// The installed table prefix, empty when unconfigured.
pub fn table_prefix() -> String {
    current()
        .map(|c| c.table_prefix().to_string())
        .unwrap_or_default()
}
