use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::database::DatabaseExecutor;
use crate::error::{PluginError, Result};
use crate::executor::{Executor, PluginKind};
use crate::logger::LoggerExecutor;

/// Maps plugin names to executors.
///
/// Built once at startup and shared as `Arc<PluginRegistry>`; lookups never
/// mutate it, so no lock is needed.
pub struct PluginRegistry {
    executors: HashMap<PluginKind, Arc<dyn Executor>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            executors: HashMap::new(),
        }
    }

    /// A registry holding every built-in executor.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(LoggerExecutor));
        registry.register(Arc::new(DatabaseExecutor));
        registry
    }

    /// Register an executor under its own kind, replacing any previous one.
    pub fn register(&mut self, executor: Arc<dyn Executor>) {
        let kind = executor.kind();
        if self.executors.insert(kind, executor).is_some() {
            debug!(plugin = %kind, "executor replaced");
        } else {
            debug!(plugin = %kind, "executor registered");
        }
    }

    /// Look up the executor for a job type name.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Executor>> {
        name.parse::<PluginKind>()
            .ok()
            .and_then(|kind| self.executors.get(&kind))
            .map(Arc::clone)
            .ok_or_else(|| PluginError::NotFound {
                name: name.to_string(),
            })
    }

    /// Names of all registered executors, in enumeration order.
    pub fn names(&self) -> Vec<&'static str> {
        PluginKind::ALL
            .into_iter()
            .filter(|kind| self.executors.contains_key(kind))
            .map(|kind| kind.name())
            .collect()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
