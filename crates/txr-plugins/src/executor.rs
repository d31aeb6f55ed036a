use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use txr_core::types::Job;

use crate::error::{Result, ValidationError};

/// Every plugin name the system knows about. A job type's `name` must be
/// one of these for its jobs to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PluginKind {
    #[serde(rename = "_TXR_LOGGER")]
    Logger,
    #[serde(rename = "_TXR_DATABASE")]
    Database,
}

impl PluginKind {
    pub const ALL: [PluginKind; 2] = [PluginKind::Logger, PluginKind::Database];

    pub fn name(&self) -> &'static str {
        match self {
            PluginKind::Logger => "_TXR_LOGGER",
            PluginKind::Database => "_TXR_DATABASE",
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for PluginKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        PluginKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown plugin: {s}"))
    }
}

/// Trait that all job executors implement.
///
/// `validate` is pure and runs before every invocation; `execute` is only
/// called with options that passed validation.
#[async_trait]
pub trait Executor: Send + Sync {
    /// The name this executor is registered under.
    fn kind(&self) -> PluginKind;

    /// Check the job's option values against the job type's declared options.
    fn validate(&self, declared: &Value, provided: &Value) -> std::result::Result<(), ValidationError>;

    /// Perform the job's effect.
    ///
    /// `previous` is the output of the job feeding into this one, when jobs
    /// are chained. Returns this job's output, if it produces one.
    async fn execute(
        &self,
        declared: &Value,
        job: &Job,
        previous: Option<&Value>,
    ) -> Result<Option<Value>>;
}
