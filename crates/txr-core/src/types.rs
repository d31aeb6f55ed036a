use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::TxrError;

/// Generate a fresh random identifier (UUID v4) for applications,
/// sequences, jobs and job types.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Whether a sequence has a live recurring timer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SequenceStatus {
    /// Defined but not scheduled. Every sequence starts here.
    #[default]
    Inactive,
    /// Scheduled; its jobs run on every firing of `frequency`.
    Active,
}

impl SequenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SequenceStatus::Inactive => "INACTIVE",
            SequenceStatus::Active => "ACTIVE",
        }
    }
}

impl fmt::Display for SequenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SequenceStatus {
    type Err = TxrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INACTIVE" => Ok(SequenceStatus::Inactive),
            "ACTIVE" => Ok(SequenceStatus::Active),
            other => Err(TxrError::InvalidStatus(other.to_string())),
        }
    }
}

/// A registered client on whose behalf sequences run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub name: String,
    /// Free-form contact details (email, owner, ...).
    pub contact: serde_json::Value,
    pub created_at: String,
    pub updated_at: String,
    #[serde(rename = "traceid")]
    pub trace_id: Option<String>,
}

/// Catalog entry naming a plugin and declaring the option shape its jobs
/// must supply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobType {
    pub id: String,
    /// Must match a plugin name, e.g. `_TXR_LOGGER`.
    pub name: String,
    pub description: Option<String>,
    /// Declared options, e.g. `{"type": "'STDOUT' | 'FILE'"}`.
    pub options: serde_json::Value,
    pub created_at: String,
    pub updated_at: String,
    #[serde(rename = "traceid")]
    pub trace_id: Option<String>,
}

/// A single unit of work inside a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub seq_id: String,
    /// Optional id of the job that should receive this job's output.
    pub to: Option<String>,
    /// Job type id (foreign reference into the job-type catalog).
    #[serde(rename = "type")]
    pub job_type: String,
    /// Plugin-specific option values, checked against the job type's
    /// declared options at run time.
    pub options: serde_json::Value,
    #[serde(rename = "traceid")]
    pub trace_id: Option<String>,
}

/// A schedulable group of jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sequence {
    pub id: String,
    pub app_id: String,
    /// Snapshot of the application name at creation time.
    pub app_name: String,
    pub description: Option<String>,
    /// Cron expression driving the recurring timer.
    pub frequency: String,
    pub status: SequenceStatus,
    #[serde(default)]
    pub jobs: Vec<Job>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(rename = "traceid")]
    pub trace_id: Option<String>,
}
