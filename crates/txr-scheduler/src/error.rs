use thiserror::Error;
use txr_store::StoreError;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// No sequence with the given id exists in the store.
    #[error("sequence not found: {id}")]
    SequenceNotFound { id: String },

    /// A job references a job type that does not exist.
    #[error("job type not found: {id}")]
    JobTypeNotFound { id: String },

    /// A job type names a plugin with no registered executor.
    #[error("plugin not found: {name}")]
    PluginNotFound { name: String },

    /// The sequence frequency is not a valid schedule expression.
    #[error("invalid schedule `{expression}`: {reason}")]
    InvalidSchedule { expression: String, reason: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl SchedulerError {
    /// Stable machine-readable code, used in API responses.
    pub fn code(&self) -> &'static str {
        match self {
            SchedulerError::SequenceNotFound { .. } => "SEQUENCE_NOT_FOUND",
            SchedulerError::JobTypeNotFound { .. } => "JOB_TYPE_NOT_FOUND",
            SchedulerError::PluginNotFound { .. } => "PLUGIN_NOT_FOUND",
            SchedulerError::InvalidSchedule { .. } => "INVALID_SCHEDULE",
            SchedulerError::Store(StoreError::NotFound { .. }) => "NOT_FOUND",
            SchedulerError::Store(_) => "STORE_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
