use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginError {
    /// No executor is registered under this name.
    #[error("plugin not found: {name}")]
    NotFound { name: String },

    /// The executor ran and its effect failed.
    #[error("plugin execution failed: {0}")]
    ExecutionFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// A job's option values do not satisfy its job type's declared options.
///
/// This is expected flow, not a bug: the job is skipped for the tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The job type does not declare the option the plugin needs.
    #[error("job type does not declare option `{option}`")]
    MissingDeclaration { option: String },

    /// The job did not provide a required option.
    #[error("missing option `{option}`")]
    MissingOption { option: String },

    /// The provided value is not in the declared allow-list.
    #[error("invalid option `{option}`: `{value}` is not one of {allowed:?}")]
    NotAllowed {
        option: String,
        value: String,
        allowed: Vec<String>,
    },
}

pub type Result<T> = std::result::Result<T, PluginError>;
