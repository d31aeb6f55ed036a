use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No row with the given id exists.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The row is still referenced by other rows and cannot be deleted.
    #[error("{entity} {id} is still referenced by {references} row(s)")]
    InUse {
        entity: &'static str,
        id: String,
        references: usize,
    },

    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Placeholder resolution or status parsing failed.
    #[error(transparent)]
    Core(#[from] txr_core::TxrError),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
