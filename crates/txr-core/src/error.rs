use thiserror::Error;

#[derive(Debug, Error)]
pub enum TxrError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TxrError {
    /// Short error code string, reported in the `errors` list of API responses.
    pub fn code(&self) -> &'static str {
        match self {
            TxrError::Config(_) => "CONFIG_ERROR",
            TxrError::InvalidStatus(_) => "INVALID_STATUS",
            TxrError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, TxrError>;
