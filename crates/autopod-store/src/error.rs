//! Error types for the state store.

use autopod_error::CommonError;
use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in the state store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The named record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// I/O error persisting or loading the index.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The index file could not be serialized or parsed.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A lock was poisoned by a panicking writer.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Creates a new not found error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }
}

impl From<StoreError> for CommonError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => Self::NotFound(msg),
            StoreError::Io(e) => Self::Io(e),
            StoreError::Serde(e) => Self::Internal(e.to_string()),
            StoreError::Internal(msg) => Self::Internal(msg),
        }
    }
}
