//! Error types for registry operations.

use autopod_error::CommonError;
use thiserror::Error;

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors that can occur in registry credential management.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry rejected the credentials, or an operation requiring a
    /// login was attempted without one.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// The registry could not be reached.
    #[error("registry unavailable: {0}")]
    Unavailable(String),

    /// The registry's response could not be interpreted.
    #[error("unexpected registry response: {0}")]
    Protocol(String),

    /// An engine operation (tag/push) failed.
    #[error(transparent)]
    Runtime(#[from] autopod_runtime::RuntimeError),
}

impl RegistryError {
    /// Creates a new unauthenticated error.
    #[must_use]
    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }
}

impl From<RegistryError> for CommonError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Unauthenticated(msg) => Self::Unauthenticated(msg),
            RegistryError::Unavailable(msg) => Self::Unavailable(msg),
            RegistryError::Protocol(msg) => Self::Internal(msg),
            RegistryError::Runtime(e) => e.into(),
        }
    }
}
