//! Error types for the engine adapter.

use autopod_error::CommonError;
use thiserror::Error;

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors that can occur when driving the container engine.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The engine binary is missing or the engine daemon cannot be reached.
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// The named container or image does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The engine ran but the command failed.
    #[error("engine command failed: {0}")]
    Command(String),

    /// The engine produced output the adapter could not parse.
    #[error("failed to parse engine output: {0}")]
    Parse(String),

    /// I/O error talking to the child process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    /// Creates a new not found error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// Creates a new engine-unavailable error.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Returns true if this is a not found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<RuntimeError> for CommonError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::Unavailable(msg) => Self::Unavailable(msg),
            RuntimeError::NotFound(msg) => Self::NotFound(msg),
            RuntimeError::Command(msg) | RuntimeError::Parse(msg) => Self::Internal(msg),
            RuntimeError::Io(e) => Self::Io(e),
        }
    }
}
