//! Common error types shared across AutoPod crates.

use thiserror::Error;

/// Common errors that occur across multiple AutoPod crates.
///
/// The variants mirror the failure taxonomy of the orchestrator: malformed
/// caller input, unknown resources, concurrency conflicts, missing registry
/// authentication, and an unreachable container engine. Crate-specific error
/// types wrap this one using the `#[from]` attribute.
#[derive(Debug, Error)]
pub enum CommonError {
    /// I/O error from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed caller input, surfaced verbatim.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Unknown container, image or registry.
    #[error("not found: {0}")]
    NotFound(String),

    /// A lease is already held, or the action is invalid for the
    /// resource's current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Registry operation attempted without a prior login.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// The container engine cannot be reached. Fatal for the current
    /// operation; callers decide whether to retry.
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error.
    ///
    /// A catch-all for unexpected internal errors. Should include enough
    /// context for debugging.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CommonError {
    /// Creates a new bad request error.
    #[must_use]
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Creates a new not found error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// Creates a new conflict error.
    #[must_use]
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Creates a new unauthenticated error.
    #[must_use]
    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    /// Creates a new engine-unavailable error.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Creates a new configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if this is a not found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if this is a conflict error.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns true if this is an engine-unavailable error.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let common_err: CommonError = io_err.into();
        assert!(common_err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_not_found_error() {
        let err = CommonError::not_found("container web");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "not found: container web");
    }

    #[test]
    fn test_conflict_error() {
        let err = CommonError::conflict("action already in flight for web");
        assert!(err.is_conflict());
        assert_eq!(err.to_string(), "conflict: action already in flight for web");
    }

    #[test]
    fn test_unavailable_error() {
        let err = CommonError::unavailable("podman not found in PATH");
        assert!(err.is_unavailable());
        assert_eq!(err.to_string(), "engine unavailable: podman not found in PATH");
    }

    #[test]
    fn test_unauthenticated_error() {
        let err = CommonError::unauthenticated("push requires docker.io login");
        assert_eq!(
            err.to_string(),
            "unauthenticated: push requires docker.io login"
        );
    }
}
