//! Error types for the orchestrator core.

use autopod_error::CommonError;
use autopod_runtime::RuntimeError;
use autopod_store::{DeployStage, StoreError};
use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors produced by the orchestrator.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Shared taxonomy error.
    #[error(transparent)]
    Common(#[from] CommonError),

    /// Engine adapter error, propagated untouched.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// State store error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A deployment pipeline stage failed. The stage is part of the error
    /// so callers can tell clone, build and swap problems apart. When the
    /// swap failed after the old container was already discarded, the
    /// message carries `rollback=unavailable`.
    #[error("pipeline stage failure (stage={stage}): {message}")]
    Pipeline {
        stage: DeployStage,
        message: String,
        rollback_unavailable: bool,
    },
}

impl CoreError {
    /// Creates a new bad request error.
    #[must_use]
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::Common(CommonError::bad_request(msg))
    }

    /// Creates a new not found error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::Common(CommonError::not_found(resource))
    }

    /// Creates a new conflict error.
    #[must_use]
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Common(CommonError::conflict(msg))
    }

    /// Creates a new internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Common(CommonError::internal(msg))
    }

    /// Creates a pipeline stage failure.
    #[must_use]
    pub fn stage_failure(stage: DeployStage, err: impl std::fmt::Display) -> Self {
        Self::Pipeline {
            stage,
            message: err.to_string(),
            rollback_unavailable: false,
        }
    }

    /// Returns the failed pipeline stage, if this is a pipeline error.
    #[must_use]
    pub const fn failed_stage(&self) -> Option<DeployStage> {
        match self {
            Self::Pipeline { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_error_names_the_stage() {
        let err = CoreError::stage_failure(DeployStage::Cloning, "repository not found");
        assert_eq!(
            err.to_string(),
            "pipeline stage failure (stage=cloning): repository not found"
        );
        assert_eq!(err.failed_stage(), Some(DeployStage::Cloning));
    }

    #[test]
    fn swap_error_surfaces_missing_rollback() {
        let err = CoreError::Pipeline {
            stage: DeployStage::Swapping,
            message: "rollback=unavailable: run failed".to_string(),
            rollback_unavailable: true,
        };
        assert!(err.to_string().contains("stage=swapping"));
        assert!(err.to_string().contains("rollback=unavailable"));
    }
}
