//! Error types for the REST API.

use autopod_core::CoreError;
use autopod_error::CommonError;
use autopod_registry::RegistryError;
use autopod_runtime::RuntimeError;
use autopod_store::StoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Result type alias for API handlers.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors surfaced through the REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthenticated(String),

    /// The container engine cannot be reached.
    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Unavailable(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CommonError> for ApiError {
    fn from(err: CommonError) -> Self {
        match err {
            CommonError::BadRequest(msg) => Self::BadRequest(msg),
            CommonError::NotFound(msg) => Self::NotFound(msg),
            CommonError::Conflict(msg) => Self::Conflict(msg),
            CommonError::Unauthenticated(msg) => Self::Unauthenticated(msg),
            CommonError::Unavailable(msg) => Self::Unavailable(msg),
            CommonError::Io(e) => Self::Internal(e.to_string()),
            CommonError::Config(msg) | CommonError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Common(e) => e.into(),
            CoreError::Runtime(e) => CommonError::from(e).into(),
            CoreError::Store(e) => CommonError::from(e).into(),
            // Pipeline failures keep their full message (stage included).
            pipeline @ CoreError::Pipeline { .. } => Self::Internal(pipeline.to_string()),
        }
    }
}

impl From<RuntimeError> for ApiError {
    fn from(err: RuntimeError) -> Self {
        CommonError::from(err).into()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        CommonError::from(err).into()
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        CommonError::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_the_taxonomy() {
        assert_eq!(
            ApiError::BadRequest(String::new()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound(String::new()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict(String::new()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Unauthenticated(String::new()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Unavailable(String::new()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn core_conflict_maps_to_conflict() {
        let err: ApiError = CoreError::conflict("lease held").into();
        assert!(matches!(err, ApiError::Conflict(_)));
    }
}
