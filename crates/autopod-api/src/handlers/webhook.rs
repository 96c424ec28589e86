//! Webhook endpoint: the deployment pipeline's entry point.

use crate::api::AppState;
use crate::error::ApiError;
use crate::types::WebhookResponse;
use autopod_core::WebhookPayload;
use autopod_store::DeploymentRecord;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::info;

/// Handles a GitHub push webhook.
///
/// Long-poll contract: the response is sent once the pipeline reaches a
/// terminal stage, so webhook senders should use a generous timeout. The
/// envelope here is `{status, message, data?}` rather than the standard
/// one, for compatibility with webhook senders' expectations.
pub async fn webhook(State(state): State<AppState>, body: axum::body::Bytes) -> Response {
    // Parsed by hand so even malformed JSON gets the webhook envelope
    // rather than the framework's default rejection body.
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("invalid webhook payload: {e}"),
            )
        }
    };

    let pipeline = std::sync::Arc::clone(state.orchestrator.pipeline());
    match pipeline.deploy(payload).await {
        Ok(record) => {
            info!(deployment = %record.id, "webhook processed");
            (
                StatusCode::OK,
                Json(WebhookResponse {
                    status: "success",
                    message: "Webhook processed".to_string(),
                    data: Some(record),
                }),
            )
                .into_response()
        }
        Err(e) => {
            // The message keeps the failing stage so callers can tell
            // clone, build and swap problems apart.
            let message = e.to_string();
            let status = ApiError::from(e).status_code();
            error_response(status, message)
        }
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(WebhookResponse::<DeploymentRecord> {
            status: "error",
            message,
            data: None,
        }),
    )
        .into_response()
}
