//! Response envelopes and view types.

use autopod_store::{ContainerStatus, PortBinding};
use axum::Json;
use serde::Serialize;

/// Standard success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

/// Wraps a payload in the success envelope.
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

/// Webhook endpoint envelope, distinct for webhook senders' expectations.
#[derive(Debug, Serialize)]
pub struct WebhookResponse<T: Serialize> {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Lightweight status summary row.
#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub container_name: String,
    pub status: ContainerStatus,
    pub created_at: String,
}

/// Result of a container action.
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub container: String,
    pub action: String,
    pub status: ContainerStatus,
    pub no_op: bool,
    pub message: String,
}

/// Per-container network view derived from the state store.
#[derive(Debug, Serialize)]
pub struct NetworkView {
    pub container: String,
    pub ports: Vec<PortBinding>,
    pub urls: Vec<String>,
}
