//! System endpoints: liveness, status summary, forced sync, deployments.

use crate::api::AppState;
use crate::error::Result;
use crate::types::{ok, ApiResponse, StatusSummary};
use autopod_core::SyncReport;
use autopod_store::DeploymentRecord;
use axum::Json;
use axum::extract::State;

/// Liveness check.
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "engine": state.orchestrator.config().engine.binary,
    }))
}

/// Lightweight status summary, served from the state store, never a
/// direct engine call on the hot path.
pub async fn status_summary(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<StatusSummary>>>> {
    let rows = state
        .orchestrator
        .store()
        .list()
        .into_iter()
        .map(|record| StatusSummary {
            container_name: record.name,
            status: record.status,
            created_at: record.created_at.to_rfc3339(),
        })
        .collect();
    Ok(ok(rows))
}

/// Forces an immediate synchronization pass.
pub async fn force_sync(State(state): State<AppState>) -> Result<Json<ApiResponse<SyncReport>>> {
    let report = state.orchestrator.synchronizer().sync_once().await?;
    Ok(ok(report))
}

/// Deployment history, most recent first.
pub async fn list_deployments(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<DeploymentRecord>>>> {
    Ok(ok(state.orchestrator.store().deployments()))
}
