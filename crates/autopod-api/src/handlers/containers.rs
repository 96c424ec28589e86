//! Container endpoints.

use crate::api::AppState;
use crate::error::{ApiError, Result};
use crate::types::{ok, ActionResponse, ApiResponse, NetworkView};
use autopod_core::Action;
use autopod_store::ContainerRecord;
use axum::Json;
use axum::extract::{Path, State};

/// Lists all container records.
pub async fn list_containers(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ContainerRecord>>>> {
    Ok(ok(state.orchestrator.store().list()))
}

/// Executes a lifecycle action against one container.
///
/// The action segment is one of `start`, `stop`, `restart`, `remove`;
/// anything else is a bad request before any state is touched.
pub async fn container_action(
    State(state): State<AppState>,
    Path((name, action)): Path<(String, String)>,
) -> Result<Json<ApiResponse<ActionResponse>>> {
    let action: Action = action.parse()?;
    let outcome = state.orchestrator.executor().execute(action, &name).await?;
    Ok(ok(ActionResponse {
        message: outcome.message(),
        container: outcome.container,
        action: outcome.action.to_string(),
        status: outcome.status,
        no_op: outcome.no_op,
    }))
}

/// Detailed health view for one container: persisted record plus live
/// engine state and resource statistics where available.
pub async fn container_health(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    let record = state
        .orchestrator
        .store()
        .get(&name)
        .ok_or_else(|| ApiError::NotFound(format!("container {name}")))?;

    // Live details are best-effort; the record is the source of truth for
    // the dashboard.
    let live = state.orchestrator.runtime().inspect(&name).await.ok();
    let resources = state.orchestrator.runtime().stats(&name).await.ok();

    Ok(ok(serde_json::json!({
        "health": {
            "name": record.name,
            "status": record.status,
            "engine_state": live.as_ref().map(|c| c.state.clone()),
            "engine_status": live.as_ref().map(|c| c.status.clone()),
            "last_synced_at": record.last_synced_at,
        },
        "resources": resources,
    })))
}

/// Point-in-time statistics for one container.
pub async fn container_stats(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<autopod_runtime::EngineStats>>> {
    let stats = state.orchestrator.runtime().stats(&name).await?;
    Ok(ok(stats))
}

/// Network view for one container, derived from the persisted record.
pub async fn container_network(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<NetworkView>>> {
    let record = state
        .orchestrator
        .store()
        .get(&name)
        .ok_or_else(|| ApiError::NotFound(format!("container {name}")))?;

    let host = &state.orchestrator.config().deploy.host;
    let urls = record
        .ports
        .iter()
        .map(|p| format!("http://{host}:{}", p.host_port))
        .collect();

    Ok(ok(NetworkView {
        container: record.name,
        ports: record.ports,
        urls,
    }))
}
