//! Image endpoints: engine adapter passthrough.

use crate::api::AppState;
use crate::error::{ApiError, Result};
use crate::types::{ok, ApiResponse};
use autopod_runtime::{EngineImage, EngineSearchResult};
use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

/// Lists local images.
pub async fn list_images(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<EngineImage>>>> {
    Ok(ok(state.orchestrator.runtime().images().await?))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<u32>,
}

/// Searches registries for images.
pub async fn search_images(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<EngineSearchResult>>>> {
    if query.q.is_empty() {
        return Err(ApiError::BadRequest("search query is required".to_string()));
    }
    let results = state
        .orchestrator
        .runtime()
        .search_images(&query.q, query.limit.unwrap_or(25))
        .await?;
    Ok(ok(results))
}

#[derive(Debug, Deserialize)]
pub struct ImageBody {
    pub image_name: String,
}

/// Pulls an image from a registry. Long-running; callers budget minutes,
/// not seconds.
pub async fn pull_image(
    State(state): State<AppState>,
    Json(body): Json<ImageBody>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    state.orchestrator.runtime().pull(&body.image_name).await?;
    Ok(ok(serde_json::json!({
        "message": format!("image {} pulled", body.image_name),
    })))
}

/// Removes a local image.
pub async fn remove_image(
    State(state): State<AppState>,
    Json(body): Json<ImageBody>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    state
        .orchestrator
        .runtime()
        .remove_image(&body.image_name)
        .await?;
    Ok(ok(serde_json::json!({
        "message": format!("image {} removed", body.image_name),
    })))
}

#[derive(Debug, Deserialize)]
pub struct TagBody {
    pub source_image: String,
    pub target_image: String,
}

/// Tags an image with an additional name.
pub async fn tag_image(
    State(state): State<AppState>,
    Json(body): Json<TagBody>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    state
        .orchestrator
        .runtime()
        .tag_image(&body.source_image, &body.target_image)
        .await?;
    Ok(ok(serde_json::json!({
        "message": format!("image tagged {} -> {}", body.source_image, body.target_image),
    })))
}

/// Full engine inspect document for one image.
pub async fn image_details(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    Ok(ok(state.orchestrator.runtime().image_details(&name).await?))
}

/// Layer history for one image.
pub async fn image_history(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<Vec<autopod_runtime::EngineHistoryEntry>>>> {
    Ok(ok(state.orchestrator.runtime().image_history(&name).await?))
}
