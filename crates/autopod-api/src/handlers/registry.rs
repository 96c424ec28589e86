//! Registry credential endpoints.

use crate::api::AppState;
use crate::error::Result;
use crate::types::{ok, ApiResponse};
use autopod_registry::{LoginStatus, PushReceipt};
use axum::Json;
use axum::extract::{Query, State};
use secrecy::SecretString;
use serde::Deserialize;

const DEFAULT_REGISTRY: &str = "docker.io";

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    pub registry: Option<String>,
    pub username: String,
    pub password: String,
}

/// Validates and stores registry credentials.
pub async fn registry_login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<Json<ApiResponse<LoginStatus>>> {
    let registry = body.registry.as_deref().unwrap_or(DEFAULT_REGISTRY);
    state
        .orchestrator
        .registry()
        .login(registry, &body.username, SecretString::from(body.password))
        .await?;
    Ok(ok(state.orchestrator.registry().status(registry)))
}

#[derive(Debug, Deserialize)]
pub struct LogoutBody {
    #[serde(default)]
    pub registry: Option<String>,
}

/// Clears the stored credential for a registry.
pub async fn registry_logout(
    State(state): State<AppState>,
    Json(body): Json<LogoutBody>,
) -> Result<Json<ApiResponse<LoginStatus>>> {
    let registry = body.registry.as_deref().unwrap_or(DEFAULT_REGISTRY);
    state.orchestrator.registry().logout(registry)?;
    Ok(ok(state.orchestrator.registry().status(registry)))
}

#[derive(Debug, Deserialize)]
pub struct CheckLoginQuery {
    #[serde(default)]
    pub registry: Option<String>,
}

/// Reports login state. The secret is never part of the response.
pub async fn registry_check_login(
    State(state): State<AppState>,
    Query(query): Query<CheckLoginQuery>,
) -> Result<Json<ApiResponse<LoginStatus>>> {
    let registry = query.registry.as_deref().unwrap_or(DEFAULT_REGISTRY);
    Ok(ok(state.orchestrator.registry().status(registry)))
}

#[derive(Debug, Deserialize)]
pub struct PushBody {
    pub image_name: String,
    #[serde(default)]
    pub registry: Option<String>,
}

/// Pushes a local image under the stored registry identity. Long-running;
/// callers budget minutes, not seconds.
pub async fn registry_push(
    State(state): State<AppState>,
    Json(body): Json<PushBody>,
) -> Result<Json<ApiResponse<PushReceipt>>> {
    let registry = body.registry.as_deref().unwrap_or(DEFAULT_REGISTRY);
    let receipt = state
        .orchestrator
        .registry()
        .push(
            &body.image_name,
            registry,
            state.orchestrator.runtime().as_ref(),
        )
        .await?;
    Ok(ok(receipt))
}
