//! API router.

use crate::handlers;
use crate::trace::trace_id_middleware;
use autopod_core::Orchestrator;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// AutoPod orchestrator.
    pub orchestrator: Arc<Orchestrator>,
}

/// Creates the REST router with all endpoints.
#[must_use]
pub fn create_router(orchestrator: Arc<Orchestrator>) -> Router {
    let state = AppState { orchestrator };

    Router::new()
        .route("/health", get(handlers::health))
        .route("/webhook", post(handlers::webhook))
        .nest("/api", api_routes())
        .layer(middleware::from_fn(trace_id_middleware))
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(handlers::status_summary))
        .route("/sync", post(handlers::force_sync))
        .route("/containers", get(handlers::list_containers))
        .route("/containers/:name/health", get(handlers::container_health))
        .route("/containers/:name/stats", get(handlers::container_stats))
        .route("/containers/:name/network", get(handlers::container_network))
        .route("/containers/:name/:action", post(handlers::container_action))
        .route("/deployments", get(handlers::list_deployments))
        .route("/images", get(handlers::list_images))
        .route("/images/search", get(handlers::search_images))
        .route("/images/pull", post(handlers::pull_image))
        .route("/images/remove", post(handlers::remove_image))
        .route("/images/tag", post(handlers::tag_image))
        .route("/images/:name/details", get(handlers::image_details))
        .route("/images/:name/history", get(handlers::image_history))
        .route("/docker/login", post(handlers::registry_login))
        .route("/docker/logout", post(handlers::registry_logout))
        .route("/docker/check-login", get(handlers::registry_check_login))
        .route("/docker/push", post(handlers::registry_push))
}
