//! API server.

use crate::api::create_router;
use autopod_core::Orchestrator;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP address to listen on.
    pub listen_addr: SocketAddr,
}

/// REST API server.
pub struct ApiServer {
    config: ServerConfig,
    orchestrator: Arc<Orchestrator>,
}

impl ApiServer {
    /// Creates a new API server.
    #[must_use]
    pub const fn new(config: ServerConfig, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    /// Runs the server until the shutdown future resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot bind or the server fails.
    pub async fn run(
        &self,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> std::io::Result<()> {
        let app = create_router(Arc::clone(&self.orchestrator))
            .layer(TraceLayer::new_for_http());

        let listener = TcpListener::bind(self.config.listen_addr).await?;
        info!(addr = %self.config.listen_addr, "API server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
