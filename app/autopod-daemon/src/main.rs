use anyhow::{Context, Result};
use autopod_api::{ApiServer, ServerConfig};
use autopod_core::{Config, Orchestrator};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "autopod-daemon")]
#[command(author, version, about, long_about = None)]
pub struct DaemonArgs {
    /// Address the REST API listens on (default: 0.0.0.0:5000).
    #[arg(long)]
    pub listen: Option<SocketAddr>,

    /// Data directory for AutoPod state.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Configuration file path.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Container engine binary (podman or docker).
    #[arg(long)]
    pub engine: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = DaemonArgs::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path).context("Failed to load configuration file")?,
        None => Config::load().context("Failed to load configuration")?,
    };
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(engine) = args.engine {
        config.engine.binary = engine;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!("autopod={}", config.logging.level))
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    run(config).await
}

async fn run(config: Config) -> Result<()> {
    info!("Starting AutoPod daemon...");

    let listen_addr = config.listen_addr;
    let engine = config.engine.binary.clone();
    let data_dir = config.data_dir.clone();

    let orchestrator =
        Arc::new(Orchestrator::new(config).context("Failed to create orchestrator")?);

    // Initial sync before serving, so the dashboard starts from a
    // populated view. A cold engine is not fatal; the periodic task will
    // catch up.
    match orchestrator.synchronizer().sync_once().await {
        Ok(report) => info!(observed = report.observed, "initial sync complete"),
        Err(e) => warn!(error = %e, "initial sync failed"),
    }

    let sync_handle = orchestrator.spawn_sync();

    info!(
        data_dir = %data_dir.display(),
        engine = %engine,
        "orchestrator initialized"
    );

    println!("AutoPod daemon started");
    println!("  API:    http://{listen_addr}");
    println!("  Engine: {engine}");
    println!("  Data:   {}", data_dir.display());
    println!();
    println!("Point your GitHub webhook at POST /webhook. Press Ctrl+C to stop.");

    let server = ApiServer::new(ServerConfig { listen_addr }, Arc::clone(&orchestrator));
    server
        .run(shutdown_signal())
        .await
        .context("API server error")?;

    info!("Shutdown signal received");
    sync_handle.abort();

    info!("AutoPod daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
