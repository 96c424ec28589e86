//! AutoPod orchestrator.
//!
//! Wires the engine adapter, state store, registry manager, action
//! executor, synchronizer and deployment pipeline together behind one
//! handle the API layer can share.

use crate::action::ActionExecutor;
use crate::config::Config;
use crate::error::Result;
use crate::pipeline::DeployPipeline;
use crate::sync::Synchronizer;
use autopod_registry::CredentialManager;
use autopod_runtime::{CliRuntime, ContainerRuntime};
use autopod_store::StateStore;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

pub struct Orchestrator {
    config: Config,
    runtime: Arc<dyn ContainerRuntime>,
    store: Arc<StateStore>,
    registry: CredentialManager,
    executor: ActionExecutor,
    synchronizer: Arc<Synchronizer>,
    pipeline: Arc<DeployPipeline>,
}

impl Orchestrator {
    /// Creates an orchestrator driving the configured engine binary.
    ///
    /// # Errors
    ///
    /// Returns an error if the state store cannot be opened.
    pub fn new(config: Config) -> Result<Self> {
        let runtime: Arc<dyn ContainerRuntime> =
            Arc::new(CliRuntime::new(config.engine.binary.clone()));
        Self::with_runtime(config, runtime)
    }

    /// Creates an orchestrator on top of an explicit engine adapter.
    /// Production uses [`CliRuntime`]; tests plug in a mock engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the state store cannot be opened.
    pub fn with_runtime(config: Config, runtime: Arc<dyn ContainerRuntime>) -> Result<Self> {
        let store = Arc::new(StateStore::open(&config.data_dir)?);
        let executor = ActionExecutor::new(
            Arc::clone(&runtime),
            Arc::clone(&store),
            config.actions.lease_ttl(),
        );
        let synchronizer = Arc::new(Synchronizer::new(
            Arc::clone(&runtime),
            Arc::clone(&store),
            config.sync.interval(),
            config.sync.purge_after_misses,
        ));
        let pipeline = Arc::new(DeployPipeline::new(
            Arc::clone(&runtime),
            Arc::clone(&store),
            config.deploy.clone(),
        ));

        info!(data_dir = %config.data_dir.display(), "orchestrator ready");
        Ok(Self {
            config,
            runtime,
            store,
            registry: CredentialManager::new(),
            executor,
            synchronizer,
            pipeline,
        })
    }

    /// Configuration the orchestrator was built with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Engine adapter.
    #[must_use]
    pub fn runtime(&self) -> &Arc<dyn ContainerRuntime> {
        &self.runtime
    }

    /// State store.
    #[must_use]
    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Registry credential manager.
    #[must_use]
    pub fn registry(&self) -> &CredentialManager {
        &self.registry
    }

    /// Action executor.
    #[must_use]
    pub fn executor(&self) -> &ActionExecutor {
        &self.executor
    }

    /// Synchronizer.
    #[must_use]
    pub fn synchronizer(&self) -> &Arc<Synchronizer> {
        &self.synchronizer
    }

    /// Deployment pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Arc<DeployPipeline> {
        &self.pipeline
    }

    /// Spawns the periodic synchronization task.
    pub fn spawn_sync(&self) -> JoinHandle<()> {
        self.synchronizer.spawn()
    }
}
