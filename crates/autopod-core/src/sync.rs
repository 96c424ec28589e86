//! State synchronizer.
//!
//! Periodically reconciles the state store against the engine's live
//! container listing. The synchronizer only reflects observed truth: it
//! never calls the action executor and never mutates the engine. An
//! adapter failure skips the whole cycle ("failed to list" is not "list
//! is empty"), so a transient engine outage cannot corrupt the previous
//! consistent snapshot.

use crate::error::Result;
use autopod_runtime::{ContainerRuntime, EngineContainer, EnginePort};
use autopod_store::{ContainerStatus, ObservedContainer, PortBinding, StateStore};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Summary of one synchronization cycle.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct SyncReport {
    /// Live containers observed and upserted.
    pub observed: usize,
    /// Records marked missing this cycle.
    pub marked_missing: usize,
    /// Records purged after reaching the miss threshold.
    pub purged: usize,
}

/// Reconciles persisted records with the live engine state.
pub struct Synchronizer {
    runtime: Arc<dyn ContainerRuntime>,
    store: Arc<StateStore>,
    interval: Duration,
    purge_after: u32,
}

impl Synchronizer {
    /// Creates a synchronizer.
    #[must_use]
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        store: Arc<StateStore>,
        interval: Duration,
        purge_after: u32,
    ) -> Self {
        Self {
            runtime,
            store,
            interval,
            purge_after,
        }
    }

    /// Runs a single synchronization cycle.
    ///
    /// # Errors
    ///
    /// Propagates the adapter error when the engine cannot be listed; the
    /// store is left untouched in that case.
    pub async fn sync_once(&self) -> Result<SyncReport> {
        let live = self.runtime.list().await?;

        let mut live_names = HashSet::new();
        let mut observed = 0;
        for container in &live {
            let name = container.name();
            if name.is_empty() {
                continue;
            }
            live_names.insert(name.to_string());
            self.store.upsert_live(observe(container))?;
            observed += 1;
        }

        let report = self
            .store
            .reconcile_absent(&live_names, self.purge_after)?;

        Ok(SyncReport {
            observed,
            marked_missing: report.marked_missing.len(),
            purged: report.purged.len(),
        })
    }

    /// Spawns the periodic synchronization task.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let sync = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sync.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match sync.sync_once().await {
                    Ok(report) => debug!(
                        observed = report.observed,
                        missing = report.marked_missing,
                        purged = report.purged,
                        "sync cycle complete"
                    ),
                    // Best-effort reflection: skip the cycle, keep the
                    // previous snapshot.
                    Err(e) => warn!(error = %e, "sync cycle skipped"),
                }
            }
        })
    }
}

/// Converts an engine container into the store's observation type. The
/// deployment pipeline funnels through the same conversion so both writers
/// agree on what a container looks like.
#[must_use]
pub fn observe(container: &EngineContainer) -> ObservedContainer {
    ObservedContainer {
        name: container.name().to_string(),
        runtime_id: container.id.clone(),
        image: container.image.clone(),
        status: ContainerStatus::from_engine_state(&container.state),
        ports: container.ports.iter().map(port_binding).collect(),
    }
}

fn port_binding(port: &EnginePort) -> PortBinding {
    PortBinding {
        container_port: port.container_port,
        host_port: port.host_port,
        host_ip: port.host_ip.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autopod_runtime::testing::InMemoryRuntime;
    use tempfile::TempDir;

    fn fixture() -> (Arc<InMemoryRuntime>, Arc<StateStore>, Synchronizer, TempDir) {
        let tmp = TempDir::new().unwrap();
        let runtime = Arc::new(InMemoryRuntime::new());
        let store = Arc::new(StateStore::open(tmp.path()).unwrap());
        let sync = Synchronizer::new(
            Arc::clone(&runtime) as Arc<dyn ContainerRuntime>,
            Arc::clone(&store),
            Duration::from_secs(5),
            3,
        );
        (runtime, store, sync, tmp)
    }

    #[tokio::test]
    async fn every_live_container_gets_one_record() {
        let (runtime, store, sync, _tmp) = fixture();
        runtime.insert("web", "running", "localhost/web:build-1");
        runtime.insert("db", "exited", "docker.io/library/postgres:16");

        let report = sync.sync_once().await.unwrap();
        assert_eq!(report.observed, 2);

        let records = store.list();
        assert_eq!(records.len(), 2);
        assert_eq!(store.get("web").unwrap().status, ContainerStatus::Running);
        assert_eq!(store.get("db").unwrap().status, ContainerStatus::Stopped);
    }

    #[tokio::test]
    async fn engine_outage_skips_the_cycle() {
        let (runtime, store, sync, _tmp) = fixture();
        runtime.insert("web", "running", "localhost/web:build-1");
        sync.sync_once().await.unwrap();

        runtime.set_fail_list(true);
        assert!(sync.sync_once().await.is_err());

        // The previous snapshot is intact: no missing mark, no purge.
        let record = store.get("web").unwrap();
        assert_eq!(record.status, ContainerStatus::Running);
        assert_eq!(record.missed_cycles, 0);
    }

    #[tokio::test]
    async fn vanished_container_goes_missing_then_purges() {
        let (runtime, store, sync, _tmp) = fixture();
        runtime.insert("web", "running", "localhost/web:build-1");
        sync.sync_once().await.unwrap();

        // Removed outside the orchestrator.
        runtime.remove("web").await.unwrap();

        let report = sync.sync_once().await.unwrap();
        assert_eq!(report.marked_missing, 1);
        assert_eq!(store.get("web").unwrap().status, ContainerStatus::Missing);

        sync.sync_once().await.unwrap();
        assert_eq!(store.get("web").unwrap().missed_cycles, 2);

        let report = sync.sync_once().await.unwrap();
        assert_eq!(report.purged, 1);
        assert!(store.get("web").is_none());
    }

    #[tokio::test]
    async fn drift_creation_is_reflected() {
        let (runtime, store, sync, _tmp) = fixture();
        sync.sync_once().await.unwrap();
        assert!(store.list().is_empty());

        // Created outside the orchestrator.
        runtime.insert("rogue", "running", "docker.io/library/nginx:latest");
        sync.sync_once().await.unwrap();
        assert_eq!(store.get("rogue").unwrap().status, ContainerStatus::Running);
    }
}
