//! Disk-backed state store.
//!
//! Storage layout:
//! ```text
//! {data_dir}/
//! ├── state.json          # container records, deployment history, counters
//! └── deployments/
//!     └── <id>.log        # per-deployment stage log
//! ```
//!
//! The index is cached in memory behind an `RwLock` and rewritten via a
//! temp-file-then-rename on every mutation.

use crate::error::{Result, StoreError};
use crate::record::{
    ContainerRecord, ContainerStatus, DeploymentRecord, ObservedContainer,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

const INDEX_FILE: &str = "state.json";

/// Serialized index document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StateIndex {
    containers: HashMap<String, ContainerRecord>,
    deployments: Vec<DeploymentRecord>,
    build_counters: HashMap<String, u64>,
}

/// Result of one absence-reconciliation pass.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Records newly or still marked missing.
    pub marked_missing: Vec<String>,
    /// Records purged after reaching the miss threshold.
    pub purged: Vec<String>,
}

/// Persisted table of known containers and deployment history.
pub struct StateStore {
    data_dir: PathBuf,
    inner: RwLock<StateIndex>,
}

impl StateStore {
    /// Opens the store rooted at `data_dir`, creating it if needed.
    ///
    /// A corrupt index is logged and replaced with an empty one rather than
    /// refusing to start.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(data_dir.join("deployments"))?;

        let index_path = data_dir.join(INDEX_FILE);
        let index = if index_path.exists() {
            match fs::read_to_string(&index_path)
                .map_err(StoreError::Io)
                .and_then(|raw| serde_json::from_str(&raw).map_err(StoreError::Serde))
            {
                Ok(index) => index,
                Err(e) => {
                    warn!(path = %index_path.display(), error = %e, "corrupt state index, starting fresh");
                    StateIndex::default()
                }
            }
        } else {
            StateIndex::default()
        };

        Ok(Self {
            data_dir,
            inner: RwLock::new(index),
        })
    }

    /// Returns the data directory the store is rooted at.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Writes the index to disk. Called with the write lock held so that
    /// the on-disk order matches the in-memory mutation order.
    fn persist(&self, index: &StateIndex) -> Result<()> {
        let path = self.data_dir.join(INDEX_FILE);
        let json = serde_json::to_string_pretty(index)?;
        let temp = path.with_extension(format!("json.tmp.{}", std::process::id()));
        fs::write(&temp, json)?;
        fs::rename(&temp, &path)?;
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, StateIndex>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Internal("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, StateIndex>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Internal("lock poisoned".to_string()))
    }

    // =========================================================================
    // Container records
    // =========================================================================

    /// Returns one record by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ContainerRecord> {
        self.read().ok()?.containers.get(name).cloned()
    }

    /// Returns all records, sorted by name.
    #[must_use]
    pub fn list(&self) -> Vec<ContainerRecord> {
        let Ok(index) = self.read() else {
            return Vec::new();
        };
        let mut records: Vec<_> = index.containers.values().cloned().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    /// Read-modify-write on one record as a single transaction.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record bears the name.
    pub fn apply(
        &self,
        name: &str,
        f: impl FnOnce(&mut ContainerRecord),
    ) -> Result<ContainerRecord> {
        let mut index = self.write()?;
        let record = index
            .containers
            .get_mut(name)
            .ok_or_else(|| StoreError::not_found(format!("container {name}")))?;
        f(record);
        let updated = record.clone();
        self.persist(&index)?;
        Ok(updated)
    }

    /// Upserts a record from a live engine observation: create if absent,
    /// otherwise update status, image, ports and the engine ID. Clears the
    /// missing-cycle counter.
    pub fn upsert_live(&self, observed: ObservedContainer) -> Result<ContainerRecord> {
        let mut index = self.write()?;
        let record = index
            .containers
            .entry(observed.name.clone())
            .or_insert_with(|| ContainerRecord::new(observed.name.clone(), observed.image.clone()));
        record.runtime_id = observed.runtime_id;
        record.image = observed.image;
        record.status = observed.status;
        record.ports = observed.ports;
        record.last_synced_at = Some(Utc::now());
        record.missed_cycles = 0;
        let updated = record.clone();
        self.persist(&index)?;
        Ok(updated)
    }

    /// Reconciles records whose containers were not observed live.
    ///
    /// Each absent record accrues a missed cycle; the first miss marks it
    /// `missing` and reaching `purge_after` consecutive misses purges it.
    /// Records already removed through the orchestrator are purged as soon
    /// as the engine confirms their absence (that drift is intentional).
    pub fn reconcile_absent(
        &self,
        live: &HashSet<String>,
        purge_after: u32,
    ) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();
        let mut index = self.write()?;

        for record in index.containers.values_mut() {
            if live.contains(&record.name) {
                continue;
            }
            if record.is_removed() {
                report.purged.push(record.name.clone());
                continue;
            }
            record.missed_cycles += 1;
            if record.missed_cycles >= purge_after {
                report.purged.push(record.name.clone());
            } else {
                record.status = ContainerStatus::Missing;
                report.marked_missing.push(record.name.clone());
            }
        }

        for name in &report.purged {
            index.containers.remove(name);
            debug!(container = %name, "record purged");
        }

        self.persist(&index)?;
        Ok(report)
    }

    // =========================================================================
    // Deployments
    // =========================================================================

    /// Records a newly opened deployment.
    pub fn open_deployment(&self, record: DeploymentRecord) -> Result<()> {
        let mut index = self.write()?;
        index.deployments.push(record);
        self.persist(&index)?;
        Ok(())
    }

    /// Finalizes a deployment record.
    ///
    /// The closure fills in the terminal fields; `finished_at` is stamped
    /// here. A record that is already finalized is left untouched;
    /// deployment records are immutable once terminal.
    pub fn finalize_deployment(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut DeploymentRecord),
    ) -> Result<DeploymentRecord> {
        let mut index = self.write()?;
        let record = index
            .deployments
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| StoreError::not_found(format!("deployment {id}")))?;
        if record.is_finalized() {
            return Ok(record.clone());
        }
        f(record);
        record.finished_at = Some(Utc::now());
        let updated = record.clone();
        self.persist(&index)?;
        Ok(updated)
    }

    /// Returns one deployment by ID.
    #[must_use]
    pub fn deployment(&self, id: Uuid) -> Option<DeploymentRecord> {
        self.read()
            .ok()?
            .deployments
            .iter()
            .find(|d| d.id == id)
            .cloned()
    }

    /// Returns the deployment history, most recent first.
    #[must_use]
    pub fn deployments(&self) -> Vec<DeploymentRecord> {
        let Ok(index) = self.read() else {
            return Vec::new();
        };
        let mut records = index.deployments.clone();
        records.reverse();
        records
    }

    /// Returns the next build number for a deployment target. Numbers are
    /// monotonically increasing per target and persisted, so image tags are
    /// never reused.
    pub fn next_build_number(&self, target: &str) -> Result<u64> {
        let mut index = self.write()?;
        let counter = index.build_counters.entry(target.to_string()).or_insert(0);
        *counter += 1;
        let number = *counter;
        self.persist(&index)?;
        Ok(number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::PortBinding;
    use tempfile::TempDir;

    fn observed(name: &str, status: ContainerStatus) -> ObservedContainer {
        ObservedContainer {
            name: name.to_string(),
            runtime_id: format!("{name}-id"),
            image: "localhost/demo:build-1".to_string(),
            status,
            ports: vec![PortBinding {
                container_port: 8080,
                host_port: 32768,
                host_ip: String::new(),
            }],
        }
    }

    #[test]
    fn upsert_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        {
            let store = StateStore::open(tmp.path()).unwrap();
            store
                .upsert_live(observed("web", ContainerStatus::Running))
                .unwrap();
        }

        let store = StateStore::open(tmp.path()).unwrap();
        let record = store.get("web").unwrap();
        assert_eq!(record.status, ContainerStatus::Running);
        assert_eq!(record.ports[0].host_port, 32768);
        assert_eq!(record.missed_cycles, 0);
    }

    #[test]
    fn upsert_is_keyed_by_name() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::open(tmp.path()).unwrap();
        store
            .upsert_live(observed("web", ContainerStatus::Running))
            .unwrap();
        store
            .upsert_live(observed("web", ContainerStatus::Stopped))
            .unwrap();

        assert_eq!(store.list().len(), 1);
        assert_eq!(store.get("web").unwrap().status, ContainerStatus::Stopped);
    }

    #[test]
    fn absent_records_go_missing_then_purge() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::open(tmp.path()).unwrap();
        store
            .upsert_live(observed("web", ContainerStatus::Running))
            .unwrap();

        let live = HashSet::new();

        // Below the threshold the record stays, marked missing.
        for cycle in 1..3 {
            let report = store.reconcile_absent(&live, 3).unwrap();
            assert_eq!(report.marked_missing, vec!["web".to_string()], "cycle {cycle}");
            let record = store.get("web").unwrap();
            assert_eq!(record.status, ContainerStatus::Missing);
            assert_eq!(record.missed_cycles, cycle);
        }

        // At the threshold it is purged.
        let report = store.reconcile_absent(&live, 3).unwrap();
        assert_eq!(report.purged, vec!["web".to_string()]);
        assert!(store.get("web").is_none());
    }

    #[test]
    fn reappearing_container_clears_miss_counter() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::open(tmp.path()).unwrap();
        store
            .upsert_live(observed("web", ContainerStatus::Running))
            .unwrap();

        store.reconcile_absent(&HashSet::new(), 3).unwrap();
        assert_eq!(store.get("web").unwrap().missed_cycles, 1);

        store
            .upsert_live(observed("web", ContainerStatus::Running))
            .unwrap();
        assert_eq!(store.get("web").unwrap().missed_cycles, 0);
        assert_eq!(store.get("web").unwrap().status, ContainerStatus::Running);
    }

    #[test]
    fn removed_records_purge_on_next_cycle() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::open(tmp.path()).unwrap();
        store
            .upsert_live(observed("web", ContainerStatus::Running))
            .unwrap();
        store
            .apply("web", |r| r.status = ContainerStatus::Removed)
            .unwrap();

        let report = store.reconcile_absent(&HashSet::new(), 3).unwrap();
        assert_eq!(report.purged, vec!["web".to_string()]);
        assert!(store.get("web").is_none());
    }

    #[test]
    fn finalized_deployments_are_immutable() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::open(tmp.path()).unwrap();
        let record = DeploymentRecord::open("https://example.com/repo.git", "demo");
        let id = record.id;
        store.open_deployment(record).unwrap();

        store
            .finalize_deployment(id, |d| {
                d.outcome = Some(crate::record::DeploymentOutcome::Failed);
                d.error = Some("clone failed".to_string());
            })
            .unwrap();

        // A second finalize must not overwrite the first outcome.
        let record = store
            .finalize_deployment(id, |d| {
                d.outcome = Some(crate::record::DeploymentOutcome::Success);
            })
            .unwrap();
        assert_eq!(
            record.outcome,
            Some(crate::record::DeploymentOutcome::Failed)
        );
    }

    #[test]
    fn build_numbers_are_monotonic_per_target() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::open(tmp.path()).unwrap();
        assert_eq!(store.next_build_number("demo").unwrap(), 1);
        assert_eq!(store.next_build_number("demo").unwrap(), 2);
        assert_eq!(store.next_build_number("other").unwrap(), 1);

        // Counters survive reopen, so tags are never reused.
        drop(store);
        let store = StateStore::open(tmp.path()).unwrap();
        assert_eq!(store.next_build_number("demo").unwrap(), 3);
    }
}
