//! Container action executor.
//!
//! Executes one lifecycle action against one named container, serialized
//! per container through the lease table, with state checks before the
//! engine call and a synchronous store update after it, so callers that
//! observe success never see a stale status.

use crate::error::{CoreError, Result};
use crate::lease::LeaseTable;
use autopod_runtime::{ContainerRuntime, RuntimeError};
use autopod_store::{ContainerStatus, StateStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// A container lifecycle action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Start,
    Stop,
    Restart,
    Remove,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Stop => write!(f, "stop"),
            Self::Restart => write!(f, "restart"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

impl std::str::FromStr for Action {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "restart" => Ok(Self::Restart),
            "remove" => Ok(Self::Remove),
            other => Err(CoreError::bad_request(format!(
                "unknown container action '{other}'"
            ))),
        }
    }
}

/// Result of an executed action.
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    /// Container the action ran against.
    pub container: String,
    /// The action.
    pub action: Action,
    /// Status after the action.
    pub status: ContainerStatus,
    /// Whether the container was already in the desired state.
    pub no_op: bool,
}

impl ActionOutcome {
    /// Human-readable summary for API responses.
    #[must_use]
    pub fn message(&self) -> String {
        if self.no_op {
            return format!(
                "container {} already {}, nothing to do",
                self.container, self.status
            );
        }
        let verb = match self.action {
            Action::Start => "started",
            Action::Stop => "stopped",
            Action::Restart => "restarted",
            Action::Remove => "removed",
        };
        format!("container {} {verb}", self.container)
    }
}

/// Executes lifecycle actions with per-container concurrency safety.
pub struct ActionExecutor {
    runtime: Arc<dyn ContainerRuntime>,
    store: Arc<StateStore>,
    leases: LeaseTable,
}

impl ActionExecutor {
    /// Creates an executor whose leases expire after `lease_ttl`.
    #[must_use]
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        store: Arc<StateStore>,
        lease_ttl: Duration,
    ) -> Self {
        Self {
            runtime,
            store,
            leases: LeaseTable::new(lease_ttl),
        }
    }

    /// Returns the lease table (shared with anything else that must not
    /// race with actions).
    #[must_use]
    pub fn leases(&self) -> &LeaseTable {
        &self.leases
    }

    /// Executes one action against one container.
    ///
    /// Unknown names fail fast without touching the engine. A second
    /// concurrent action on the same name fails with `Conflict` rather
    /// than queuing.
    #[instrument(skip(self))]
    pub async fn execute(&self, action: Action, name: &str) -> Result<ActionOutcome> {
        let record = self
            .store
            .get(name)
            .ok_or_else(|| CoreError::not_found(format!("container {name}")))?;

        let _lease = self.leases.acquire(name, action)?;

        let outcome = match action {
            Action::Start => match record.status {
                ContainerStatus::Running => self.no_op(name, action, record.status),
                ContainerStatus::Removed => {
                    return Err(CoreError::not_found(format!("container {name} is removed")))
                }
                _ => {
                    self.runtime.start(name).await?;
                    self.transition(name, action, ContainerStatus::Running)?
                }
            },
            Action::Stop => match record.status {
                ContainerStatus::Stopped | ContainerStatus::Created | ContainerStatus::Missing => {
                    self.no_op(name, action, record.status)
                }
                ContainerStatus::Removed => {
                    return Err(CoreError::not_found(format!("container {name} is removed")))
                }
                ContainerStatus::Running => {
                    self.runtime.stop(name).await?;
                    self.transition(name, action, ContainerStatus::Stopped)?
                }
            },
            Action::Restart => match record.status {
                ContainerStatus::Running => {
                    self.runtime.restart(name).await?;
                    self.transition(name, action, ContainerStatus::Running)?
                }
                status => {
                    return Err(CoreError::conflict(format!(
                        "restart requires a running container, {name} is {status}"
                    )))
                }
            },
            Action::Remove => match record.status {
                // Removing a removed container is an idempotent success.
                ContainerStatus::Removed => self.no_op(name, action, record.status),
                _ => {
                    match self.runtime.remove(name).await {
                        Ok(()) => {}
                        // The engine already lost the container; removal
                        // intent is satisfied either way.
                        Err(RuntimeError::NotFound(_)) => {}
                        Err(e) => return Err(e.into()),
                    }
                    self.transition(name, action, ContainerStatus::Removed)?
                }
            },
        };

        info!(container = name, action = %action, no_op = outcome.no_op, "action executed");
        Ok(outcome)
    }

    fn no_op(&self, name: &str, action: Action, status: ContainerStatus) -> ActionOutcome {
        ActionOutcome {
            container: name.to_string(),
            action,
            status,
            no_op: true,
        }
    }

    /// Store update performed in the same logical operation as the engine
    /// call, before the lease is released.
    fn transition(
        &self,
        name: &str,
        action: Action,
        status: ContainerStatus,
    ) -> Result<ActionOutcome> {
        self.store.apply(name, |record| record.status = status)?;
        Ok(ActionOutcome {
            container: name.to_string(),
            action,
            status,
            no_op: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autopod_runtime::testing::InMemoryRuntime;
    use autopod_store::{ObservedContainer, PortBinding};
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn fixture(status: ContainerStatus, engine_state: &str) -> (Arc<InMemoryRuntime>, ActionExecutor, TempDir) {
        let tmp = TempDir::new().unwrap();
        let runtime = Arc::new(InMemoryRuntime::new());
        runtime.insert("web", engine_state, "localhost/web:build-1");
        let store = Arc::new(StateStore::open(tmp.path()).unwrap());
        store
            .upsert_live(ObservedContainer {
                name: "web".to_string(),
                runtime_id: "web-id".to_string(),
                image: "localhost/web:build-1".to_string(),
                status,
                ports: vec![PortBinding {
                    container_port: 8080,
                    host_port: 32768,
                    host_ip: String::new(),
                }],
            })
            .unwrap();
        let executor = ActionExecutor::new(
            Arc::clone(&runtime) as Arc<dyn ContainerRuntime>,
            store,
            Duration::from_secs(60),
        );
        (runtime, executor, tmp)
    }

    #[tokio::test]
    async fn start_on_running_container_is_idempotent() {
        let (runtime, executor, _tmp) = fixture(ContainerStatus::Running, "running");

        let outcome = executor.execute(Action::Start, "web").await.unwrap();
        assert!(outcome.no_op);
        assert_eq!(outcome.status, ContainerStatus::Running);
        assert_eq!(runtime.calls.start.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_container_fails_fast() {
        let (runtime, executor, _tmp) = fixture(ContainerStatus::Running, "running");

        let err = executor.execute(Action::Start, "ghost").await.unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert_eq!(runtime.calls.start.load(Ordering::SeqCst), 0);
        assert_eq!(runtime.calls.list.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn concurrent_stops_make_one_engine_call() {
        let (runtime, executor, _tmp) = fixture(ContainerStatus::Running, "running");
        runtime.set_stop_delay(Duration::from_millis(50));

        let (first, second) = tokio::join!(
            executor.execute(Action::Stop, "web"),
            executor.execute(Action::Stop, "web"),
        );

        let results = [first, second];
        let ok = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| {
                r.as_ref()
                    .err()
                    .is_some_and(|e| e.to_string().contains("conflict"))
            })
            .count();

        assert_eq!(ok, 1);
        assert_eq!(conflicts, 1);
        assert_eq!(runtime.calls.stop.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stop_updates_store_before_returning() {
        let (_runtime, executor, _tmp) = fixture(ContainerStatus::Running, "running");

        let outcome = executor.execute(Action::Stop, "web").await.unwrap();
        assert!(!outcome.no_op);
        assert_eq!(outcome.status, ContainerStatus::Stopped);
    }

    #[tokio::test]
    async fn restart_from_stopped_is_a_conflict() {
        let (runtime, executor, _tmp) = fixture(ContainerStatus::Stopped, "exited");

        let err = executor.execute(Action::Restart, "web").await.unwrap_err();
        assert!(err.to_string().contains("conflict"));
        assert_eq!(runtime.calls.restart.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn remove_twice_is_idempotent() {
        let (runtime, executor, _tmp) = fixture(ContainerStatus::Running, "running");

        let first = executor.execute(Action::Remove, "web").await.unwrap();
        assert!(!first.no_op);
        assert_eq!(first.status, ContainerStatus::Removed);

        let second = executor.execute(Action::Remove, "web").await.unwrap();
        assert!(second.no_op);
        assert_eq!(runtime.calls.remove.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn remove_tolerates_engine_drift() {
        let (runtime, executor, _tmp) = fixture(ContainerStatus::Running, "running");
        // The container vanished outside the orchestrator.
        runtime.remove("web").await.unwrap();

        let outcome = executor.execute(Action::Remove, "web").await.unwrap();
        assert_eq!(outcome.status, ContainerStatus::Removed);
    }

    #[test]
    fn action_parses_from_route_segment() {
        assert_eq!("start".parse::<Action>().unwrap(), Action::Start);
        assert_eq!("remove".parse::<Action>().unwrap(), Action::Remove);
        assert!("destroy".parse::<Action>().is_err());
    }
}
