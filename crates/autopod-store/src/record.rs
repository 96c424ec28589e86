//! Record types persisted by the state store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Container lifecycle status as tracked by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    /// Created but not started.
    Created,
    /// Running.
    Running,
    /// Stopped or exited.
    Stopped,
    /// No matching engine container was observed during synchronization.
    Missing,
    /// Removed through the orchestrator (terminal).
    Removed,
}

impl ContainerStatus {
    /// Maps an engine state string to a record status.
    #[must_use]
    pub fn from_engine_state(state: &str) -> Self {
        match state.to_ascii_lowercase().as_str() {
            "running" | "paused" | "restarting" => Self::Running,
            "exited" | "stopped" | "dead" => Self::Stopped,
            _ => Self::Created,
        }
    }
}

impl std::fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Missing => write!(f, "missing"),
            Self::Removed => write!(f, "removed"),
        }
    }
}

/// A published port mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    /// Port inside the container.
    pub container_port: u16,
    /// Allocated host port.
    pub host_port: u16,
    /// Host IP the port is bound to (empty means all interfaces).
    #[serde(default)]
    pub host_ip: String,
}

/// Persisted view of one container.
///
/// `name` is the identity; it is unique among non-removed records. Records
/// are mutated only through the store, by the Synchronizer, the Action
/// Executor and the Deployment Pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerRecord {
    /// Container name (unique key).
    pub name: String,
    /// Engine-assigned container ID.
    pub runtime_id: String,
    /// Image the container runs.
    pub image: String,
    /// Current status.
    pub status: ContainerStatus,
    /// Published ports.
    pub ports: Vec<PortBinding>,
    /// First time this record was created.
    pub created_at: DateTime<Utc>,
    /// Last time a synchronization cycle confirmed this record.
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Consecutive synchronization cycles with no matching engine
    /// container. Persisted so drift detection survives a restart.
    #[serde(default)]
    pub missed_cycles: u32,
}

impl ContainerRecord {
    /// Creates a fresh record for a newly observed container.
    #[must_use]
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            runtime_id: String::new(),
            image: image.into(),
            status: ContainerStatus::Created,
            ports: Vec::new(),
            created_at: Utc::now(),
            last_synced_at: None,
            missed_cycles: 0,
        }
    }

    /// Returns whether the record is in the terminal removed state.
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.status == ContainerStatus::Removed
    }
}

/// A container observation handed to the store by the Synchronizer or the
/// Deployment Pipeline. Both go through the same upsert path so dashboard
/// state never depends on which component saw the container first.
#[derive(Debug, Clone)]
pub struct ObservedContainer {
    pub name: String,
    pub runtime_id: String,
    pub image: String,
    pub status: ContainerStatus,
    pub ports: Vec<PortBinding>,
}

/// Deployment pipeline stages, recorded on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployStage {
    Received,
    Cloning,
    Building,
    Swapping,
}

impl std::fmt::Display for DeployStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Received => write!(f, "received"),
            Self::Cloning => write!(f, "cloning"),
            Self::Building => write!(f, "building"),
            Self::Swapping => write!(f, "swapping"),
        }
    }
}

/// Terminal outcome of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentOutcome {
    Success,
    Failed,
    TimedOut,
}

/// One pipeline invocation, created at webhook receipt and immutable once
/// finalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRecord {
    /// Deployment ID.
    pub id: Uuid,
    /// Repository the webhook pointed at.
    pub repository_url: String,
    /// Target container name.
    pub requested_name: String,
    /// When the webhook was received.
    pub started_at: DateTime<Utc>,
    /// When the pipeline reached a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
    /// Terminal outcome.
    pub outcome: Option<DeploymentOutcome>,
    /// Stage the pipeline failed at, if it failed.
    pub failed_stage: Option<DeployStage>,
    /// Underlying error, if the pipeline failed.
    pub error: Option<String>,
    /// Name of the container the deployment produced.
    pub resulting_container_name: Option<String>,
    /// Ports allocated to the new container.
    #[serde(default)]
    pub ports: Vec<PortBinding>,
    /// URL the deployed application is reachable at.
    pub access_url: Option<String>,
    /// Reference to the deployment's log file, relative to the data
    /// directory.
    pub log_ref: String,
}

impl DeploymentRecord {
    /// Opens a new in-flight deployment record.
    #[must_use]
    pub fn open(repository_url: impl Into<String>, requested_name: impl Into<String>) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            repository_url: repository_url.into(),
            requested_name: requested_name.into(),
            started_at: Utc::now(),
            finished_at: None,
            outcome: None,
            failed_stage: None,
            error: None,
            resulting_container_name: None,
            ports: Vec::new(),
            access_url: None,
            log_ref: format!("deployments/{id}.log"),
        }
    }

    /// Returns whether the record has reached a terminal state.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.finished_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_state_mapping() {
        assert_eq!(
            ContainerStatus::from_engine_state("running"),
            ContainerStatus::Running
        );
        assert_eq!(
            ContainerStatus::from_engine_state("Exited"),
            ContainerStatus::Stopped
        );
        assert_eq!(
            ContainerStatus::from_engine_state("configured"),
            ContainerStatus::Created
        );
    }

    #[test]
    fn open_deployment_is_not_finalized() {
        let record = DeploymentRecord::open("https://example.com/repo.git", "demo");
        assert!(!record.is_finalized());
        assert!(record.log_ref.starts_with("deployments/"));
    }
}
