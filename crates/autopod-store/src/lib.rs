//! Persisted state for AutoPod.
//!
//! The state store keeps the orchestrator's view of containers and the
//! deployment history, independent of the engine's own state. Records are
//! held in memory behind a lock and written through to a single JSON index
//! under the data directory, so the view survives daemon restarts.
//!
//! The store is the only resource mutated by more than one component
//! (Synchronizer, Action Executor, Deployment Pipeline); every mutation is
//! a read-modify-write under the store's write lock and is persisted before
//! the call returns.

pub mod error;
pub mod record;
pub mod store;

pub use error::{Result, StoreError};
pub use record::{
    ContainerRecord, ContainerStatus, DeployStage, DeploymentOutcome, DeploymentRecord,
    ObservedContainer, PortBinding,
};
pub use store::{ReconcileReport, StateStore};
