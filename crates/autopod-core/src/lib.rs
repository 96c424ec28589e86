//! AutoPod orchestrator core.
//!
//! Coordinates the webhook-triggered build-and-deploy pipeline, the
//! per-container action executor and the state synchronizer on top of the
//! engine adapter and the state store.
//!
//! Concurrency model: one dedicated periodic task for the [`Synchronizer`],
//! a non-blocking lease per container name for the [`ActionExecutor`], and
//! a serialized queue per deployment target for the [`DeployPipeline`].
//! The state store is the only resource mutated by more than one of these;
//! every mutation goes through its per-name read-modify-write.

pub mod action;
pub mod config;
pub mod error;
pub mod lease;
pub mod orchestrator;
pub mod pipeline;
pub mod sync;

pub use action::{Action, ActionExecutor, ActionOutcome};
pub use config::Config;
pub use error::{CoreError, Result};
pub use lease::LeaseTable;
pub use orchestrator::Orchestrator;
pub use pipeline::{DeployPipeline, WebhookPayload};
pub use sync::{SyncReport, Synchronizer};
