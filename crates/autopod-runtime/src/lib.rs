//! Container engine adapter.
//!
//! This crate is the only part of AutoPod that talks to the container
//! engine. Everything else goes through the [`ContainerRuntime`] trait,
//! which abstracts the engine's list/start/stop/remove/build/run/pull/push
//! primitives and allows a mock engine in tests.
//!
//! The production implementation, [`CliRuntime`], drives the engine binary
//! (`podman` by default) as a child process and parses its JSON output.
//! Operations never retry internally; an unreachable engine is fatal to the
//! current call and surfaced as [`RuntimeError::Unavailable`].

pub mod adapter;
pub mod cli;
pub mod engine;
pub mod error;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use adapter::ContainerRuntime;
pub use cli::CliRuntime;
pub use engine::{
    EngineContainer, EngineHistoryEntry, EngineImage, EnginePort, EngineSearchResult, EngineStats,
};
pub use error::{Result, RuntimeError};
