//! The engine adapter trait.

use crate::engine::{
    EngineContainer, EngineHistoryEntry, EngineImage, EngineSearchResult, EngineStats,
};
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Façade over the container engine.
///
/// This is the only seam through which AutoPod touches the engine. All
/// operations are synchronous to the caller; anything with unbounded
/// duration (build, pull, push) must be invoked off the request-handling
/// path. Implementations never retry internally and map "already in the
/// desired state" to success rather than an error.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Lists all containers, running or not.
    async fn list(&self) -> Result<Vec<EngineContainer>>;

    /// Looks up a single container by exact name.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::NotFound` if no container bears the name.
    async fn inspect(&self, name: &str) -> Result<EngineContainer>;

    /// Starts a container. Starting an already-running container succeeds.
    async fn start(&self, name: &str) -> Result<()>;

    /// Stops a container. Stopping an already-stopped container succeeds.
    async fn stop(&self, name: &str) -> Result<()>;

    /// Restarts a running container.
    async fn restart(&self, name: &str) -> Result<()>;

    /// Removes a container, stopping it first if necessary.
    async fn remove(&self, name: &str) -> Result<()>;

    /// Builds an image from a build context directory.
    ///
    /// Returns the image ID.
    async fn build(&self, context: &Path, tag: &str) -> Result<String>;

    /// Runs a detached container from an image with automatic host-port
    /// allocation for every exposed port.
    ///
    /// Returns the engine-assigned container ID.
    async fn run(&self, image: &str, name: &str) -> Result<String>;

    /// Pulls an image from a registry.
    async fn pull(&self, image: &str) -> Result<()>;

    /// Pushes an image to a registry, optionally with credentials.
    async fn push(&self, image: &str, creds: Option<(&str, &str)>) -> Result<()>;

    /// Tags an image with an additional name.
    async fn tag_image(&self, source: &str, target: &str) -> Result<()>;

    /// Removes a local image.
    async fn remove_image(&self, image: &str) -> Result<()>;

    /// Lists local images.
    async fn images(&self) -> Result<Vec<EngineImage>>;

    /// Searches configured registries for images.
    async fn search_images(&self, term: &str, limit: u32) -> Result<Vec<EngineSearchResult>>;

    /// Returns the engine's full inspect document for an image.
    async fn image_details(&self, image: &str) -> Result<serde_json::Value>;

    /// Returns the layer history of an image.
    async fn image_history(&self, image: &str) -> Result<Vec<EngineHistoryEntry>>;

    /// Returns point-in-time statistics for one container.
    async fn stats(&self, name: &str) -> Result<EngineStats>;
}
