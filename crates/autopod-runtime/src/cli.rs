//! CLI-backed engine implementation.
//!
//! Drives the container engine binary (`podman` by default) as a child
//! process, the same way an operator would at a shell, and parses its
//! `--format json` output. The binary name is configurable so a Docker
//! installation can be used instead.

use crate::adapter::ContainerRuntime;
use crate::engine::{
    EngineContainer, EngineHistoryEntry, EngineImage, EngineSearchResult, EngineStats,
};
use crate::error::{Result, RuntimeError};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Container engine driven through its command-line interface.
#[derive(Debug, Clone)]
pub struct CliRuntime {
    binary: String,
}

impl CliRuntime {
    /// Creates an adapter for the given engine binary (`podman`, `docker`).
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Returns the engine binary name.
    #[must_use]
    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Runs the engine with the given arguments and returns trimmed stdout.
    ///
    /// Failure classification: a missing binary or unreachable engine daemon
    /// maps to `Unavailable`, an unknown resource to `NotFound`, anything
    /// else to `Command` with the engine's stderr attached.
    async fn exec(&self, args: &[&str]) -> Result<String> {
        debug!(engine = %self.binary, ?args, "engine exec");

        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => RuntimeError::Unavailable(format!(
                    "engine binary '{}' not found in PATH",
                    self.binary
                )),
                _ => RuntimeError::Io(e),
            })?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(classify_failure(&stderr))
    }

    /// Parses a JSON document from engine stdout. An empty document is
    /// treated as an empty array, which podman emits for some listings.
    fn parse_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T> {
        let raw = if raw.is_empty() { "[]" } else { raw };
        serde_json::from_str(raw).map_err(|e| RuntimeError::Parse(e.to_string()))
    }
}

/// Maps engine stderr to a typed error.
fn classify_failure(stderr: &str) -> RuntimeError {
    let lower = stderr.to_lowercase();
    if lower.contains("no such container")
        || lower.contains("no such image")
        || lower.contains("no such object")
        || lower.contains("image not known")
    {
        RuntimeError::NotFound(stderr.to_string())
    } else if lower.contains("cannot connect")
        || lower.contains("connection refused")
        || lower.contains("is the docker daemon running")
    {
        RuntimeError::Unavailable(stderr.to_string())
    } else {
        RuntimeError::Command(stderr.to_string())
    }
}

/// Returns whether stderr describes a container already in the desired
/// state, which the adapter contract treats as success.
fn is_desired_state_noop(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("is not running")
        || lower.contains("already stopped")
        || lower.contains("container state improper")
}

#[async_trait]
impl ContainerRuntime for CliRuntime {
    async fn list(&self) -> Result<Vec<EngineContainer>> {
        let raw = self.exec(&["ps", "--all", "--format", "json"]).await?;
        Self::parse_json(&raw)
    }

    async fn inspect(&self, name: &str) -> Result<EngineContainer> {
        self.list()
            .await?
            .into_iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| RuntimeError::not_found(format!("container {name}")))
    }

    async fn start(&self, name: &str) -> Result<()> {
        // Starting a running container is a successful no-op at the engine.
        self.exec(&["start", name]).await?;
        Ok(())
    }

    async fn stop(&self, name: &str) -> Result<()> {
        match self.exec(&["stop", name]).await {
            Ok(_) => Ok(()),
            Err(RuntimeError::Command(stderr)) if is_desired_state_noop(&stderr) => {
                debug!(container = name, "stop was a no-op");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn restart(&self, name: &str) -> Result<()> {
        self.exec(&["restart", name]).await?;
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        self.exec(&["rm", "--force", name]).await?;
        Ok(())
    }

    async fn build(&self, context: &Path, tag: &str) -> Result<String> {
        let context = context.to_string_lossy();
        self.exec(&["build", "--quiet", "--tag", tag, &context])
            .await
    }

    async fn run(&self, image: &str, name: &str) -> Result<String> {
        self.exec(&["run", "--detach", "--name", name, "--publish-all", image])
            .await
    }

    async fn pull(&self, image: &str) -> Result<()> {
        self.exec(&["pull", image]).await?;
        Ok(())
    }

    async fn push(&self, image: &str, creds: Option<(&str, &str)>) -> Result<()> {
        match creds {
            Some((user, secret)) => {
                let creds = format!("{user}:{secret}");
                // The credential string must not leak through exec's debug
                // logging; push is the one command built outside exec.
                let output = Command::new(&self.binary)
                    .args(["push", "--creds", &creds, image])
                    .stdin(Stdio::null())
                    .output()
                    .await
                    .map_err(|e| match e.kind() {
                        std::io::ErrorKind::NotFound => RuntimeError::Unavailable(format!(
                            "engine binary '{}' not found in PATH",
                            self.binary
                        )),
                        _ => RuntimeError::Io(e),
                    })?;
                if output.status.success() {
                    Ok(())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                    Err(classify_failure(&stderr))
                }
            }
            None => {
                self.exec(&["push", image]).await?;
                Ok(())
            }
        }
    }

    async fn tag_image(&self, source: &str, target: &str) -> Result<()> {
        self.exec(&["tag", source, target]).await?;
        Ok(())
    }

    async fn remove_image(&self, image: &str) -> Result<()> {
        self.exec(&["rmi", image]).await?;
        Ok(())
    }

    async fn images(&self) -> Result<Vec<EngineImage>> {
        let raw = self.exec(&["images", "--format", "json"]).await?;
        Self::parse_json(&raw)
    }

    async fn search_images(&self, term: &str, limit: u32) -> Result<Vec<EngineSearchResult>> {
        let limit = limit.to_string();
        let raw = self
            .exec(&["search", "--limit", &limit, "--format", "json", term])
            .await?;
        Self::parse_json(&raw)
    }

    async fn image_details(&self, image: &str) -> Result<serde_json::Value> {
        let raw = self.exec(&["image", "inspect", image]).await?;
        let mut docs: Vec<serde_json::Value> = Self::parse_json(&raw)?;
        if docs.is_empty() {
            return Err(RuntimeError::not_found(format!("image {image}")));
        }
        Ok(docs.remove(0))
    }

    async fn image_history(&self, image: &str) -> Result<Vec<EngineHistoryEntry>> {
        let raw = self.exec(&["history", "--format", "json", image]).await?;
        Self::parse_json(&raw)
    }

    async fn stats(&self, name: &str) -> Result<EngineStats> {
        let raw = self
            .exec(&["stats", "--no-stream", "--format", "json", name])
            .await?;
        let mut entries: Vec<EngineStats> = Self::parse_json(&raw)?;
        if entries.is_empty() {
            warn!(container = name, "engine returned no stats");
            return Err(RuntimeError::not_found(format!("stats for {name}")));
        }
        Ok(entries.remove(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_not_found_stderr() {
        let err = classify_failure("Error: no such container \"web\"");
        assert!(err.is_not_found());
    }

    #[test]
    fn classifies_unreachable_engine() {
        let err = classify_failure("Cannot connect to Podman socket");
        assert!(matches!(err, RuntimeError::Unavailable(_)));
    }

    #[test]
    fn classifies_generic_failure() {
        let err = classify_failure("Error: something else went wrong");
        assert!(matches!(err, RuntimeError::Command(_)));
    }

    #[test]
    fn stop_noop_stderr_is_recognized() {
        assert!(is_desired_state_noop("Error: container web is not running"));
        assert!(is_desired_state_noop("container already stopped"));
        assert!(!is_desired_state_noop("Error: no such container"));
    }
}
