//! Webhook-triggered deployment pipeline.
//!
//! One invocation per webhook delivery, moving strictly forward through
//! `received → cloning → building → swapping → done`. There is no retry
//! within an invocation; a failure at any stage finalizes the deployment
//! record as failed with the stage captured, and only a new push restarts
//! the pipeline.
//!
//! Swap ordering: the old container is not touched until the new image has
//! built, but if the run step fails after the old container was removed
//! the target name is left absent. Rollback is deliberately unavailable,
//! an availability trade-off, and the failure says so.

use crate::config::DeployConfig;
use crate::error::{CoreError, Result};
use crate::sync::observe;
use autopod_runtime::{ContainerRuntime, RuntimeError};
use autopod_store::{
    DeployStage, DeploymentOutcome, DeploymentRecord, StateStore,
};
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Build descriptor used when a repository has none, so first-time users
/// still get a visible success: a static page served by busybox httpd.
const PLACEHOLDER_DOCKERFILE: &str = "\
FROM docker.io/library/busybox:stable
RUN mkdir -p /www && \
    echo '<html><body><h1>AutoPod</h1><p>Deployed without a build descriptor; add a Dockerfile to your repository to replace this page.</p></body></html>' > /www/index.html
EXPOSE 8080
CMD [\"httpd\", \"-f\", \"-p\", \"8080\", \"-h\", \"/www\"]
";

/// GitHub push webhook payload (the subset the pipeline consumes).
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    /// Repository block of the push event.
    pub repository: Option<RepositoryInfo>,
    /// Commit the push points at.
    #[serde(default)]
    pub after: Option<String>,
    /// Explicit target container name, overriding the repository name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Repository block of the webhook payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryInfo {
    #[serde(default)]
    pub clone_url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Clones, builds and swaps. One logically serialized queue per target
/// name: a second push for a busy target waits its turn instead of racing,
/// while different targets deploy concurrently.
pub struct DeployPipeline {
    runtime: Arc<dyn ContainerRuntime>,
    store: Arc<StateStore>,
    config: DeployConfig,
    targets: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl DeployPipeline {
    /// Creates a pipeline.
    #[must_use]
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        store: Arc<StateStore>,
        config: DeployConfig,
    ) -> Self {
        Self {
            runtime,
            store,
            config,
            targets: Mutex::new(HashMap::new()),
        }
    }

    /// Validates a payload, returning the clone URL and target name.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` when the payload has no clonable URL or no
    /// usable target name.
    pub fn validate(payload: &WebhookPayload) -> Result<(String, String)> {
        let repository = payload
            .repository
            .as_ref()
            .ok_or_else(|| CoreError::bad_request("webhook payload missing repository"))?;

        let clone_url = repository
            .clone_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| CoreError::bad_request("webhook payload missing repository clone_url"))?
            .to_string();

        let target = payload
            .name
            .as_deref()
            .or(repository.name.as_deref())
            .map(sanitize_target)
            .filter(|t| !t.is_empty())
            .or_else(|| {
                let stem = clone_url
                    .rsplit('/')
                    .next()
                    .map(|s| s.trim_end_matches(".git"));
                stem.map(sanitize_target).filter(|t| !t.is_empty())
            })
            .ok_or_else(|| {
                CoreError::bad_request("cannot derive a container name from the webhook payload")
            })?;

        Ok((clone_url, target))
    }

    /// Runs a deployment for a webhook payload.
    ///
    /// The stages run on a spawned task, so a disconnected caller never
    /// cancels an in-flight build or swap; this method waits for the
    /// terminal stage (long-poll contract) up to the configured budget,
    /// after which the record is finalized as timed out while the
    /// underlying work keeps running to completion.
    pub async fn deploy(self: Arc<Self>, payload: WebhookPayload) -> Result<DeploymentRecord> {
        let (clone_url, target) = Self::validate(&payload)?;

        let record = DeploymentRecord::open(&clone_url, &target);
        let id = record.id;
        self.store.open_deployment(record)?;
        self.log_stage(id, &format!("received push for {target} ({clone_url})"));
        if let Some(commit) = payload.after.as_deref() {
            self.log_stage(id, &format!("commit {commit}"));
        }

        let handle = tokio::spawn(Arc::clone(&self).run_stages(id, clone_url, target));

        let budget = Duration::from_secs(self.config.pipeline_timeout_secs);
        match tokio::time::timeout(budget, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                let err = CoreError::internal(format!("deployment task failed: {join_err}"));
                self.finalize_failure(id, &err);
                Err(err)
            }
            Err(_elapsed) => {
                self.log_stage(id, "deployment budget exhausted");
                if let Err(e) = self.store.finalize_deployment(id, |d| {
                    d.outcome = Some(DeploymentOutcome::TimedOut);
                    d.error = Some(format!(
                        "deployment exceeded {}s budget",
                        self.config.pipeline_timeout_secs
                    ));
                }) {
                    warn!(deployment = %id, error = %e, "failed to finalize timed-out deployment");
                }
                Err(CoreError::internal(format!(
                    "deployment timed out after {}s; the build keeps running and state will reflect the eventual result",
                    self.config.pipeline_timeout_secs
                )))
            }
        }
    }

    #[instrument(skip(self), fields(deployment = %id))]
    async fn run_stages(
        self: Arc<Self>,
        id: Uuid,
        clone_url: String,
        target: String,
    ) -> Result<DeploymentRecord> {
        // Serialize deployments per target; queued pushes run eventually,
        // unlike actions, because a deployment is explicit user intent.
        let lock = self.target_lock(&target);
        let _serialized = lock.lock().await;

        match self.try_stages(id, &clone_url, &target).await {
            Ok(record) => Ok(record),
            Err(err) => {
                self.log_stage(id, &format!("failed: {err}"));
                self.finalize_failure(id, &err);
                Err(err)
            }
        }
    }

    async fn try_stages(&self, id: Uuid, clone_url: &str, target: &str) -> Result<DeploymentRecord> {
        // cloning: shallow, into a disposable working directory.
        self.log_stage(id, "cloning repository");
        let workdir = tempfile::tempdir()
            .map_err(|e| CoreError::stage_failure(DeployStage::Cloning, e))?;
        let repo_dir = workdir.path().join("repo");
        self.clone_repository(clone_url, &repo_dir)
            .await
            .map_err(|e| CoreError::stage_failure(DeployStage::Cloning, e))?;

        // building: tags are never reused, so rollbacks and caching stay
        // unambiguous.
        let build_number = self.store.next_build_number(target)?;
        let tag = format!("{target}:build-{build_number}");
        if find_build_descriptor(&repo_dir).is_none() {
            info!(container = target, "no build descriptor in repository, using placeholder");
            self.log_stage(id, "no build descriptor found, building placeholder application");
            std::fs::write(repo_dir.join("Dockerfile"), PLACEHOLDER_DOCKERFILE)
                .map_err(|e| CoreError::stage_failure(DeployStage::Building, e))?;
        }
        self.log_stage(id, &format!("building image {tag}"));
        let image_id = self
            .runtime
            .build(&repo_dir, &tag)
            .await
            .map_err(|e| CoreError::stage_failure(DeployStage::Building, e))?;
        self.log_stage(id, &format!("built {tag} ({image_id})"));

        // swapping: the old container outlives a failed build; it is only
        // discarded once the new image exists.
        self.log_stage(id, "swapping container");
        let existing = match self.runtime.inspect(target).await {
            Ok(container) => Some(container),
            Err(RuntimeError::NotFound(_)) => None,
            Err(e) => return Err(CoreError::stage_failure(DeployStage::Swapping, e)),
        };
        if let Some(old) = existing {
            if old.is_running() {
                self.runtime
                    .stop(target)
                    .await
                    .map_err(|e| CoreError::stage_failure(DeployStage::Swapping, e))?;
            }
            self.runtime
                .remove(target)
                .await
                .map_err(|e| CoreError::stage_failure(DeployStage::Swapping, e))?;
            self.log_stage(id, "old container removed");
        }

        let runtime_id = match self.runtime.run(&tag, target).await {
            Ok(runtime_id) => runtime_id,
            Err(e) => {
                // The old container is already gone; the target name is
                // left absent. Known risk, surfaced distinctly.
                return Err(CoreError::Pipeline {
                    stage: DeployStage::Swapping,
                    message: format!("rollback=unavailable: {e}"),
                    rollback_unavailable: true,
                });
            }
        };

        // done: update the container record through the same path the
        // synchronizer uses, so the dashboard sees the new container
        // without waiting for the next sync tick.
        let observed = match self.runtime.inspect(target).await {
            Ok(live) => observe(&live),
            Err(e) => {
                warn!(container = target, error = %e, "cannot inspect freshly run container");
                autopod_store::ObservedContainer {
                    name: target.to_string(),
                    runtime_id,
                    image: tag.clone(),
                    status: autopod_store::ContainerStatus::Running,
                    ports: Vec::new(),
                }
            }
        };
        let ports = observed.ports.clone();
        self.store.upsert_live(observed)?;

        let access_url = ports
            .first()
            .map(|p| format!("http://{}:{}", self.config.host, p.host_port));
        let record = self.store.finalize_deployment(id, |d| {
            d.outcome = Some(DeploymentOutcome::Success);
            d.resulting_container_name = Some(target.to_string());
            d.ports = ports;
            d.access_url = access_url;
        })?;
        self.log_stage(id, "deployment complete");
        info!(container = target, deployment = %id, "deployment complete");
        Ok(record)
    }

    async fn clone_repository(&self, url: &str, dest: &Path) -> std::result::Result<(), String> {
        let output = Command::new(&self.config.git_binary)
            .arg("clone")
            .arg("--depth")
            .arg("1")
            .arg(url)
            .arg(dest)
            .output()
            .await
            .map_err(|e| format!("cannot run {}: {e}", self.config.git_binary))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(if stderr.is_empty() {
                format!("clone exited with {}", output.status)
            } else {
                stderr
            })
        }
    }

    fn target_lock(&self, target: &str) -> Arc<tokio::sync::Mutex<()>> {
        // A poisoned table only means a panic elsewhere; the map itself is
        // still usable.
        let mut targets = self
            .targets
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(targets.entry(target.to_string()).or_default())
    }

    fn finalize_failure(&self, id: Uuid, err: &CoreError) {
        let stage = err.failed_stage();
        if let Err(e) = self.store.finalize_deployment(id, |d| {
            d.outcome = Some(DeploymentOutcome::Failed);
            d.failed_stage = stage;
            d.error = Some(err.to_string());
        }) {
            warn!(deployment = %id, error = %e, "failed to finalize deployment record");
        }
    }

    /// Appends a line to the deployment's log file. Log writing is
    /// best-effort; the pipeline never fails because of it.
    fn log_stage(&self, id: Uuid, line: &str) {
        let path = self.log_path(id);
        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut f| writeln!(f, "{} {line}", Utc::now().to_rfc3339()));
        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "cannot write deployment log");
        }
    }

    fn log_path(&self, id: Uuid) -> PathBuf {
        self.store
            .data_dir()
            .join("deployments")
            .join(format!("{id}.log"))
    }
}

/// Locates a build descriptor at the repository root.
fn find_build_descriptor(repo_dir: &Path) -> Option<PathBuf> {
    ["Dockerfile", "Containerfile"]
        .iter()
        .map(|name| repo_dir.join(name))
        .find(|path| path.is_file())
}

/// Normalizes a repository or payload name into a container name.
fn sanitize_target(name: &str) -> String {
    name.trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '-'
            }
        })
        .collect::<String>()
        .trim_matches('-')
        .to_string()
}
