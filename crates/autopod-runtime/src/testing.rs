//! In-memory engine for tests.
//!
//! Behaves like a tiny container engine: containers live in a map, lifecycle
//! calls flip their state, and every operation is counted so tests can
//! assert exactly how often the engine was touched. Failure injection flags
//! simulate an unreachable engine or a broken image run.

use crate::adapter::ContainerRuntime;
use crate::engine::{
    EngineContainer, EngineHistoryEntry, EngineImage, EnginePort, EngineSearchResult, EngineStats,
};
use crate::error::{Result, RuntimeError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Per-operation call counters.
#[derive(Debug, Default)]
pub struct CallCounts {
    pub list: AtomicUsize,
    pub start: AtomicUsize,
    pub stop: AtomicUsize,
    pub restart: AtomicUsize,
    pub remove: AtomicUsize,
    pub build: AtomicUsize,
    pub run: AtomicUsize,
    pub pull: AtomicUsize,
    pub push: AtomicUsize,
}

/// Fake engine backed by an in-memory container map.
#[derive(Debug, Default)]
pub struct InMemoryRuntime {
    containers: Mutex<HashMap<String, EngineContainer>>,
    built_tags: Mutex<Vec<String>>,
    pushed: Mutex<Vec<String>>,
    next_host_port: AtomicU16,
    fail_list: AtomicBool,
    fail_run: AtomicBool,
    stop_delay_ms: AtomicUsize,
    pub calls: CallCounts,
}

impl InMemoryRuntime {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_host_port: AtomicU16::new(32768),
            ..Default::default()
        }
    }

    /// Seeds a container in the given state.
    pub fn insert(&self, name: &str, state: &str, image: &str) {
        let mut containers = self.containers.lock().unwrap();
        containers.insert(
            name.to_string(),
            EngineContainer {
                id: format!("{name}-id"),
                names: vec![name.to_string()],
                image: image.to_string(),
                state: state.to_string(),
                status: state.to_string(),
                created_at: String::new(),
                ports: vec![],
            },
        );
    }

    /// Makes subsequent `list` calls fail as if the engine were down.
    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent `run` calls fail.
    pub fn set_fail_run(&self, fail: bool) {
        self.fail_run.store(fail, Ordering::SeqCst);
    }

    /// Adds an artificial delay inside `stop`, widening race windows for
    /// concurrency tests.
    pub fn set_stop_delay(&self, delay: Duration) {
        self.stop_delay_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    /// Tags passed to `build`, in order.
    #[must_use]
    pub fn built_tags(&self) -> Vec<String> {
        self.built_tags.lock().unwrap().clone()
    }

    /// Images passed to `push`, in order.
    #[must_use]
    pub fn pushed_images(&self) -> Vec<String> {
        self.pushed.lock().unwrap().clone()
    }

    fn with_container<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut EngineContainer) -> T,
    ) -> Result<T> {
        let mut containers = self.containers.lock().unwrap();
        let container = containers
            .get_mut(name)
            .ok_or_else(|| RuntimeError::not_found(format!("container {name}")))?;
        Ok(f(container))
    }
}

#[async_trait]
impl ContainerRuntime for InMemoryRuntime {
    async fn list(&self) -> Result<Vec<EngineContainer>> {
        self.calls.list.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(RuntimeError::unavailable("injected engine outage"));
        }
        Ok(self.containers.lock().unwrap().values().cloned().collect())
    }

    async fn inspect(&self, name: &str) -> Result<EngineContainer> {
        self.containers
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::not_found(format!("container {name}")))
    }

    async fn start(&self, name: &str) -> Result<()> {
        self.calls.start.fetch_add(1, Ordering::SeqCst);
        self.with_container(name, |c| c.state = "running".to_string())
    }

    async fn stop(&self, name: &str) -> Result<()> {
        self.calls.stop.fetch_add(1, Ordering::SeqCst);
        let delay = self.stop_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }
        self.with_container(name, |c| c.state = "exited".to_string())
    }

    async fn restart(&self, name: &str) -> Result<()> {
        self.calls.restart.fetch_add(1, Ordering::SeqCst);
        self.with_container(name, |c| c.state = "running".to_string())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        self.calls.remove.fetch_add(1, Ordering::SeqCst);
        let mut containers = self.containers.lock().unwrap();
        containers
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RuntimeError::not_found(format!("container {name}")))
    }

    async fn build(&self, _context: &Path, tag: &str) -> Result<String> {
        self.calls.build.fetch_add(1, Ordering::SeqCst);
        self.built_tags.lock().unwrap().push(tag.to_string());
        Ok(format!("sha256:{:064}", self.calls.build.load(Ordering::SeqCst)))
    }

    async fn run(&self, image: &str, name: &str) -> Result<String> {
        self.calls.run.fetch_add(1, Ordering::SeqCst);
        if self.fail_run.load(Ordering::SeqCst) {
            return Err(RuntimeError::Command("injected run failure".to_string()));
        }
        let host_port = self.next_host_port.fetch_add(1, Ordering::SeqCst);
        let id = format!("{name}-id");
        self.containers.lock().unwrap().insert(
            name.to_string(),
            EngineContainer {
                id: id.clone(),
                names: vec![name.to_string()],
                image: image.to_string(),
                state: "running".to_string(),
                status: "Up 1 second".to_string(),
                created_at: String::new(),
                ports: vec![EnginePort {
                    host_ip: String::new(),
                    container_port: 8080,
                    host_port,
                    protocol: "tcp".to_string(),
                }],
            },
        );
        Ok(id)
    }

    async fn pull(&self, _image: &str) -> Result<()> {
        self.calls.pull.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn push(&self, image: &str, _creds: Option<(&str, &str)>) -> Result<()> {
        self.calls.push.fetch_add(1, Ordering::SeqCst);
        self.pushed.lock().unwrap().push(image.to_string());
        Ok(())
    }

    async fn tag_image(&self, _source: &str, _target: &str) -> Result<()> {
        Ok(())
    }

    async fn remove_image(&self, _image: &str) -> Result<()> {
        Ok(())
    }

    async fn images(&self) -> Result<Vec<EngineImage>> {
        Ok(self
            .built_tags
            .lock()
            .unwrap()
            .iter()
            .enumerate()
            .map(|(i, tag)| EngineImage {
                id: format!("sha256:{i:064}"),
                repo_tags: vec![tag.clone()],
                created: 0,
                size: 0,
            })
            .collect())
    }

    async fn search_images(&self, term: &str, _limit: u32) -> Result<Vec<EngineSearchResult>> {
        Ok(vec![EngineSearchResult {
            index: "docker.io".to_string(),
            name: format!("docker.io/library/{term}"),
            description: String::new(),
            stars: 0,
            official: String::new(),
        }])
    }

    async fn image_details(&self, image: &str) -> Result<serde_json::Value> {
        Ok(serde_json::json!({ "Id": image }))
    }

    async fn image_history(&self, _image: &str) -> Result<Vec<EngineHistoryEntry>> {
        Ok(vec![])
    }

    async fn stats(&self, name: &str) -> Result<EngineStats> {
        self.inspect(name).await?;
        Ok(EngineStats {
            name: name.to_string(),
            cpu_percent: "0.00%".to_string(),
            mem_usage: "1MB / 1GB".to_string(),
            mem_percent: "0.10%".to_string(),
            net_io: "0B / 0B".to_string(),
            block_io: "0B / 0B".to_string(),
            pids: "1".to_string(),
        })
    }
}
