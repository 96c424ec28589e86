//! Configuration management.
//!
//! AutoPod configuration is loaded from multiple sources with the
//! following priority:
//!
//! 1. Environment variables (`AUTOPOD_*`, `__` as the section separator)
//! 2. Configuration file (`~/.config/autopod/config.toml`)
//! 3. Default values
//!
//! ## Example Configuration File
//!
//! ```toml
//! # AutoPod configuration file
//! data_dir = "~/.autopod"
//! listen_addr = "0.0.0.0:5000"
//!
//! [engine]
//! binary = "podman"
//!
//! [sync]
//! interval_secs = 5
//! purge_after_misses = 3
//!
//! [actions]
//! lease_secs = 60
//!
//! [deploy]
//! host = "127.0.0.1"
//! pipeline_timeout_secs = 600
//!
//! [logging]
//! level = "info"
//! ```

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// AutoPod configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory (state index, deployment logs).
    pub data_dir: PathBuf,
    /// Address the REST API listens on.
    pub listen_addr: SocketAddr,
    /// Container engine configuration.
    pub engine: EngineConfig,
    /// Synchronizer configuration.
    pub sync: SyncConfig,
    /// Action executor configuration.
    pub actions: ActionConfig,
    /// Deployment pipeline configuration.
    pub deploy: DeployConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            listen_addr: "0.0.0.0:5000".parse().expect("valid default address"),
            engine: EngineConfig::default(),
            sync: SyncConfig::default(),
            actions: ActionConfig::default(),
            deploy: DeployConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from files and environment.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> std::result::Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(user_config_path()))
            .merge(Env::prefixed("AUTOPOD_").split("__"))
            .extract()
    }

    /// Loads configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: impl AsRef<std::path::Path>) -> std::result::Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("AUTOPOD_").split("__"))
            .extract()
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".autopod"))
        .unwrap_or_else(|| PathBuf::from("/var/lib/autopod"))
}

fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("autopod").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("/etc/autopod/config.toml"))
}

/// Container engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine binary name (`podman` or `docker`).
    pub binary: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: "podman".to_string(),
        }
    }
}

/// Synchronizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between synchronization cycles.
    pub interval_secs: u64,
    /// Consecutive misses before a record is purged.
    pub purge_after_misses: u32,
}

impl SyncConfig {
    /// Returns the cycle interval as a duration.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            purge_after_misses: 3,
        }
    }
}

/// Action executor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    /// Hard lease expiry in seconds; self-heals if a worker crashes
    /// mid-action.
    pub lease_secs: u64,
}

impl ActionConfig {
    /// Returns the lease time-to-live as a duration.
    #[must_use]
    pub const fn lease_ttl(&self) -> Duration {
        Duration::from_secs(self.lease_secs)
    }
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self { lease_secs: 60 }
    }
}

/// Deployment pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Host name used when deriving access URLs for deployed containers.
    pub host: String,
    /// Overall pipeline budget in seconds before the deployment is
    /// recorded as timed out.
    pub pipeline_timeout_secs: u64,
    /// Git binary used for shallow clones.
    pub git_binary: String,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            pipeline_timeout_secs: 600,
            git_binary: "git".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
