//! Engine data types.
//!
//! Serde views of the engine's `--format json` output. Podman and Docker
//! differ in small ways, so every field is tolerant of absence; the adapter
//! only relies on the subset the orchestrator actually consumes.

use serde::{Deserialize, Serialize};

/// A container as reported by `ps --all --format json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EngineContainer {
    /// Engine-assigned container ID.
    pub id: String,
    /// Container names (the engine reports a list; the first is canonical).
    pub names: Vec<String>,
    /// Image reference the container was created from.
    pub image: String,
    /// Lifecycle state (`created`, `running`, `exited`, ...).
    pub state: String,
    /// Human-readable status line (`Up 3 minutes`, `Exited (0) ...`).
    pub status: String,
    /// Creation timestamp as reported by the engine.
    pub created_at: String,
    /// Published port mappings.
    pub ports: Vec<EnginePort>,
}

impl EngineContainer {
    /// Canonical container name, stripped of any leading slash.
    #[must_use]
    pub fn name(&self) -> &str {
        self.names
            .first()
            .map_or("", |n| n.strip_prefix('/').unwrap_or(n))
    }

    /// Returns whether the engine reports this container as running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.eq_ignore_ascii_case("running")
    }
}

/// A single published port mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnginePort {
    /// Host IP the port is bound to (empty means all interfaces).
    pub host_ip: String,
    /// Port inside the container.
    pub container_port: u16,
    /// Allocated host port.
    pub host_port: u16,
    /// Protocol (`tcp` or `udp`).
    pub protocol: String,
}

/// A local image as reported by `images --format json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EngineImage {
    /// Image ID.
    pub id: String,
    /// Repository tags.
    pub repo_tags: Vec<String>,
    /// Creation time (unix seconds).
    pub created: i64,
    /// Image size in bytes.
    pub size: u64,
}

/// Point-in-time statistics for one container, from
/// `stats --no-stream --format json`.
///
/// Field naming differs across engine versions, hence the aliases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineStats {
    #[serde(rename = "Name", alias = "name")]
    pub name: String,
    #[serde(rename = "CPUPerc", alias = "cpu_percent", alias = "CPU")]
    pub cpu_percent: String,
    #[serde(rename = "MemUsage", alias = "mem_usage")]
    pub mem_usage: String,
    #[serde(rename = "MemPerc", alias = "mem_percent")]
    pub mem_percent: String,
    #[serde(rename = "NetIO", alias = "netio", alias = "net_io")]
    pub net_io: String,
    #[serde(rename = "BlockIO", alias = "blocki", alias = "block_io")]
    pub block_io: String,
    #[serde(rename = "PIDs", alias = "pids", alias = "PIDS")]
    pub pids: String,
}

/// A registry search hit, from `search --format json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EngineSearchResult {
    /// Registry index the hit came from.
    pub index: String,
    /// Fully qualified image name.
    pub name: String,
    /// Image description.
    pub description: String,
    /// Star count.
    pub stars: i64,
    /// Official-image marker.
    pub official: String,
}

/// One layer of an image's history, from `history --format json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineHistoryEntry {
    #[serde(rename = "ID", alias = "id", alias = "Id")]
    pub id: String,
    #[serde(rename = "Created", alias = "created")]
    pub created: String,
    #[serde(rename = "CreatedBy", alias = "createdBy", alias = "created_by")]
    pub created_by: String,
    #[serde(rename = "Size", alias = "size")]
    pub size: serde_json::Value,
    #[serde(rename = "Comment", alias = "comment")]
    pub comment: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_engine_ps_output() {
        let raw = r#"[{
            "Id": "7f3a9c2d1e4b",
            "Names": ["demo"],
            "Image": "localhost/demo:build-3",
            "State": "running",
            "Status": "Up 2 minutes",
            "CreatedAt": "2026-08-01 10:00:00 +0000 UTC",
            "Ports": [{"host_ip": "", "container_port": 8080, "host_port": 32771, "protocol": "tcp"}]
        }]"#;

        let containers: Vec<EngineContainer> = serde_json::from_str(raw).unwrap();
        assert_eq!(containers.len(), 1);
        let c = &containers[0];
        assert_eq!(c.name(), "demo");
        assert!(c.is_running());
        assert_eq!(c.ports[0].host_port, 32771);
        assert_eq!(c.ports[0].container_port, 8080);
    }

    #[test]
    fn tolerates_missing_fields() {
        let containers: Vec<EngineContainer> =
            serde_json::from_str(r#"[{"Id": "abc123"}]"#).unwrap();
        assert_eq!(containers[0].name(), "");
        assert!(!containers[0].is_running());
        assert!(containers[0].ports.is_empty());
    }

    #[test]
    fn name_strips_leading_slash() {
        let c = EngineContainer {
            names: vec!["/demo".to_string()],
            ..Default::default()
        };
        assert_eq!(c.name(), "demo");
    }
}
