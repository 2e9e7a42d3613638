use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// API prefix of the remote store.
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Local redb file.
    #[serde(default = "default_database")]
    pub database: PathBuf,
    #[serde(default = "default_idle_threshold_ms")]
    pub idle_threshold_ms: u64,
    #[serde(default = "default_idle_backoff_ms")]
    pub idle_backoff_ms: u64,
    #[serde(default = "default_idle_interval_ms")]
    pub idle_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            database: default_database(),
            idle_threshold_ms: default_idle_threshold_ms(),
            idle_backoff_ms: default_idle_backoff_ms(),
            idle_interval_ms: default_idle_interval_ms(),
        }
    }
}

fn default_server_url() -> String {
    "http://localhost:8787/api".to_string()
}

fn default_database() -> PathBuf {
    PathBuf::from("./reelkit.redb")
}

fn default_idle_threshold_ms() -> u64 {
    30_000
}

fn default_idle_backoff_ms() -> u64 {
    120_000
}

fn default_idle_interval_ms() -> u64 {
    300_000
}

impl SyncConfig {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }
}
