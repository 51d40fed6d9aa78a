//! Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for rate resolution, connectivity, and the worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds a cached rate stays fresh
    pub cache_ttl_secs: u64,

    /// Per-fetch HTTP timeout in seconds
    pub fetch_timeout_secs: u64,

    /// Transient-failure retries per fetch (429/5xx, connect, timeout)
    pub fetch_retries: u32,

    /// Base URL of the primary rate provider
    pub primary_url: String,

    /// Base URL of the fallback rate provider
    pub fallback_url: String,

    /// Host:port the connectivity probe connects to
    pub probe_addr: String,

    /// Probe connect timeout in seconds
    pub probe_timeout_secs: u64,

    /// Maximum concurrent blocking tasks in the worker pool
    pub worker_count: usize,

    /// Directory holding the asset JSON files
    pub assets_dir: PathBuf,

    /// Path of the last-known-rate snapshot file
    pub snapshot_path: PathBuf,

    /// Serve a stale cache entry when every source fails
    pub allow_stale: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            fetch_timeout_secs: 5,
            fetch_retries: 3,
            primary_url: "https://api.frankfurter.app".to_string(),
            fallback_url: "https://www.floatrates.com".to_string(),
            probe_addr: "8.8.8.8:53".to_string(),
            probe_timeout_secs: 3,
            worker_count: 10,
            assets_dir: PathBuf::from("assets"),
            snapshot_path: PathBuf::from("assets/previous_rates.json"),
            allow_stale: false,
        }
    }
}

impl EngineConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}
