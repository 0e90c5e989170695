//! TOML file configuration structures.
//!
//! These structs directly map to the `scorecast.toml` file format.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub score_source: ScoreSourceConfig,
    pub stream: StreamConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub mock: MockConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// External score API section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreSourceConfig {
    /// Base URL of the score API, e.g. "http://scores.internal:8080".
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_backoff_ms() -> u64 {
    500
}

/// Downstream stream section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Base URL of the stream's REST proxy, e.g. "http://kafka-rest:8082".
    pub rest_url: String,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_timeout_ms")]
    pub publish_timeout_ms: u64,
}

fn default_topic() -> String {
    "live-score-updates".to_string()
}

/// Scheduler section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            pool_size: default_pool_size(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    10
}

fn default_pool_size() -> usize {
    10
}

fn default_shutdown_grace_secs() -> u64 {
    30
}

/// Built-in stand-in score API for local runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MockConfig {
    #[serde(default)]
    pub enabled: bool,
}
