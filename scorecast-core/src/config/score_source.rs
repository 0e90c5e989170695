//! Score source configuration.

use std::time::Duration;
use url::Url;

/// Where and how to fetch score snapshots.
#[derive(Debug, Clone)]
pub struct ScoreSourceConfig {
    /// Base URL; snapshots are read from `{base_url}/events/{id}/score`.
    pub base_url: Url,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Retries after the first attempt for retryable failures.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on every following retry.
    pub initial_backoff: Duration,
}

impl ScoreSourceConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_millis(5000),
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
        }
    }
}
