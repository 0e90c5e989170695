//! Downstream stream configuration.

use std::time::Duration;
use url::Url;

/// Target of score update publishing.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Base URL of the REST proxy in front of the stream.
    pub rest_url: Url,
    /// Topic score updates are written to.
    pub topic: String,
    /// Upper bound on waiting for a delivery acknowledgment.
    pub publish_timeout: Duration,
}

impl StreamConfig {
    pub fn new(rest_url: Url, topic: impl Into<String>) -> Self {
        Self {
            rest_url,
            topic: topic.into(),
            publish_timeout: Duration::from_millis(5000),
        }
    }
}
