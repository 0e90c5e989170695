//! Score fetcher.
//!
//! Reads the current score for one event from the external score API at
//! `{base_url}/events/{event_id}/score`. Each attempt is bounded by a
//! timeout; connection failures, timeouts and 5xx responses are retried with
//! exponential backoff, everything else is surfaced immediately.

use crate::config::ScoreSourceConfig;
use crate::domain::{EventId, ScoreSnapshot};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

/// Errors that can occur while fetching a score snapshot.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The attempt did not complete within the per-call timeout.
    #[error("score request timed out after {0:?}")]
    Timeout(Duration),

    /// Could not connect to the score source.
    #[error("connection to score source failed: {0}")]
    Connect(#[source] reqwest::Error),

    /// Any other transport-level failure (reset, truncated body, ...).
    #[error("score request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The score source answered with a 5xx status.
    #[error("score source returned server error {status}")]
    Server { status: u16 },

    /// The score source rejected the request (4xx and other non-success codes).
    #[error("score source rejected request with status {status}: {body}")]
    Client { status: u16, body: String },

    /// The response body could not be decoded into a snapshot.
    #[error("failed to decode score payload: {0}")]
    Decode(String),

    /// The event identifier could not be placed into the base URL.
    #[error("cannot build score URL from base {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Whether another attempt has a chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Timeout(_)
                | FetchError::Connect(_)
                | FetchError::Transport(_)
                | FetchError::Server { .. }
        )
    }

    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(timeout)
        } else if err.is_connect() {
            FetchError::Connect(err)
        } else if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Transport(err)
        }
    }
}

/// A source of score snapshots.
///
/// `Ok(None)` means the source has nothing to report for this event yet,
/// which is not an error.
#[async_trait]
pub trait ScoreSource: Send + Sync {
    async fn fetch(&self, event_id: &str) -> Result<Option<ScoreSnapshot>, FetchError>;
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-indexed): `initial_backoff * 2^retry`.
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.initial_backoff.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// [`ScoreSource`] backed by the external HTTP score API.
pub struct HttpScoreFetcher {
    http_client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    retry: RetryPolicy,
}

impl HttpScoreFetcher {
    pub fn new(config: &ScoreSourceConfig) -> Self {
        Self::with_client(
            reqwest::Client::builder()
                .connect_timeout(config.timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            config,
        )
    }

    pub fn with_client(http_client: reqwest::Client, config: &ScoreSourceConfig) -> Self {
        Self {
            http_client,
            base_url: config.base_url.clone(),
            timeout: config.timeout,
            retry: RetryPolicy {
                max_retries: config.max_retries,
                initial_backoff: config.initial_backoff,
            },
        }
    }

    /// Build `{base_url}/events/{event_id}/score`, encoding the identifier
    /// as a single path segment.
    fn score_url(&self, event_id: &str) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["events", event_id, "score"]);
        Ok(url)
    }

    /// One attempt, bounded by the per-call timeout.
    async fn fetch_once(&self, url: &Url) -> Result<Option<ScoreSnapshot>, FetchError> {
        let attempt = async {
            let response = self
                .http_client
                .get(url.clone())
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await
                .map_err(|e| FetchError::from_reqwest(e, self.timeout))?;

            let status = response.status();
            if status == StatusCode::NO_CONTENT {
                return Ok(None);
            }
            if status.is_server_error() {
                return Err(FetchError::Server {
                    status: status.as_u16(),
                });
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(FetchError::Client {
                    status: status.as_u16(),
                    body,
                });
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| FetchError::from_reqwest(e, self.timeout))?;
            parse_snapshot(&body)
        };

        tokio::time::timeout(self.timeout, attempt)
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))?
    }
}

/// Decode a score payload; an empty body or JSON `null` means no snapshot.
fn parse_snapshot(body: &[u8]) -> Result<Option<ScoreSnapshot>, FetchError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))
}

#[async_trait]
impl ScoreSource for HttpScoreFetcher {
    async fn fetch(&self, event_id: &str) -> Result<Option<ScoreSnapshot>, FetchError> {
        let url = self.score_url(event_id)?;
        let mut retry = 0u32;

        loop {
            debug!(%event_id, %url, "Calling score source");
            match self.fetch_once(&url).await {
                Ok(snapshot) => {
                    return Ok(snapshot.map(|mut snapshot| {
                        if snapshot.event_id.is_empty() {
                            snapshot.event_id = EventId::from(event_id);
                        }
                        snapshot
                    }));
                }
                Err(e) if e.is_retryable() && retry < self.retry.max_retries => {
                    let delay = self.retry.delay(retry);
                    retry += 1;
                    warn!(
                        %event_id,
                        attempt = retry,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying score fetch"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(%event_id, retries = retry, error = %e, "Score fetch failed");
                    return Err(e);
                }
            }
        }
    }
}
