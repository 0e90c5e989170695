//! Update publisher.
//!
//! Serializes a [`ScoreSnapshot`] to JSON and hands it to a [`MessageSink`]
//! keyed by event identifier, so every update of one event lands on the same
//! partition and keeps its publish order downstream. The caller waits for
//! the sink's acknowledgment, bounded by the publish timeout.

use crate::domain::ScoreSnapshot;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while publishing a score update.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The snapshot (or the sink's envelope) could not be serialized.
    #[error("payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No acknowledgment within the publish timeout.
    #[error("no delivery acknowledgment within {0:?}")]
    Timeout(Duration),

    /// HTTP transport error talking to the sink.
    #[error("stream request error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The sink refused the request as a whole.
    #[error("stream rejected publish with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The sink accepted the request but failed the record.
    #[error("record delivery failed (code {code}): {message}")]
    RecordFailed { code: i32, message: String },
}

/// Where a published record ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub partition: i32,
    pub offset: i64,
}

/// A keyed message stream.
///
/// `send` resolves once the stream has durably accepted the record.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, key: &str, payload: &str) -> Result<Delivery, PublishError>;
}

/// Publishes score snapshots to a [`MessageSink`].
#[derive(Clone)]
pub struct UpdatePublisher {
    sink: Arc<dyn MessageSink>,
    timeout: Duration,
}

impl UpdatePublisher {
    pub fn new(sink: Arc<dyn MessageSink>, timeout: Duration) -> Self {
        Self { sink, timeout }
    }

    /// Publish one snapshot and wait for its acknowledgment.
    pub async fn publish(&self, snapshot: &ScoreSnapshot) -> Result<Delivery, PublishError> {
        let event_id = snapshot.event_id.as_str();
        let payload = serde_json::to_string(snapshot)?;

        debug!(%event_id, "Publishing score update");

        let delivery = tokio::time::timeout(self.timeout, self.sink.send(event_id, &payload))
            .await
            .map_err(|_| PublishError::Timeout(self.timeout))??;

        info!(
            %event_id,
            partition = delivery.partition,
            offset = delivery.offset,
            "Published score update"
        );
        Ok(delivery)
    }
}
