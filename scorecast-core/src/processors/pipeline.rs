//! Fetch-publish pipeline.
//!
//! A tick is: fetch a snapshot for the event, stamp it with the capture time
//! if the source did not, publish it. Every failure is terminal to the tick
//! only: it is logged with the event identifier and swallowed, and the next
//! scheduled tick starts from scratch. Publishing is never retried within a
//! tick.

use crate::domain::ScoreSnapshot;
use crate::integration::{Delivery, FetchError, PublishError, ScoreSource, UpdatePublisher};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

/// The unit of work a scheduled task runs on every tick.
///
/// Implementations must not let failures escape: `tick` has no error channel
/// and the scheduler keeps calling it until the event is unscheduled.
#[async_trait]
pub trait TickHandler: Send + Sync {
    async fn tick(&self, event_id: &str);
}

/// Errors that end a tick early.
#[derive(Debug, Error)]
pub enum TickError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("publish failed: {0}")]
    Publish(#[from] PublishError),
}

/// What a completed tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A snapshot was published and acknowledged.
    Published {
        snapshot: ScoreSnapshot,
        delivery: Delivery,
    },
    /// The source had nothing to report.
    NoData,
}

pub struct FetchPublishPipeline {
    source: Arc<dyn ScoreSource>,
    publisher: UpdatePublisher,
}

impl FetchPublishPipeline {
    pub fn new(source: Arc<dyn ScoreSource>, publisher: UpdatePublisher) -> Self {
        Self { source, publisher }
    }

    /// Run one tick and report its outcome.
    pub async fn execute(&self, event_id: &str) -> Result<TickOutcome, TickError> {
        debug!(%event_id, "Fetching score");

        let Some(mut snapshot) = self.source.fetch(event_id).await? else {
            return Ok(TickOutcome::NoData);
        };

        if snapshot.stamp_if_absent(OffsetDateTime::now_utc()) {
            debug!(%event_id, "Stamped snapshot with capture time");
        }

        info!(%event_id, score = %snapshot.current_score, "Fetched score");

        let delivery = self.publisher.publish(&snapshot).await?;
        Ok(TickOutcome::Published { snapshot, delivery })
    }

    /// Run one tick, logging and swallowing any failure.
    pub async fn run(&self, event_id: &str) {
        match self.execute(event_id).await {
            Ok(TickOutcome::Published { .. }) => {}
            Ok(TickOutcome::NoData) => {
                warn!(%event_id, "No data received from score source");
            }
            Err(TickError::Fetch(e)) => {
                error!(%event_id, error = %e, "Tick aborted: could not fetch score");
            }
            Err(TickError::Publish(e)) => {
                error!(%event_id, error = %e, "Tick aborted: could not publish score update");
            }
        }
    }
}

#[async_trait]
impl TickHandler for FetchPublishPipeline {
    async fn tick(&self, event_id: &str) {
        self.run(event_id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::MessageSink;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use time::macros::datetime;

    enum Reply {
        Snapshot(ScoreSnapshot),
        Empty,
        NotFound,
    }

    struct FixedSource(Reply);

    #[async_trait]
    impl ScoreSource for FixedSource {
        async fn fetch(&self, _event_id: &str) -> Result<Option<ScoreSnapshot>, FetchError> {
            match &self.0 {
                Reply::Snapshot(s) => Ok(Some(s.clone())),
                Reply::Empty => Ok(None),
                Reply::NotFound => Err(FetchError::Client {
                    status: 404,
                    body: "not found".into(),
                }),
            }
        }
    }

    #[derive(Default)]
    struct CountingSink {
        sent: AtomicUsize,
        fail: bool,
        last: Mutex<Option<String>>,
    }

    #[async_trait]
    impl MessageSink for CountingSink {
        async fn send(&self, _key: &str, payload: &str) -> Result<Delivery, PublishError> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(payload.to_string());
            if self.fail {
                return Err(PublishError::Rejected {
                    status: 503,
                    body: String::new(),
                });
            }
            Ok(Delivery {
                partition: 0,
                offset: 0,
            })
        }
    }

    fn pipeline(reply: Reply, sink: Arc<CountingSink>) -> FetchPublishPipeline {
        FetchPublishPipeline::new(
            Arc::new(FixedSource(reply)),
            UpdatePublisher::new(sink, Duration::from_secs(5)),
        )
    }

    #[tokio::test]
    async fn test_unstamped_snapshot_gets_capture_time() {
        let sink = Arc::new(CountingSink::default());
        let before = OffsetDateTime::now_utc();
        let outcome = pipeline(Reply::Snapshot(ScoreSnapshot::new("e1", "2:1")), sink.clone())
            .execute("e1")
            .await
            .unwrap();
        let after = OffsetDateTime::now_utc();

        let TickOutcome::Published { snapshot, .. } = outcome else {
            panic!("expected a publish");
        };
        let ts = snapshot.timestamp.unwrap();
        assert!(before <= ts && ts <= after);
        assert_eq!(sink.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_source_timestamp_is_published_unchanged() {
        let source_ts = datetime!(2025-12-17 10:30:00 UTC);
        let sink = Arc::new(CountingSink::default());
        let snapshot = ScoreSnapshot {
            timestamp: Some(source_ts),
            ..ScoreSnapshot::new("e1", "1:0")
        };
        pipeline(Reply::Snapshot(snapshot), sink.clone())
            .execute("e1")
            .await
            .unwrap();

        let payload = sink.last.lock().unwrap().clone().unwrap();
        let published: ScoreSnapshot = serde_json::from_str(&payload).unwrap();
        assert_eq!(published.timestamp, Some(source_ts));
    }

    #[tokio::test]
    async fn test_empty_fetch_skips_publish() {
        let sink = Arc::new(CountingSink::default());
        let outcome = pipeline(Reply::Empty, sink.clone()).execute("e1").await.unwrap();
        assert_eq!(outcome, TickOutcome::NoData);
        assert_eq!(sink.sent.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_publish() {
        let sink = Arc::new(CountingSink::default());
        let pipeline = pipeline(Reply::NotFound, sink.clone());
        assert!(matches!(
            pipeline.execute("e1").await,
            Err(TickError::Fetch(FetchError::Client { status: 404, .. }))
        ));
        pipeline.run("e1").await;
        assert_eq!(sink.sent.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_publish_failure_is_not_retried() {
        let sink = Arc::new(CountingSink {
            fail: true,
            ..Default::default()
        });
        let pipeline = pipeline(Reply::Snapshot(ScoreSnapshot::new("e1", "0:0")), sink.clone());
        assert!(matches!(
            pipeline.execute("e1").await,
            Err(TickError::Publish(_))
        ));
        pipeline.run("e1").await;
        assert_eq!(sink.sent.load(Ordering::SeqCst), 2);
    }
}
