//! End-to-end tests: status changes drive real scheduled ticks through the
//! fetch-publish pipeline, with in-memory fakes at the external seams.

use async_trait::async_trait;
use scorecast_core::domain::{EventStatus, ScoreSnapshot};
use scorecast_core::integration::{
    Delivery, FetchError, MessageSink, PublishError, ScoreSource, UpdatePublisher,
};
use scorecast_core::processors::{
    EventLifecycle, EventScheduler, FetchPublishPipeline, ScheduleError, Scheduler,
};
use scorecast_core::registry::EventRegistry;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use time::OffsetDateTime;

const PERIOD: Duration = Duration::from_secs(10);

/// Score source returning a fixed score, or a permanent failure.
struct StubSource {
    calls: AtomicUsize,
    fail: bool,
    latency: Duration,
}

impl StubSource {
    fn new(fail: bool, latency: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail,
            latency,
        }
    }
}

#[async_trait]
impl ScoreSource for StubSource {
    async fn fetch(&self, event_id: &str) -> Result<Option<ScoreSnapshot>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.fail {
            return Err(FetchError::Client {
                status: 404,
                body: "unknown event".into(),
            });
        }
        Ok(Some(ScoreSnapshot::new(event_id, "2:1")))
    }
}

#[derive(Default)]
struct RecordingSink {
    records: Mutex<Vec<(String, serde_json::Value)>>,
}

impl RecordingSink {
    fn records(&self) -> Vec<(String, serde_json::Value)> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send(&self, key: &str, payload: &str) -> Result<Delivery, PublishError> {
        let value = serde_json::from_str(payload)?;
        let mut records = self.records.lock().unwrap();
        records.push((key.to_string(), value));
        Ok(Delivery {
            partition: 0,
            offset: records.len() as i64,
        })
    }
}

/// Real scheduler that also records which calls reached it.
struct TracingScheduler {
    inner: Scheduler,
    calls: Mutex<Vec<String>>,
}

impl EventScheduler for TracingScheduler {
    fn schedule(&self, event_id: &str) -> Result<(), ScheduleError> {
        self.calls.lock().unwrap().push(format!("schedule:{event_id}"));
        self.inner.schedule(event_id)
    }

    fn unschedule(&self, event_id: &str) -> bool {
        self.calls.lock().unwrap().push(format!("unschedule:{event_id}"));
        self.inner.unschedule(event_id)
    }

    fn is_active(&self, event_id: &str) -> bool {
        self.inner.is_active(event_id)
    }

    fn active_count(&self) -> usize {
        self.inner.active_count()
    }
}

struct Harness {
    lifecycle: EventLifecycle<TracingScheduler>,
    source: Arc<StubSource>,
    sink: Arc<RecordingSink>,
}

impl Harness {
    fn new(fail_fetch: bool) -> Self {
        Self::build(StubSource::new(fail_fetch, Duration::ZERO))
    }

    fn with_fetch_latency(latency: Duration) -> Self {
        Self::build(StubSource::new(false, latency))
    }

    fn build(source: StubSource) -> Self {
        let source = Arc::new(source);
        let sink = Arc::new(RecordingSink::default());
        let pipeline = FetchPublishPipeline::new(
            source.clone(),
            UpdatePublisher::new(sink.clone(), Duration::from_secs(5)),
        );
        let scheduler = TracingScheduler {
            inner: Scheduler::on_current_runtime(Arc::new(pipeline), PERIOD),
            calls: Mutex::new(Vec::new()),
        };
        Self {
            lifecycle: EventLifecycle::new(Arc::new(EventRegistry::new()), Arc::new(scheduler)),
            source,
            sink,
        }
    }

    fn scheduler_calls(&self) -> Vec<String> {
        self.lifecycle.scheduler().calls.lock().unwrap().clone()
    }
}

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn live_event_publishes_stamped_score_keyed_by_event() {
    let harness = Harness::new(false);
    let before = OffsetDateTime::now_utc();

    harness.lifecycle.set_status("e1", EventStatus::Live).unwrap();
    settle().await;

    let records = harness.sink.records();
    assert_eq!(records.len(), 1);
    let (key, payload) = &records[0];
    assert_eq!(key, "e1");
    assert_eq!(payload["eventId"], "e1");
    assert_eq!(payload["currentScore"], "2:1");

    let ts = payload["timestamp"].as_str().expect("timestamp should be set");
    let ts = OffsetDateTime::parse(ts, &time::format_description::well_known::Rfc3339).unwrap();
    assert!(ts >= before - Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn live_then_not_live_schedules_once_and_stops_ticking() {
    let harness = Harness::new(false);

    harness.lifecycle.set_status("e1", EventStatus::Live).unwrap();
    settle().await;
    harness.lifecycle.set_status("e1", EventStatus::NotLive).unwrap();
    let published = harness.sink.records().len();

    tokio::time::sleep(PERIOD * 5).await;
    settle().await;

    assert_eq!(harness.scheduler_calls(), ["schedule:e1", "unschedule:e1"]);
    assert_eq!(harness.sink.records().len(), published);
    assert!(!harness.lifecycle.scheduler().is_active("e1"));
}

#[tokio::test(start_paused = true)]
async fn repeated_live_schedules_once() {
    let harness = Harness::new(false);

    harness.lifecycle.set_status("e1", EventStatus::Live).unwrap();
    harness.lifecycle.set_status("e1", EventStatus::Live).unwrap();
    settle().await;

    assert_eq!(harness.scheduler_calls(), ["schedule:e1"]);
    assert_eq!(harness.lifecycle.scheduler().active_count(), 1);
    assert_eq!(harness.sink.records().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_fetch_keeps_event_scheduled() {
    let harness = Harness::new(true);

    harness.lifecycle.set_status("e1", EventStatus::Live).unwrap();
    settle().await;
    assert_eq!(harness.source.calls.load(Ordering::SeqCst), 1);

    tokio::time::sleep(PERIOD).await;
    settle().await;

    assert_eq!(harness.source.calls.load(Ordering::SeqCst), 2);
    assert!(harness.sink.records().is_empty());
    assert!(harness.lifecycle.scheduler().is_active("e1"));
}

#[tokio::test(start_paused = true)]
async fn ticks_recur_at_fixed_period() {
    let harness = Harness::new(false);

    harness.lifecycle.set_status("e1", EventStatus::Live).unwrap();
    settle().await;
    tokio::time::sleep(PERIOD * 3).await;
    settle().await;

    assert_eq!(harness.sink.records().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn unknown_event_is_absent() {
    let harness = Harness::new(false);
    assert!(harness.lifecycle.get_event("never-seen").is_none());

    harness.lifecycle.set_status("e1", EventStatus::NotLive).unwrap();
    assert!(harness.lifecycle.get_event("never-seen").is_none());
    assert!(harness.scheduler_calls().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_status_changes_keep_one_task_per_event() {
    let harness = Arc::new(Harness::new(false));

    let mut handles = Vec::new();
    for worker in 0..8 {
        let harness = Arc::clone(&harness);
        handles.push(tokio::spawn(async move {
            for round in 0..50 {
                let event_id = format!("e{}", (worker + round) % 10);
                harness.lifecycle.set_status(&event_id, EventStatus::Live).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let scheduler = harness.lifecycle.scheduler();
    assert_eq!(scheduler.active_count(), 10);
    let schedules = harness
        .scheduler_calls()
        .iter()
        .filter(|c| c.starts_with("schedule:"))
        .count();
    assert_eq!(schedules, 10);

    for i in 0..10 {
        harness
            .lifecycle
            .set_status(&format!("e{i}"), EventStatus::NotLive)
            .unwrap();
    }
    assert_eq!(scheduler.active_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn not_live_mid_tick_still_publishes_that_tick() {
    let latency = Duration::from_secs(3);
    let harness = Harness::with_fetch_latency(latency);

    harness.lifecycle.set_status("e1", EventStatus::Live).unwrap();
    settle().await;
    assert_eq!(harness.source.calls.load(Ordering::SeqCst), 1);
    assert!(harness.sink.records().is_empty());

    harness.lifecycle.set_status("e1", EventStatus::NotLive).unwrap();
    tokio::time::sleep(latency + Duration::from_secs(1)).await;
    settle().await;
    assert_eq!(harness.sink.records().len(), 1);

    tokio::time::sleep(PERIOD * 3).await;
    settle().await;
    assert_eq!(harness.source.calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.sink.records().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn relive_mid_tick_does_not_overlap_fetches() {
    let latency = Duration::from_secs(3);
    let harness = Harness::with_fetch_latency(latency);

    harness.lifecycle.set_status("e1", EventStatus::Live).unwrap();
    settle().await;
    harness.lifecycle.set_status("e1", EventStatus::NotLive).unwrap();
    harness.lifecycle.set_status("e1", EventStatus::Live).unwrap();
    settle().await;
    assert_eq!(harness.source.calls.load(Ordering::SeqCst), 1);

    tokio::time::sleep(latency + Duration::from_secs(1)).await;
    settle().await;
    assert_eq!(harness.sink.records().len(), 1);
    assert_eq!(harness.source.calls.load(Ordering::SeqCst), 2);

    tokio::time::sleep(latency).await;
    settle().await;
    assert_eq!(harness.sink.records().len(), 2);
    assert_eq!(
        harness.scheduler_calls(),
        ["schedule:e1", "unschedule:e1", "schedule:e1"]
    );
}
