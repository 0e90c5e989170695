//! Event lifecycle scheduler.
//!
//! Keeps at most one recurring task per event identifier. Each task is an
//! independent tokio task with its own interval and its own cancellation
//! token (a child of the scheduler's shutdown token), so a slow tick for one
//! event never delays scheduling or ticks of another.
//!
//! Cancellation is cooperative: a tick that is already running when its task
//! is cancelled runs to completion, no further tick starts after that.
//!
//! Ticks of one event never overlap: the task awaits each tick before waiting
//! for the next interval, and missed intervals are caught up in a burst
//! afterwards (fixed-rate semantics). Every tick also holds the event's gate,
//! so a replacement task waits for a retired task's in-flight tick before
//! its own first tick.
//!
//! Retired tasks stay tracked until they finish, and [`Scheduler::shutdown`]
//! waits for them along with the active ones.

use super::pipeline::TickHandler;
use crate::domain::EventId;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::FutureExt;
use futures_util::future::join_all;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tokio::task::{self, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Errors returned by [`EventScheduler::schedule`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("scheduler is shutting down")]
    ShuttingDown,
}

/// Start/stop control over per-event recurring tasks.
pub trait EventScheduler: Send + Sync {
    /// Ensure exactly one active task runs for `event_id`, replacing any
    /// existing one.
    fn schedule(&self, event_id: &str) -> Result<(), ScheduleError>;

    /// Cancel the task for `event_id`. Returns whether a task was registered.
    fn unschedule(&self, event_id: &str) -> bool;

    /// Whether a task is registered for `event_id` and neither cancelled nor finished.
    fn is_active(&self, event_id: &str) -> bool;

    /// Number of active tasks.
    fn active_count(&self) -> usize;
}

struct ScheduledTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    fn is_active(&self) -> bool {
        !self.token.is_cancelled() && !self.handle.is_finished()
    }
}

/// Tokio-backed [`EventScheduler`].
pub struct Scheduler {
    handler: Arc<dyn TickHandler>,
    interval: Duration,
    runtime: Handle,
    tasks: DashMap<EventId, ScheduledTask>,
    /// Cancelled tasks that may still be running their last tick.
    retired: DashMap<task::Id, JoinHandle<()>>,
    /// Per-event tick gate, shared by every task ever spawned for the event.
    gates: DashMap<EventId, Arc<Mutex<()>>>,
    shutdown: CancellationToken,
}

impl Scheduler {
    /// Create a scheduler that spawns tick tasks on `runtime`.
    pub fn new(handler: Arc<dyn TickHandler>, interval: Duration, runtime: Handle) -> Self {
        Self {
            handler,
            interval: interval.max(Duration::from_millis(1)),
            runtime,
            tasks: DashMap::new(),
            retired: DashMap::new(),
            gates: DashMap::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Create a scheduler that spawns tick tasks on the current runtime.
    ///
    /// Must be called from within a tokio runtime.
    pub fn on_current_runtime(handler: Arc<dyn TickHandler>, interval: Duration) -> Self {
        Self::new(handler, interval, Handle::current())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stop accepting new schedules, cancel every task, and wait up to
    /// `grace` for in-flight ticks. Tasks still running after that are aborted.
    pub async fn shutdown(&self, grace: Duration) {
        self.shutdown.cancel();

        let keys: Vec<EventId> = self.tasks.iter().map(|entry| entry.key().clone()).collect();
        let mut handles: Vec<JoinHandle<()>> = keys
            .iter()
            .filter_map(|key| self.tasks.remove(key))
            .map(|(_, task)| task.handle)
            .collect();

        let retired_ids: Vec<task::Id> = self.retired.iter().map(|entry| *entry.key()).collect();
        handles.extend(
            retired_ids
                .iter()
                .filter_map(|id| self.retired.remove(id))
                .map(|(_, handle)| handle),
        );

        info!(tasks = handles.len(), "Scheduler shutting down, waiting for in-flight ticks");

        let abort_handles: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();
        match tokio::time::timeout(grace, join_all(handles)).await {
            Ok(_) => info!("Scheduler shutdown complete"),
            Err(_) => {
                warn!(
                    grace_secs = grace.as_secs(),
                    "In-flight ticks did not finish within grace period, aborting"
                );
                for handle in abort_handles {
                    handle.abort();
                }
            }
        }
    }

    /// Keep a cancelled task's handle until it finishes.
    fn retire(&self, handle: JoinHandle<()>) {
        self.retired.retain(|_, pending| !pending.is_finished());
        if !handle.is_finished() {
            self.retired.insert(handle.id(), handle);
        }
    }

    /// Spawn the recurring task for one event.
    fn spawn_tick_loop(&self, event_id: EventId, token: CancellationToken) -> JoinHandle<()> {
        let handler = Arc::clone(&self.handler);
        let period = self.interval;
        let gate = Arc::clone(self.gates.entry(event_id.clone()).or_default().value());

        self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);

            loop {
                tokio::select! {
                    biased;

                    _ = token.cancelled() => break,

                    _ = ticker.tick() => {}
                }

                let _turn = tokio::select! {
                    biased;

                    _ = token.cancelled() => break,

                    turn = gate.lock() => turn,
                };

                debug!(%event_id, "Executing scheduled tick");
                let tick = AssertUnwindSafe(handler.tick(&event_id)).catch_unwind();
                if let Err(panic) = tick.await {
                    error!(
                        %event_id,
                        panic = panic_message(panic.as_ref()),
                        "Scheduled tick panicked"
                    );
                }
            }

            debug!(%event_id, "Tick loop stopped");
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}

impl EventScheduler for Scheduler {
    fn schedule(&self, event_id: &str) -> Result<(), ScheduleError> {
        if self.shutdown.is_cancelled() {
            return Err(ScheduleError::ShuttingDown);
        }

        // The entry guard serializes concurrent schedule/unschedule calls for
        // the same identifier; the old task is cancelled before the new one
        // is spawned.
        match self.tasks.entry(EventId::from(event_id)) {
            Entry::Occupied(mut entry) => {
                entry.get().token.cancel();
                let token = self.shutdown.child_token();
                let handle = self.spawn_tick_loop(entry.key().clone(), token.clone());
                let previous = entry.insert(ScheduledTask { token, handle });
                self.retire(previous.handle);
                info!(%event_id, "Replaced existing task for event");
            }
            Entry::Vacant(entry) => {
                let token = self.shutdown.child_token();
                let handle = self.spawn_tick_loop(entry.key().clone(), token.clone());
                entry.insert(ScheduledTask { token, handle });
            }
        }

        info!(
            %event_id,
            interval_secs = self.interval.as_secs_f64(),
            "Scheduled periodic updates for event"
        );
        Ok(())
    }

    fn unschedule(&self, event_id: &str) -> bool {
        match self.tasks.remove(event_id) {
            Some((_, task)) => {
                let was_active = task.is_active();
                task.token.cancel();
                self.retire(task.handle);
                info!(%event_id, cancelled = was_active, "Unscheduled periodic updates for event");
                true
            }
            None => {
                debug!(%event_id, "No scheduled task found for event");
                false
            }
        }
    }

    fn is_active(&self, event_id: &str) -> bool {
        self.tasks
            .get(event_id)
            .is_some_and(|task| task.is_active())
    }

    fn active_count(&self) -> usize {
        self.tasks.iter().filter(|task| task.is_active()).count()
    }
}
