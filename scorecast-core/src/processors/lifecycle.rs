//! Lifecycle coordinator.
//!
//! Applies status changes to the registry and derives scheduler calls from
//! the transition:
//!
//! | previous            | requested  | scheduler call |
//! |---------------------|------------|----------------|
//! | absent / `not_live` | `live`     | `schedule`     |
//! | `live`              | `not_live` | `unschedule`   |
//! | anything else       |            | none           |
//!
//! The decision uses the previous status returned by the registry write
//! itself, never a second read. The write and the scheduler call are two
//! separate steps: if the scheduler call fails the registry keeps the new
//! status and the error goes back to the caller.

use super::scheduler::{EventScheduler, ScheduleError, Scheduler};
use crate::domain::{Event, EventId, EventStatus};
use crate::registry::EventRegistry;
use kanau::processor::Processor;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("failed to start tracking event {event_id}: {source}")]
    Schedule {
        event_id: EventId,
        #[source]
        source: ScheduleError,
    },
}

/// Scheduler action implied by a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The event became live.
    Start,
    /// The event stopped being live.
    Stop,
    /// Same status as before (or a first-seen `not_live`): nothing to do.
    Refresh,
}

impl Transition {
    pub fn between(previous: Option<EventStatus>, requested: EventStatus) -> Self {
        match (previous, requested) {
            (Some(EventStatus::Live), EventStatus::Live) => Transition::Refresh,
            (_, EventStatus::Live) => Transition::Start,
            (Some(EventStatus::Live), EventStatus::NotLive) => Transition::Stop,
            (_, EventStatus::NotLive) => Transition::Refresh,
        }
    }
}

/// Request to move an event to a new status.
#[derive(Debug, Clone)]
pub struct SetEventStatus {
    pub event_id: EventId,
    pub status: EventStatus,
}

/// Request for the current state of one event.
#[derive(Debug, Clone)]
pub struct GetEventStatus {
    pub event_id: EventId,
}

/// Request for a point-in-time copy of every known event.
#[derive(Debug, Clone, Copy)]
pub struct ListEvents;

pub struct EventLifecycle<S = Scheduler> {
    registry: Arc<EventRegistry>,
    scheduler: Arc<S>,
}

impl<S> Clone for EventLifecycle<S> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            scheduler: Arc::clone(&self.scheduler),
        }
    }
}

impl<S: EventScheduler> EventLifecycle<S> {
    pub fn new(registry: Arc<EventRegistry>, scheduler: Arc<S>) -> Self {
        Self {
            registry,
            scheduler,
        }
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Record the new status and start or stop the event's recurring task
    /// if the status actually changed between live and not live.
    pub fn set_status(&self, event_id: &str, status: EventStatus) -> Result<Event, LifecycleError> {
        info!(%event_id, %status, "Updating event status");

        let update = self.registry.upsert_status(event_id, status);

        match Transition::between(update.previous, status) {
            Transition::Start => {
                info!(%event_id, "Event transitioning to live, starting periodic updates");
                self.scheduler
                    .schedule(event_id)
                    .map_err(|source| LifecycleError::Schedule {
                        event_id: EventId::from(event_id),
                        source,
                    })?;
            }
            Transition::Stop => {
                info!(%event_id, "Event transitioning to not live, stopping periodic updates");
                self.scheduler.unschedule(event_id);
            }
            Transition::Refresh => {}
        }

        Ok(update.event)
    }

    pub fn get_event(&self, event_id: &str) -> Option<Event> {
        self.registry.get(event_id)
    }

    pub fn all_events(&self) -> HashMap<EventId, Event> {
        self.registry.snapshot_all()
    }
}

impl<S: EventScheduler> Processor<SetEventStatus> for EventLifecycle<S> {
    type Output = Event;
    type Error = LifecycleError;

    async fn process(&self, request: SetEventStatus) -> Result<Event, LifecycleError> {
        self.set_status(&request.event_id, request.status)
    }
}

impl<S: EventScheduler> Processor<GetEventStatus> for EventLifecycle<S> {
    type Output = Option<Event>;
    type Error = Infallible;

    async fn process(&self, request: GetEventStatus) -> Result<Option<Event>, Infallible> {
        Ok(self.get_event(&request.event_id))
    }
}

impl<S: EventScheduler> Processor<ListEvents> for EventLifecycle<S> {
    type Output = Vec<Event>;
    type Error = Infallible;

    async fn process(&self, _request: ListEvents) -> Result<Vec<Event>, Infallible> {
        let mut events: Vec<Event> = self.all_events().into_values().collect();
        events.sort_by(|a, b| a.event_id.cmp(&b.event_id));
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Schedule(String),
        Unschedule(String),
    }

    #[derive(Default)]
    struct RecordingScheduler {
        calls: Mutex<Vec<Call>>,
        closed: AtomicBool,
    }

    impl RecordingScheduler {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl EventScheduler for RecordingScheduler {
        fn schedule(&self, event_id: &str) -> Result<(), ScheduleError> {
            if self.closed.load(Ordering::SeqCst) {
                return Err(ScheduleError::ShuttingDown);
            }
            self.calls
                .lock()
                .unwrap()
                .push(Call::Schedule(event_id.to_string()));
            Ok(())
        }

        fn unschedule(&self, event_id: &str) -> bool {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Unschedule(event_id.to_string()));
            true
        }

        fn is_active(&self, _event_id: &str) -> bool {
            false
        }

        fn active_count(&self) -> usize {
            0
        }
    }

    fn lifecycle() -> EventLifecycle<RecordingScheduler> {
        EventLifecycle::new(
            Arc::new(EventRegistry::new()),
            Arc::new(RecordingScheduler::default()),
        )
    }

    #[test]
    fn test_transition_table() {
        use EventStatus::*;
        assert_eq!(Transition::between(None, Live), Transition::Start);
        assert_eq!(Transition::between(Some(NotLive), Live), Transition::Start);
        assert_eq!(Transition::between(Some(Live), Live), Transition::Refresh);
        assert_eq!(Transition::between(Some(Live), NotLive), Transition::Stop);
        assert_eq!(Transition::between(Some(NotLive), NotLive), Transition::Refresh);
        assert_eq!(Transition::between(None, NotLive), Transition::Refresh);
    }

    #[test]
    fn test_scheduler_called_only_on_real_transitions() {
        let lifecycle = lifecycle();
        let sequence = [
            EventStatus::NotLive,
            EventStatus::Live,
            EventStatus::Live,
            EventStatus::NotLive,
            EventStatus::NotLive,
            EventStatus::Live,
        ];
        for status in sequence {
            lifecycle.set_status("e1", status).unwrap();
        }

        assert_eq!(
            lifecycle.scheduler().calls(),
            vec![
                Call::Schedule("e1".into()),
                Call::Unschedule("e1".into()),
                Call::Schedule("e1".into()),
            ]
        );
        assert_eq!(
            lifecycle.get_event("e1").map(|e| e.status),
            Some(EventStatus::Live)
        );
    }

    #[test]
    fn test_schedule_failure_propagates_but_status_is_kept() {
        let lifecycle = lifecycle();
        lifecycle.scheduler().closed.store(true, Ordering::SeqCst);

        let err = lifecycle.set_status("e1", EventStatus::Live).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Schedule {
                source: ScheduleError::ShuttingDown,
                ..
            }
        ));
        assert_eq!(
            lifecycle.get_event("e1").map(|e| e.status),
            Some(EventStatus::Live)
        );
    }

    #[tokio::test]
    async fn test_processor_requests() {
        let lifecycle = lifecycle();
        let event = lifecycle
            .process(SetEventStatus {
                event_id: "e2".into(),
                status: EventStatus::Live,
            })
            .await
            .unwrap();
        assert_eq!(event.event_id, "e2");

        lifecycle.set_status("e1", EventStatus::NotLive).unwrap();

        let found = lifecycle
            .process(GetEventStatus {
                event_id: "e2".into(),
            })
            .await
            .unwrap();
        assert_eq!(found, Some(event));

        let missing = lifecycle
            .process(GetEventStatus {
                event_id: "never-seen".into(),
            })
            .await
            .unwrap();
        assert_eq!(missing, None);

        let all = lifecycle.process(ListEvents).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, ["e1", "e2"]);
    }
}
