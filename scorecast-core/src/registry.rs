//! In-memory event registry.
//!
//! Backed by a sharded concurrent map: writes to the same identifier are
//! serialized by the shard lock, writes to different identifiers proceed
//! independently (modulo shard collisions). Entries are never evicted; the
//! registry lives for the process lifetime.

use crate::domain::{Event, EventId, EventStatus};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::HashMap;
use time::OffsetDateTime;

/// Result of an [`EventRegistry::upsert_status`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    /// The event after the update.
    pub event: Event,
    /// The status held immediately before the update, `None` if the event
    /// was not yet known.
    pub previous: Option<EventStatus>,
}

#[derive(Debug, Default)]
pub struct EventRegistry {
    events: DashMap<EventId, Event>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or update the event, refreshing `last_updated`.
    ///
    /// The read of the previous status and the write of the new one happen
    /// under the same entry lock, so two concurrent callers for the same
    /// identifier always observe a consistent order.
    pub fn upsert_status(&self, event_id: &str, status: EventStatus) -> StatusUpdate {
        let now = OffsetDateTime::now_utc();
        match self.events.entry(EventId::from(event_id)) {
            Entry::Occupied(mut entry) => {
                let event = entry.get_mut();
                let previous = event.status;
                event.status = status;
                event.last_updated = now;
                StatusUpdate {
                    event: event.clone(),
                    previous: Some(previous),
                }
            }
            Entry::Vacant(entry) => {
                let event = entry.insert(Event {
                    event_id: EventId::from(event_id),
                    status,
                    last_updated: now,
                });
                StatusUpdate {
                    event: event.clone(),
                    previous: None,
                }
            }
        }
    }

    pub fn get(&self, event_id: &str) -> Option<Event> {
        self.events.get(event_id).map(|entry| entry.value().clone())
    }

    /// Point-in-time copy of every known event.
    pub fn snapshot_all(&self) -> HashMap<EventId, Event> {
        self.events
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
