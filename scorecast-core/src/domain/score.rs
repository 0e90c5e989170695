use super::event::EventId;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One observed score for one event.
///
/// `timestamp` is set at most once: either by the score source, or by the
/// pipeline right before publishing when the source left it out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSnapshot {
    #[serde(default)]
    pub event_id: EventId,
    pub current_score: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub timestamp: Option<OffsetDateTime>,
}

impl ScoreSnapshot {
    pub fn new(event_id: impl Into<EventId>, current_score: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            current_score: current_score.into(),
            timestamp: None,
        }
    }

    /// Stamp the capture time if the source did not provide one.
    ///
    /// Returns `true` if the timestamp was set by this call.
    pub fn stamp_if_absent(&mut self, now: OffsetDateTime) -> bool {
        if self.timestamp.is_some() {
            return false;
        }
        self.timestamp = Some(now);
        true
    }
}
