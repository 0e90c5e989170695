use compact_str::CompactString;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use time::OffsetDateTime;

/// Opaque, externally assigned event identifier.
pub type EventId = CompactString;

/// Whether an event is currently being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Live,
    NotLive,
}

impl EventStatus {
    /// Wire representation (`"live"` / `"not_live"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Live => "live",
            EventStatus::NotLive => "not_live",
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, EventStatus::Live)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid event status: {0}")]
pub struct StatusParseError(pub String);

impl FromStr for EventStatus {
    type Err = StatusParseError;

    /// Accepts the wire form or the upper-case variant name, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("live") {
            Ok(EventStatus::Live)
        } else if s.eq_ignore_ascii_case("not_live") {
            Ok(EventStatus::NotLive)
        } else {
            Err(StatusParseError(s.to_string()))
        }
    }
}

impl<'de> Deserialize<'de> for EventStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A tracked event as held by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_id: EventId,
    pub status: EventStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

impl Event {
    pub fn is_live(&self) -> bool {
        self.status.is_live()
    }
}
