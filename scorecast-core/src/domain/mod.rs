//! Domain types for live event tracking.
//!
//! An [`Event`] is owned by the registry and only ever referenced elsewhere
//! by its identifier. A [`ScoreSnapshot`] is a value object that lives for a
//! single tick: built by the fetcher, stamped by the pipeline, consumed by
//! the publisher.

pub mod event;
pub mod score;

pub use event::{Event, EventId, EventStatus, StatusParseError};
pub use score::ScoreSnapshot;
