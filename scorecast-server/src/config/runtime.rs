//! Runtime configuration re-exports.
//!
//! The actual config types are defined in `scorecast-core::config`.

pub use scorecast_core::config::{SchedulerConfig, ScoreSourceConfig, ServerConfig, StreamConfig};
