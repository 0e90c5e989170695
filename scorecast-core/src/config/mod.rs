//! Runtime configuration types.
//!
//! These are the validated values the core components are built from. Loading
//! and parsing the on-disk file is the server crate's job.

mod scheduler;
mod score_source;
mod server;
mod stream;

pub use scheduler::SchedulerConfig;
pub use score_source::ScoreSourceConfig;
pub use server::ServerConfig;
pub use stream::StreamConfig;
