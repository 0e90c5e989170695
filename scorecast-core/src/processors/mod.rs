//! Event processors.
//!
//! - `FetchPublishPipeline`: one tick of work for one event (fetch, stamp, publish)
//! - `Scheduler`: one cancellable recurring task per live event, each running a `TickHandler`
//! - `EventLifecycle`: applies status changes to the registry and starts/stops scheduling

pub mod lifecycle;
pub mod pipeline;
pub mod scheduler;

pub use lifecycle::{
    EventLifecycle, GetEventStatus, LifecycleError, ListEvents, SetEventStatus, Transition,
};
pub use pipeline::{FetchPublishPipeline, TickError, TickHandler, TickOutcome};
pub use scheduler::{EventScheduler, ScheduleError, Scheduler};
