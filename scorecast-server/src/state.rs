//! Application state shared across all request handlers.

use scorecast_core::processors::EventLifecycle;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Status changes and status reads go through the lifecycle coordinator.
    pub lifecycle: EventLifecycle,
}

impl AppState {
    pub fn new(lifecycle: EventLifecycle) -> Self {
        Self { lifecycle }
    }
}
