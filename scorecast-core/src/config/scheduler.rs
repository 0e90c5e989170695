//! Scheduler configuration.

use std::time::Duration;

/// Timing and pool sizing for per-event recurring tasks.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Period between ticks of one event.
    pub interval: Duration,
    /// Worker threads dedicated to running ticks.
    pub pool_size: usize,
    /// How long shutdown waits for in-flight ticks before aborting them.
    pub shutdown_grace: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            pool_size: 10,
            shutdown_grace: Duration::from_secs(30),
        }
    }
}
