//! Scheduler configuration

use crate::clock::{Clock, SystemClock};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Configuration for a [`Scheduler`](crate::Scheduler)
///
/// Defaults:
/// - `clock`: [`SystemClock`]
/// - `horizon`: none (`run()` continues until no timers are left)
#[derive(Clone)]
pub struct SchedulerConfig {
    clock: Rc<dyn Clock>,
    horizon: Option<Duration>,
}

impl SchedulerConfig {
    pub fn new() -> Self {
        Self {
            clock: Rc::new(SystemClock),
            horizon: None,
        }
    }

    /// Use a different time source
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Rc::new(clock);
        self
    }

    /// Stop `run()` once it would advance more than `horizon` past the time
    /// it was called. Needed to drive self-rescheduling timers that never end.
    pub fn with_horizon(mut self, horizon: Duration) -> Self {
        self.horizon = Some(horizon);
        self
    }

    pub fn horizon(&self) -> Option<Duration> {
        self.horizon
    }

    pub(crate) fn clock(&self) -> Rc<dyn Clock> {
        Rc::clone(&self.clock)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SchedulerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerConfig")
            .field("horizon", &self.horizon)
            .finish_non_exhaustive()
    }
}
