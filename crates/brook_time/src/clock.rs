//! Time sources for the scheduler
//!
//! [`SystemClock`] reads the wall clock and really sleeps. [`ManualClock`]
//! holds virtual time that only moves when told to, which makes timer-driven
//! streams deterministic under test.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

/// A monotonic time source
pub trait Clock {
    /// Current time
    fn now(&self) -> Instant;

    /// Block (or jump) until `deadline`. Deadlines in the past return
    /// immediately.
    fn sleep_until(&self, deadline: Instant);
}

/// The real monotonic clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep_until(&self, deadline: Instant) {
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        }
    }
}

/// Virtual time that advances only on request
///
/// Clones share the same time, so a test can keep one handle while the
/// scheduler owns another.
#[derive(Clone)]
pub struct ManualClock {
    start: Instant,
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        let start = Instant::now();
        Self {
            start,
            now: Rc::new(Cell::new(start)),
        }
    }

    /// Move time forward by `by`
    ///
    /// Timers that become due are not fired; call
    /// [`Scheduler::run_due`](crate::Scheduler::run_due) or drive the
    /// scheduler with `run_for` instead.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    /// Virtual time elapsed since the clock was created
    pub fn elapsed(&self) -> Duration {
        self.now.get() - self.start
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }

    fn sleep_until(&self, deadline: Instant) {
        if deadline > self.now.get() {
            self.now.set(deadline);
        }
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualClock")
            .field("elapsed", &self.elapsed())
            .finish()
    }
}
