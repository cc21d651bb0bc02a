//! Timer scheduler
//!
//! A single-threaded timer queue standing in for a host event loop. Timers
//! are one-shot callbacks keyed by [`TimerId`]; they fire in deadline order,
//! and timers sharing a deadline fire in the order they were scheduled.
//!
//! Nothing fires on its own. The owner drives the queue:
//! - [`Scheduler::run_due`] fires whatever is due at the clock's current time
//! - [`Scheduler::run_for`] / [`Scheduler::run_until`] sleep the clock from
//!   deadline to deadline up to a target time
//! - [`Scheduler::run`] keeps going until the queue is empty (or the
//!   configured horizon is reached)
//!
//! ```rust
//! use brook_time::{ManualClock, Scheduler};
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! let clock = ManualClock::new();
//! let scheduler = Scheduler::with_clock(clock.clone());
//!
//! let fired = Rc::new(Cell::new(false));
//! let flag = fired.clone();
//! scheduler.set_timeout(Duration::from_millis(10), move || flag.set(true));
//!
//! scheduler.run_for(Duration::from_millis(9));
//! assert!(!fired.get());
//! scheduler.run_for(Duration::from_millis(1));
//! assert!(fired.get());
//! ```
//!
//! Callbacks run with no borrow of the scheduler held, so they may schedule
//! or cancel timers themselves.

use crate::clock::Clock;
use crate::config::SchedulerConfig;
use slotmap::{new_key_type, SlotMap};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

new_key_type! {
    /// Handle to a scheduled timer
    pub struct TimerId;
}

type TimerCallback = Box<dyn FnOnce()>;

struct TimerEntry {
    callback: TimerCallback,
}

/// Heap entry. Cancelled timers leave their entry behind; it is skipped when
/// it reaches the top.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct QueuedTimer {
    deadline: Instant,
    seq: u64,
    id: TimerId,
}

// Reversed so the max-heap pops the earliest deadline, then the lowest seq
impl Ord for QueuedTimer {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedTimer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct TimerQueue {
    timers: SlotMap<TimerId, TimerEntry>,
    heap: BinaryHeap<QueuedTimer>,
    next_seq: u64,
}

impl TimerQueue {
    fn new() -> Self {
        Self {
            timers: SlotMap::with_key(),
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    fn push(&mut self, deadline: Instant, callback: TimerCallback) -> TimerId {
        let id = self.timers.insert(TimerEntry { callback });
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(QueuedTimer { deadline, seq, id });
        id
    }

    /// Drop cancelled entries from the top of the heap
    fn prune(&mut self) {
        while let Some(head) = self.heap.peek() {
            if self.timers.contains_key(head.id) {
                break;
            }
            self.heap.pop();
        }
    }

    fn next_deadline(&mut self) -> Option<Instant> {
        self.prune();
        self.heap.peek().map(|head| head.deadline)
    }

    fn pop_due(&mut self, now: Instant) -> Option<TimerCallback> {
        loop {
            let head = *self.heap.peek()?;
            if head.deadline > now {
                return None;
            }
            self.heap.pop();
            if let Some(entry) = self.timers.remove(head.id) {
                return Some(entry.callback);
            }
        }
    }
}

struct Shared {
    clock: Rc<dyn Clock>,
    horizon: Option<Duration>,
    queue: RefCell<TimerQueue>,
}

impl Shared {
    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> TimerId {
        let deadline = self.clock.now() + delay;
        let id = self.queue.borrow_mut().push(deadline, callback);
        tracing::trace!(?id, ?delay, "timer scheduled");
        id
    }

    fn clear_timeout(&self, id: TimerId) -> bool {
        let removed = self.queue.borrow_mut().timers.remove(id).is_some();
        if removed {
            tracing::trace!(?id, "timer cancelled");
        }
        removed
    }
}

/// Owner of a timer queue (cheap to clone; clones share the queue)
#[derive(Clone)]
pub struct Scheduler {
    shared: Rc<Shared>,
}

impl Scheduler {
    /// Create a scheduler on the system clock
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    /// Create a scheduler on a specific clock
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self::with_config(SchedulerConfig::new().with_clock(clock))
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            shared: Rc::new(Shared {
                clock: config.clock(),
                horizon: config.horizon(),
                queue: RefCell::new(TimerQueue::new()),
            }),
        }
    }

    /// Get a weak handle for use inside timer callbacks and stream updaters
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            shared: Rc::downgrade(&self.shared),
        }
    }

    /// Current time on this scheduler's clock
    pub fn now(&self) -> Instant {
        self.shared.clock.now()
    }

    /// Run `callback` once, `delay` from now
    pub fn set_timeout(&self, delay: Duration, callback: impl FnOnce() + 'static) -> TimerId {
        self.shared.set_timeout(delay, Box::new(callback))
    }

    /// Cancel a pending timer. Returns false if it already fired or was
    /// cancelled.
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        self.shared.clear_timeout(id)
    }

    /// Number of timers still waiting to fire
    pub fn pending(&self) -> usize {
        self.shared.queue.borrow().timers.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Deadline of the next timer to fire
    pub fn next_deadline(&self) -> Option<Instant> {
        self.shared.queue.borrow_mut().next_deadline()
    }

    /// Fire every timer due at the current time
    ///
    /// Timers scheduled by those callbacks fire in the same pass if they are
    /// already due. Returns the number of callbacks run.
    pub fn run_due(&self) -> usize {
        let now = self.now();
        let mut fired = 0;
        loop {
            let callback = self.shared.queue.borrow_mut().pop_due(now);
            match callback {
                Some(callback) => {
                    callback();
                    fired += 1;
                }
                None => break,
            }
        }
        fired
    }

    /// Advance the clock to `target`, firing timers in order on the way
    ///
    /// The clock stops at each deadline so callbacks observe the time they
    /// were scheduled for (exactly, on a [`ManualClock`](crate::ManualClock)).
    pub fn run_until(&self, target: Instant) -> usize {
        let mut fired = 0;
        while let Some(deadline) = self.next_deadline() {
            if deadline > target {
                break;
            }
            self.shared.clock.sleep_until(deadline);
            fired += self.run_due();
        }
        self.shared.clock.sleep_until(target);
        fired
    }

    /// Advance the clock by `duration`, firing timers in order on the way
    pub fn run_for(&self, duration: Duration) -> usize {
        self.run_until(self.now() + duration)
    }

    /// Fire timers until none are left
    ///
    /// With a horizon configured, stops once the next deadline lies beyond
    /// `horizon` from the time of the call and leaves the clock at the
    /// horizon.
    pub fn run(&self) -> usize {
        let limit = self.shared.horizon.map(|horizon| self.now() + horizon);
        let mut fired = 0;
        while let Some(deadline) = self.next_deadline() {
            if let Some(limit) = limit {
                if deadline > limit {
                    tracing::debug!(pending = self.pending(), "scheduler reached its horizon");
                    self.shared.clock.sleep_until(limit);
                    break;
                }
            }
            self.shared.clock.sleep_until(deadline);
            fired += self.run_due();
        }
        fired
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.pending())
            .field("horizon", &self.shared.horizon)
            .finish()
    }
}

/// Weak handle to a [`Scheduler`]
///
/// Timer callbacks live inside the scheduler, so callbacks that need to
/// schedule again hold this instead of a `Scheduler`. Every operation is a
/// no-op once the scheduler has been dropped.
#[derive(Clone)]
pub struct SchedulerHandle {
    shared: Weak<Shared>,
}

impl SchedulerHandle {
    /// Schedule a timer; None if the scheduler is gone
    pub fn set_timeout(
        &self,
        delay: Duration,
        callback: impl FnOnce() + 'static,
    ) -> Option<TimerId> {
        self.shared
            .upgrade()
            .map(|shared| shared.set_timeout(delay, Box::new(callback)))
    }

    /// Cancel a timer; false if it is not pending or the scheduler is gone
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        self.shared
            .upgrade()
            .is_some_and(|shared| shared.clear_timeout(id))
    }

    /// Current time on the scheduler's clock
    pub fn now(&self) -> Option<Instant> {
        self.shared.upgrade().map(|shared| shared.clock.now())
    }

    pub fn is_alive(&self) -> bool {
        self.shared.strong_count() > 0
    }
}

impl fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}
