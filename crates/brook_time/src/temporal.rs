//! Time-shaping stream operators
//!
//! Every operator takes the [`Scheduler`] whose timers it uses. Operators
//! keep only a weak [`SchedulerHandle`]: once the scheduler is dropped they
//! stop scheduling and go quiet.
//!
//! Per-instance timer state (the pending timer and latest value of
//! `throttle`, `debounce` and `after_silence`, the tick target of `every`)
//! lives in a private struct shared by that operator's updater and its timer
//! callbacks.

use crate::scheduler::{Scheduler, SchedulerHandle, TimerId};
use brook_core::{Result, Stream, StreamError};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// When an [`every`] timer stops
pub enum Until {
    /// Tick forever
    Never,
    /// Stop at the first tick that lands more than this long after the start
    Elapsed(Duration),
    /// Stop at the first tick after the predicate turns true
    Condition(Box<dyn Fn() -> bool>),
}

impl Until {
    /// Stop once `stream` has a value
    pub fn stream<T: Clone + 'static>(stream: &Stream<T>) -> Self {
        let stream = stream.clone();
        Until::Condition(Box::new(move || stream.has_value()))
    }

    fn is_reached(&self, start: Instant, now: Instant) -> bool {
        match self {
            Until::Never => false,
            Until::Elapsed(limit) => now.saturating_duration_since(start) > *limit,
            Until::Condition(done) => done(),
        }
    }
}

impl fmt::Debug for Until {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Until::Never => f.write_str("Never"),
            Until::Elapsed(limit) => f.debug_tuple("Elapsed").field(limit).finish(),
            Until::Condition(_) => f.write_str("Condition(..)"),
        }
    }
}

/// Self-rescheduling state behind [`every`]
struct Ticker {
    scheduler: SchedulerHandle,
    interval: Duration,
    until: Until,
    start: Instant,
    target: Cell<Instant>,
    out: Stream<Instant>,
}

impl Ticker {
    fn tick(self: Rc<Self>) {
        let Some(now) = self.scheduler.now() else {
            return;
        };
        if self.until.is_reached(self.start, now) {
            tracing::debug!(interval = ?self.interval, until = ?self.until, "every: stopped");
            return;
        }

        self.out.set(now);

        // Schedule against the ideal target, not `now`, so lateness does not
        // accumulate from tick to tick
        let target = self.target.get() + self.interval;
        self.target.set(target);
        let wait = target.saturating_duration_since(now);
        let scheduler = self.scheduler.clone();
        scheduler.set_timeout(wait, move || self.tick());
    }
}

/// Emit the current time every `interval` until `until` is reached
///
/// The first tick happens immediately, during this call. Once stopped, the
/// timer never restarts. Fails if `interval` is zero.
pub fn every(scheduler: &Scheduler, interval: Duration, until: Until) -> Result<Stream<Instant>> {
    if interval.is_zero() {
        return Err(StreamError::invalid_argument(
            "interval",
            "every() needs a non-zero interval",
        ));
    }

    let start = scheduler.now();
    let out = Stream::new();
    let ticker = Rc::new(Ticker {
        scheduler: scheduler.handle(),
        interval,
        until,
        start,
        target: Cell::new(start),
        out: out.clone(),
    });
    ticker.tick();
    Ok(out)
}

/// Re-emit every value of `source` after `wait`
///
/// Order is preserved: every value waits the same amount of time.
pub fn delay<T: Clone + 'static>(
    scheduler: &Scheduler,
    wait: Duration,
    source: &Stream<T>,
) -> Stream<T> {
    let result = Stream::new();
    let out = result.clone();
    let scheduler = scheduler.handle();
    source.subscribe(move |value: &T| {
        let out = out.clone();
        let value = value.clone();
        scheduler.set_timeout(wait, move || {
            out.set(value);
        });
    });
    result
}

/// Pending timer and the value it will emit, shared by an operator and its
/// timer callback
///
/// Holding the value rather than the source keeps a pending emission alive
/// after every other handle to the source is gone.
struct Pending<T> {
    id: Cell<Option<TimerId>>,
    latest: RefCell<Option<T>>,
}

impl<T: Clone + 'static> Pending<T> {
    fn new() -> Rc<Self> {
        Rc::new(Self {
            id: Cell::new(None),
            latest: RefCell::new(None),
        })
    }

    fn record(&self, value: &T) {
        *self.latest.borrow_mut() = Some(value.clone());
    }

    /// Start a timer that emits the latest recorded value into `out`
    fn arm(this: &Rc<Self>, scheduler: &SchedulerHandle, wait: Duration, out: &Stream<T>) {
        let state = Rc::clone(this);
        let out = out.clone();
        let timer = scheduler.set_timeout(wait, move || {
            state.id.set(None);
            let value = state.latest.borrow_mut().take();
            if let Some(value) = value {
                out.set(value);
            }
        });
        this.id.set(timer);
    }
}

/// Emit at most once per `window`
///
/// The first value after an idle period starts a timer; values arriving while
/// it runs are not emitted individually. When the timer fires, the *latest*
/// value of `source` is emitted and the next value starts a new window.
pub fn throttle<T: Clone + 'static>(
    scheduler: &Scheduler,
    window: Duration,
    source: &Stream<T>,
) -> Stream<T> {
    let result = Stream::new();
    let state = Pending::new();
    let out = result.clone();
    let scheduler = scheduler.handle();
    source.subscribe(move |value: &T| {
        state.record(value);
        if state.id.get().is_none() {
            Pending::arm(&state, &scheduler, window, &out);
        }
    });
    result
}

/// Emit the current value of `source` once it has been silent for `quiet`
///
/// Every emission restarts the quiet period; values that are superseded
/// before the period ends are never emitted.
pub fn after_silence<T: Clone + 'static>(
    scheduler: &Scheduler,
    quiet: Duration,
    source: &Stream<T>,
) -> Stream<T> {
    let result = Stream::new();
    let state = Pending::new();
    let out = result.clone();
    let scheduler = scheduler.handle();
    source.subscribe(move |value: &T| {
        state.record(value);
        if let Some(id) = state.id.take() {
            scheduler.clear_timeout(id);
        }
        Pending::arm(&state, &scheduler, quiet, &out);
    });
    result
}

/// Emit the last value of a burst once `source` has been quiet for `quiet`
///
/// Same quiet-period algorithm as [`after_silence`]. Emissions are not
/// rate-limited by dropping: nothing is emitted until the stream goes idle.
pub fn debounce<T: Clone + 'static>(
    scheduler: &Scheduler,
    quiet: Duration,
    source: &Stream<T>,
) -> Stream<T> {
    after_silence(scheduler, quiet, source)
}
