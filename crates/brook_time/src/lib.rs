//! Brook Time
//!
//! Timers for `brook_core` streams:
//!
//! - **Scheduler**: a single-threaded timer queue driven explicitly with
//!   `run_due`, `run_for`, `run_until` or `run`
//! - **Clocks**: [`SystemClock`] for real time, [`ManualClock`] for
//!   deterministic virtual time
//! - **Operators**: [`every`], [`delay`], [`throttle`], [`debounce`] and
//!   [`after_silence`]
//!
//! # Example
//!
//! ```rust
//! use brook_core::Stream;
//! use brook_time::{after_silence, ManualClock, Scheduler};
//! use std::time::Duration;
//!
//! let scheduler = Scheduler::with_clock(ManualClock::new());
//! let input = Stream::new();
//! let settled = after_silence(&scheduler, Duration::from_millis(10), &input);
//!
//! input.set(1);
//! input.set(2);
//! assert_eq!(settled.get(), None);
//!
//! scheduler.run_for(Duration::from_millis(11));
//! assert_eq!(settled.get(), Some(2));
//! ```

pub mod clock;
pub mod config;
pub mod scheduler;
pub mod temporal;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SchedulerConfig;
pub use scheduler::{Scheduler, SchedulerHandle, TimerId};
pub use temporal::{after_silence, debounce, delay, every, throttle, Until};
