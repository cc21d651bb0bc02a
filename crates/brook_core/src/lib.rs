//! Brook Core
//!
//! A minimal reactive-value engine:
//!
//! - **Streams**: cells holding a current value and an ordered list of
//!   dependents, updated by synchronous depth-first propagation
//! - **Combinators**: map, merge, scan, buffer, filter, scan_merge,
//!   default_to, always, flat_map, switch_map
//! - **Objects**: a keyed description of streams collapsed into one stream of
//!   live snapshots
//! - **Debugging**: `log` taps and `Display` rendering
//!
//! Time-based operators live in `brook_time`.
//!
//! # Example
//!
//! ```rust
//! use brook_core::{buffer, scan, Stream};
//!
//! let clicks = Stream::new();
//! let total = scan(|sum, n: &i32| sum + n, 0, &clicks);
//! let pairs = buffer(2, &clicks).unwrap();
//!
//! clicks.set(1);
//! assert_eq!(total.get(), Some(1));
//! assert_eq!(pairs.get(), None);
//!
//! clicks.set(2);
//! assert_eq!(total.get(), Some(3));
//! assert_eq!(pairs.get(), Some(vec![1, 2]));
//! ```
//!
//! Streams are single-threaded (`Rc`-based) and never unsubscribe; a graph is
//! built once and then driven by writes to its leaf streams.

pub mod combinators;
pub mod debug;
pub mod error;
pub mod object;
pub mod stream;

pub use combinators::{
    always, buffer, default_to, filter, flat_map, map, merge, scan, scan_merge, switch_map, Fold,
    ScanMerge,
};
pub use debug::log;
pub use error::{Result, StreamError};
pub use object::{object, Field, ObjectSpec, Snapshot, SnapshotMap};
pub use stream::{Stream, Updater, WeakStream};
