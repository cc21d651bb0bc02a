//! Stream cells and the propagation kernel
//!
//! A [`Stream<T>`] holds the last value written to it and an ordered list of
//! dependents ("updaters"). Writing a value stores it and then calls every
//! updater, in registration order, before `set` returns. Updaters usually
//! write into other streams, so a single write walks the dependency graph
//! depth-first.
//!
//! ```rust
//! use brook_core::Stream;
//!
//! let count = Stream::new();
//! assert_eq!(count.get(), None);
//!
//! // Writes return the handle, so a read can follow immediately
//! assert_eq!(count.set(2).get(), Some(2));
//! ```
//!
//! # Ownership
//!
//! `Stream<T>` is a reference-counted handle: cloning it never copies the
//! cell. A cell stays alive as long as any handle, or any updater closure
//! holding a handle, refers to it. Updaters are never removed.

use smallvec::SmallVec;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Callback invoked with every value written to a stream
pub type Updater<T> = Rc<dyn Fn(&T)>;

/// Internal cell storage
struct StreamNode<T> {
    /// Last written value (None before the first write)
    value: RefCell<Option<T>>,
    /// Updaters in registration order (append-only)
    dependents: RefCell<SmallVec<[Updater<T>; 4]>>,
}

/// A reactive cell handle (cheap to clone)
pub struct Stream<T> {
    node: Rc<StreamNode<T>>,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<T: Clone + 'static> Stream<T> {
    /// Create a stream with no value
    pub fn new() -> Self {
        Self::from_option(None)
    }

    /// Create a stream holding an initial value
    ///
    /// The initial value is not propagated; there are no dependents yet.
    pub fn with_value(value: T) -> Self {
        Self::from_option(Some(value))
    }

    fn from_option(value: Option<T>) -> Self {
        Self {
            node: Rc::new(StreamNode {
                value: RefCell::new(value),
                dependents: RefCell::new(SmallVec::new()),
            }),
        }
    }

    /// Get the current value
    pub fn get(&self) -> Option<T> {
        self.node.value.borrow().clone()
    }

    /// Read the current value without cloning it
    ///
    /// The cell is borrowed for the duration of `f`; writing to this same
    /// stream from inside `f` panics.
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.node.value.borrow().as_ref())
    }

    /// Whether the stream has ever been written to (or was seeded)
    pub fn has_value(&self) -> bool {
        self.node.value.borrow().is_some()
    }

    /// Write a value and propagate it to every dependent
    ///
    /// Dependents run synchronously, in registration order. Dependents added
    /// while propagation is in progress are also called in this pass.
    pub fn set(&self, value: T) -> &Self {
        *self.node.value.borrow_mut() = Some(value.clone());
        tracing::trace!(dependents = self.dependent_count(), "stream write");
        self.propagate(&value);
        self
    }

    /// Call each updater in turn without holding a borrow across the call,
    /// so updaters are free to read, write, or subscribe to this stream.
    fn propagate(&self, value: &T) {
        let mut index = 0;
        loop {
            let updater = match self.node.dependents.borrow().get(index) {
                Some(updater) => Rc::clone(updater),
                None => break,
            };
            updater(value);
            index += 1;
        }
    }

    /// Register an updater
    ///
    /// The updater is called with every subsequent write. It is not called
    /// with the current value. There is no way to unsubscribe.
    pub fn subscribe(&self, updater: impl Fn(&T) + 'static) {
        self.node.dependents.borrow_mut().push(Rc::new(updater));
    }

    /// Number of registered updaters
    pub fn dependent_count(&self) -> usize {
        self.node.dependents.borrow().len()
    }

    /// Create a weak handle that does not keep the cell alive
    pub fn downgrade(&self) -> WeakStream<T> {
        WeakStream {
            node: Rc::downgrade(&self.node),
        }
    }
}

impl<T> Stream<T> {
    /// Whether two handles refer to the same cell
    pub fn ptr_eq(&self, other: &Stream<T>) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }
}

impl<T: Clone + 'static> Default for Stream<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> From<T> for Stream<T> {
    fn from(value: T) -> Self {
        Self::with_value(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("value", &*self.node.value.borrow())
            .field("dependents", &self.node.dependents.borrow().len())
            .finish()
    }
}

/// Renders as `stream(<value>)`, or `stream()` before the first write
impl<T: fmt::Display> fmt::Display for Stream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.node.value.borrow() {
            Some(value) => write!(f, "stream({value})"),
            None => f.write_str("stream()"),
        }
    }
}

/// A non-owning stream handle
///
/// Used by updaters that need to read the very stream they are registered
/// on; holding a strong handle there would keep the cell alive forever.
pub struct WeakStream<T> {
    node: Weak<StreamNode<T>>,
}

impl<T> Clone for WeakStream<T> {
    fn clone(&self) -> Self {
        Self {
            node: Weak::clone(&self.node),
        }
    }
}

impl<T> WeakStream<T> {
    /// Recover a strong handle if the cell is still alive
    pub fn upgrade(&self) -> Option<Stream<T>> {
        self.node.upgrade().map(|node| Stream { node })
    }
}

impl<T> fmt::Debug for WeakStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakStream")
            .field("alive", &(self.node.strong_count() > 0))
            .finish()
    }
}
