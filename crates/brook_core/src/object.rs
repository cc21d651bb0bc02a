//! Live object snapshots
//!
//! [`object`] collapses a keyed description of streams, literals and nested
//! descriptions into a single stream of [`Snapshot`]s. The snapshot is
//! updated whenever any constituent stream emits.
//!
//! Whether a field is a stream, a literal or a nested object is decided at
//! the call site through [`Field`], so no runtime type inspection is needed.
//!
//! ```rust
//! use brook_core::{object, ObjectSpec, Stream};
//!
//! let x = Stream::with_value(1);
//! let y = Stream::new();
//! let point = object(
//!     ObjectSpec::new()
//!         .stream("x", &x)
//!         .stream("y", &y)
//!         .nested("meta", ObjectSpec::new().literal("unit", 0)),
//! );
//!
//! y.set(5);
//! let snapshot = point.get().unwrap();
//! assert_eq!(snapshot.at(&["x"]), Some(&1));
//! assert_eq!(snapshot.at(&["y"]), Some(&5));
//! assert_eq!(snapshot.at(&["meta", "unit"]), Some(&0));
//! ```

use crate::combinators::{always, merge, scan};
use crate::stream::{Stream, WeakStream};
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};

/// Ordered key → snapshot map
pub type SnapshotMap<T> = IndexMap<String, Snapshot<T>, FxBuildHasher>;

/// One entry of an [`ObjectSpec`]
pub enum Field<T> {
    /// A stream whose current value is tracked
    Stream(Stream<T>),
    /// A constant copied into every snapshot
    Literal(T),
    /// A nested description, resolved into its own object stream
    Nested(ObjectSpec<T>),
}

impl<T> Field<T> {
    pub fn is_stream(&self) -> bool {
        matches!(self, Field::Stream(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Field::Literal(_))
    }

    pub fn is_nested(&self) -> bool {
        matches!(self, Field::Nested(_))
    }
}

/// Keyed description of an object stream
///
/// Keys keep insertion order. Repeating a key replaces the earlier field.
///
/// Every field shares the value type `T`; objects mixing, say, text and
/// numbers use an enum of their own as `T`.
pub struct ObjectSpec<T> {
    fields: Vec<(String, Field<T>)>,
}

impl<T: Clone + 'static> ObjectSpec<T> {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Add a field of any kind
    pub fn field(mut self, key: impl Into<String>, field: Field<T>) -> Self {
        let key = key.into();
        self.fields.retain(|(existing, _)| *existing != key);
        self.fields.push((key, field));
        self
    }

    /// Track a stream under `key`
    pub fn stream(self, key: impl Into<String>, stream: &Stream<T>) -> Self {
        self.field(key, Field::Stream(stream.clone()))
    }

    /// Store a constant under `key`
    pub fn literal(self, key: impl Into<String>, value: T) -> Self {
        self.field(key, Field::Literal(value))
    }

    /// Nest another description under `key`
    pub fn nested(self, key: impl Into<String>, spec: ObjectSpec<T>) -> Self {
        self.field(key, Field::Nested(spec))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field<T>)> {
        self.fields.iter().map(|(key, field)| (key.as_str(), field))
    }
}

impl<T: Clone + 'static> Default for ObjectSpec<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The value carried by an object stream
#[derive(Clone, Debug, PartialEq)]
pub enum Snapshot<T> {
    /// A leaf: a literal or a stream's current value (None if it has none)
    Value(Option<T>),
    /// A nested object
    Object(SnapshotMap<T>),
}

impl<T> Snapshot<T> {
    fn empty_object() -> Self {
        Snapshot::Object(SnapshotMap::default())
    }

    /// Look up a direct child
    pub fn get(&self, key: &str) -> Option<&Snapshot<T>> {
        match self {
            Snapshot::Object(map) => map.get(key),
            Snapshot::Value(_) => None,
        }
    }

    /// The leaf value, if this is a leaf holding one
    pub fn value(&self) -> Option<&T> {
        match self {
            Snapshot::Value(value) => value.as_ref(),
            Snapshot::Object(_) => None,
        }
    }

    pub fn as_object(&self) -> Option<&SnapshotMap<T>> {
        match self {
            Snapshot::Object(map) => Some(map),
            Snapshot::Value(_) => None,
        }
    }

    /// Follow `path` through nested objects and return the leaf value
    pub fn at(&self, path: &[&str]) -> Option<&T> {
        path.iter()
            .try_fold(self, |node, key| node.get(key))
            .and_then(Snapshot::value)
    }
}

/// Where a stream-backed key reads its live value from
///
/// Weak, because the object's own scan updater is reachable from these
/// streams; a strong handle would form a cycle.
enum Source<T> {
    Leaf(WeakStream<T>),
    Nested(WeakStream<Snapshot<T>>),
}

impl<T: Clone + 'static> Source<T> {
    fn read(&self) -> Option<Snapshot<T>> {
        match self {
            Source::Leaf(stream) => stream.upgrade().map(|s| Snapshot::Value(s.get())),
            Source::Nested(stream) => stream.upgrade().and_then(|s| s.get()),
        }
    }
}

/// Build a stream of snapshots from a keyed description
///
/// The first snapshot is available immediately and holds every literal plus
/// the current value of every stream. Each later emission of a constituent
/// stream re-reads that key and emits an updated snapshot. Every emission is
/// an owned copy; downstream consumers never observe later mutations.
pub fn object<T: Clone + 'static>(spec: ObjectSpec<T>) -> Stream<Snapshot<T>> {
    let mut initial = SnapshotMap::default();
    let mut sources = FxHashMap::default();
    let mut announcements = Vec::new();

    for (key, field) in spec.fields {
        match field {
            Field::Literal(value) => {
                initial.insert(key, Snapshot::Value(Some(value)));
            }
            Field::Stream(stream) => {
                initial.insert(key.clone(), Snapshot::Value(stream.get()));
                announcements.push(always(key.clone(), &stream));
                sources.insert(key, Source::Leaf(stream.downgrade()));
            }
            Field::Nested(nested_spec) => {
                let nested = object(nested_spec);
                initial.insert(
                    key.clone(),
                    nested.get().unwrap_or_else(Snapshot::empty_object),
                );
                announcements.push(always(key.clone(), &nested));
                sources.insert(key, Source::Nested(nested.downgrade()));
            }
        }
    }

    let announced = merge(&announcements);
    scan(
        move |mut snapshot: Snapshot<T>, key: &String| {
            if let (Snapshot::Object(map), Some(live)) =
                (&mut snapshot, sources.get(key).and_then(Source::read))
            {
                map.insert(key.clone(), live);
            }
            snapshot
        },
        Snapshot::Object(initial),
        &announced,
    )
}
