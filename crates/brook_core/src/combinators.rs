//! Stream combinators
//!
//! Each combinator allocates a new [`Stream`] and registers an updater on one
//! or more source streams. Nothing is evaluated at construction time except
//! where a combinator seeds its result (`scan`, `scan_merge`, `default_to`,
//! `flat_map`). Operator state (accumulators, buffers) lives in a private
//! struct owned by the updater closure of that one combinator instance.
//!
//! ```rust
//! use brook_core::{map, merge, scan, Stream};
//!
//! let a = Stream::new();
//! let b = map(|n: &i32| n + 1, &a);
//! let c = map(|n: &i32| n + 2, &a);
//! let d = merge(&[b, c]);
//! let seen = scan(|mut acc: Vec<i32>, v: &i32| { acc.push(*v); acc }, Vec::new(), &d);
//!
//! a.set(1);
//! assert_eq!(seen.get(), Some(vec![2, 3]));
//! ```

use crate::error::{Result, StreamError};
use crate::stream::Stream;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Apply `f` to every value of `source`
pub fn map<T, U, F>(f: F, source: &Stream<T>) -> Stream<U>
where
    T: Clone + 'static,
    U: Clone + 'static,
    F: Fn(&T) -> U + 'static,
{
    let result = Stream::new();
    let out = result.clone();
    source.subscribe(move |value| {
        out.set(f(value));
    });
    result
}

/// Re-emit every value of every source, one emission per source write
///
/// Emissions are never coalesced: if two sources fire during one write, the
/// result fires twice, in the order the sources fired. An empty slice gives
/// a stream that never emits.
pub fn merge<T: Clone + 'static>(sources: &[Stream<T>]) -> Stream<T> {
    let result = Stream::new();
    for source in sources {
        let out = result.clone();
        source.subscribe(move |value: &T| {
            out.set(value.clone());
        });
    }
    result
}

/// Per-instance state for [`scan`]
struct Scan<A, F> {
    acc: RefCell<A>,
    fold: F,
}

/// Fold every value of `source` into an accumulator and emit the result
///
/// The returned stream starts out holding `initial`.
pub fn scan<T, A, F>(fold: F, initial: A, source: &Stream<T>) -> Stream<A>
where
    T: Clone + 'static,
    A: Clone + 'static,
    F: Fn(A, &T) -> A + 'static,
{
    let result = Stream::with_value(initial.clone());
    let state = Scan {
        acc: RefCell::new(initial),
        fold,
    };
    let out = result.clone();
    source.subscribe(move |value| {
        let acc = state.acc.borrow().clone();
        let next = (state.fold)(acc, value);
        *state.acc.borrow_mut() = next.clone();
        out.set(next);
    });
    result
}

/// Collect values into batches of exactly `capacity` items
///
/// The result only changes when a batch is complete; the next batch starts
/// empty. Fails if `capacity` is zero.
pub fn buffer<T: Clone + 'static>(capacity: usize, source: &Stream<T>) -> Result<Stream<Vec<T>>> {
    if capacity == 0 {
        return Err(StreamError::invalid_argument(
            "capacity",
            "buffer capacity must be at least 1",
        ));
    }

    let result = Stream::new();
    let pending = RefCell::new(Vec::with_capacity(capacity));
    let out = result.clone();
    source.subscribe(move |value: &T| {
        let batch = {
            let mut pending = pending.borrow_mut();
            pending.push(value.clone());
            if pending.len() < capacity {
                return;
            }
            std::mem::replace(&mut *pending, Vec::with_capacity(capacity))
        };
        out.set(batch);
    });
    Ok(result)
}

/// Re-emit only the values for which `predicate` holds
///
/// Rejected values leave the result untouched.
pub fn filter<T, P>(predicate: P, source: &Stream<T>) -> Stream<T>
where
    T: Clone + 'static,
    P: Fn(&T) -> bool + 'static,
{
    let result = Stream::new();
    let out = result.clone();
    source.subscribe(move |value: &T| {
        if predicate(value) {
            out.set(value.clone());
        }
    });
    result
}

/// Builder for a scan over several sources sharing one accumulator
///
/// Each source folds into the accumulator with its own function. Sources may
/// carry different value types.
///
/// ```rust
/// use brook_core::{ScanMerge, Stream};
///
/// let add = Stream::new();
/// let label = Stream::new();
/// let total = ScanMerge::new(0)
///     .on(&add, |sum, n: &i32| sum + n)
///     .on(&label, |_, s: &String| s.len() as i32)
///     .build();
///
/// add.set(3);
/// label.set("hello".to_string());
/// add.set(1);
/// assert_eq!(total.get(), Some(6));
/// ```
pub struct ScanMerge<A: Clone + 'static> {
    acc: Rc<RefCell<A>>,
    result: Stream<A>,
}

impl<A: Clone + 'static> ScanMerge<A> {
    /// Start a shared scan seeded with `initial`
    pub fn new(initial: A) -> Self {
        Self {
            result: Stream::with_value(initial.clone()),
            acc: Rc::new(RefCell::new(initial)),
        }
    }

    /// Fold values of `source` into the shared accumulator with `fold`
    pub fn on<T, F>(self, source: &Stream<T>, fold: F) -> Self
    where
        T: Clone + 'static,
        F: Fn(A, &T) -> A + 'static,
    {
        let acc = Rc::clone(&self.acc);
        let out = self.result.clone();
        source.subscribe(move |value| {
            let current = acc.borrow().clone();
            let next = fold(current, value);
            *acc.borrow_mut() = next.clone();
            out.set(next);
        });
        self
    }

    /// Finish wiring and return the result stream
    pub fn build(self) -> Stream<A> {
        self.result
    }
}

/// A boxed fold function for [`scan_merge`]
pub type Fold<A, T> = Box<dyn Fn(A, &T) -> A>;

/// Scan several same-typed sources into one shared accumulator
///
/// Equivalent to chaining [`ScanMerge::on`] over `pairs` in order.
pub fn scan_merge<T, A>(pairs: Vec<(Stream<T>, Fold<A, T>)>, initial: A) -> Stream<A>
where
    T: Clone + 'static,
    A: Clone + 'static,
{
    pairs
        .into_iter()
        .fold(ScanMerge::new(initial), |builder, (source, fold)| {
            builder.on(&source, fold)
        })
        .build()
}

/// Start with `value`, then mirror `source`
pub fn default_to<T: Clone + 'static>(value: T, source: &Stream<T>) -> Stream<T> {
    let result = Stream::with_value(value);
    let out = result.clone();
    source.subscribe(move |value: &T| {
        out.set(value.clone());
    });
    result
}

/// Emit `value` every time `source` emits anything
pub fn always<T, U>(value: U, source: &Stream<T>) -> Stream<U>
where
    T: Clone + 'static,
    U: Clone + 'static,
{
    map(move |_| value.clone(), source)
}

/// Map each value to an inner stream and relay what the inner streams emit
///
/// The result is seeded with the current value of `f(source)` when `source`
/// already has a value. On every outer emission the new inner stream's
/// current value (if any) is relayed immediately and a relay is attached for
/// later values. Relays are never detached: an inner stream selected by an
/// earlier outer value keeps writing into the result. See [`switch_map`] for
/// the variant that only follows the latest inner stream.
pub fn flat_map<T, U, F>(f: F, source: &Stream<T>) -> Stream<U>
where
    T: Clone + 'static,
    U: Clone + 'static,
    F: Fn(&T) -> Stream<U> + 'static,
{
    let result = seed_from_inner(&f, source);
    let out = result.clone();
    source.subscribe(move |value| {
        let inner = f(value);
        if let Some(current) = inner.get() {
            out.set(current);
        }
        let relay = out.clone();
        inner.subscribe(move |value: &U| {
            relay.set(value.clone());
        });
    });
    result
}

/// Like [`flat_map`], but only the inner stream chosen by the latest outer
/// value is relayed
///
/// Relays attached for earlier outer values stay registered but go inert.
pub fn switch_map<T, U, F>(f: F, source: &Stream<T>) -> Stream<U>
where
    T: Clone + 'static,
    U: Clone + 'static,
    F: Fn(&T) -> Stream<U> + 'static,
{
    let result = seed_from_inner(&f, source);
    let generation = Rc::new(Cell::new(0u64));
    let out = result.clone();
    source.subscribe(move |value| {
        let current_generation = generation.get() + 1;
        generation.set(current_generation);

        let inner = f(value);
        if let Some(current) = inner.get() {
            out.set(current);
        }
        let relay = out.clone();
        let generation = Rc::clone(&generation);
        inner.subscribe(move |value: &U| {
            if generation.get() == current_generation {
                relay.set(value.clone());
            }
        });
    });
    result
}

fn seed_from_inner<T, U, F>(f: &F, source: &Stream<T>) -> Stream<U>
where
    T: Clone + 'static,
    U: Clone + 'static,
    F: Fn(&T) -> Stream<U>,
{
    match source.get().and_then(|value| f(&value).get()) {
        Some(seed) => Stream::with_value(seed),
        None => Stream::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map() {
        let s = Stream::new();
        let mapped = map(|n: &i32| n + 1, &s);
        assert_eq!(mapped.get(), None);

        s.set(1);
        assert_eq!(mapped.get(), Some(2));
        s.set(2);
        assert_eq!(mapped.get(), Some(3));
    }

    #[test]
    fn test_map_ignores_seed_of_source() {
        let s = Stream::with_value(10);
        let mapped = map(|n: &i32| n * 2, &s);
        assert_eq!(mapped.get(), None);
    }

    #[test]
    fn test_merge() {
        let s1 = Stream::new();
        let s2 = Stream::new();
        let merged = merge(&[s1.clone(), s2.clone()]);

        s1.set(1);
        assert_eq!(merged.get(), Some(1));
        s2.set(2);
        assert_eq!(merged.get(), Some(2));
        s1.set(3);
        assert_eq!(merged.get(), Some(3));
    }

    #[test]
    fn test_merge_emits_once_per_source_write() {
        let a = Stream::new();
        let merged = merge(&[a.clone(), a.clone()]);
        let count = scan(|n, _: &i32| n + 1, 0, &merged);

        a.set(1);
        assert_eq!(count.get(), Some(2));
    }

    #[test]
    fn test_merge_of_nothing_never_emits() {
        let merged: Stream<i32> = merge(&[]);
        assert_eq!(merged.get(), None);
    }

    #[test]
    fn test_scan() {
        let s = Stream::new();
        let scanned = scan(|sum, n: &i32| sum + n, 0, &s);
        assert_eq!(scanned.get(), Some(0));

        s.set(1);
        assert_eq!(scanned.get(), Some(1));
        s.set(2);
        assert_eq!(scanned.get(), Some(3));
        s.set(3);
        assert_eq!(scanned.get(), Some(6));
    }

    #[test]
    fn test_scan_accumulators_are_independent() {
        let s = Stream::new();
        let sum = scan(|acc, n: &i32| acc + n, 0, &s);
        let product = scan(|acc, n: &i32| acc * n, 1, &s);
        let sum_again = scan(|acc, n: &i32| acc + n, 100, &s);

        s.set(2);
        s.set(3);
        assert_eq!(sum.get(), Some(5));
        assert_eq!(product.get(), Some(6));
        assert_eq!(sum_again.get(), Some(105));
    }

    #[test]
    fn test_buffer() {
        let s = Stream::new();
        let buffered = buffer(2, &s).unwrap();

        s.set(1);
        assert_eq!(buffered.get(), None);
        s.set(2);
        assert_eq!(buffered.get(), Some(vec![1, 2]));
        s.set(3);
        assert_eq!(buffered.get(), Some(vec![1, 2]));
        s.set(4);
        assert_eq!(buffered.get(), Some(vec![3, 4]));
    }

    #[test]
    fn test_buffer_counts_falsy_values() {
        let s = Stream::new();
        let buffered = buffer(3, &s).unwrap();

        s.set(0);
        s.set(0);
        assert_eq!(buffered.get(), None);
        s.set(0);
        assert_eq!(buffered.get(), Some(vec![0, 0, 0]));
    }

    #[test]
    fn test_buffer_of_one_emits_every_value() {
        let s = Stream::new();
        let buffered = buffer(1, &s).unwrap();
        s.set('x');
        assert_eq!(buffered.get(), Some(vec!['x']));
    }

    #[test]
    fn test_buffer_write_back_starts_fresh_batch() {
        let s = Stream::new();
        let buffered = buffer(2, &s).unwrap();
        let batches = Rc::new(RefCell::new(Vec::new()));

        let source = s.downgrade();
        let batches_clone = batches.clone();
        buffered.subscribe(move |batch: &Vec<i32>| {
            batches_clone.borrow_mut().push(batch.clone());
            if batch[0] == 1 {
                if let Some(source) = source.upgrade() {
                    source.set(10);
                    source.set(11);
                    source.set(12);
                }
            }
        });

        s.set(1);
        s.set(2);
        s.set(13);

        assert_eq!(
            *batches.borrow(),
            vec![vec![1, 2], vec![10, 11], vec![12, 13]]
        );
        assert_eq!(buffered.get(), Some(vec![12, 13]));
    }

    #[test]
    fn test_buffer_rejects_zero_capacity() {
        let s: Stream<i32> = Stream::new();
        let err = buffer(0, &s).unwrap_err();
        assert!(matches!(
            err,
            StreamError::InvalidArgument {
                name: "capacity",
                ..
            }
        ));
    }

    #[test]
    fn test_filter() {
        let s = Stream::new();
        let filtered = filter(|n: &i32| n % 2 == 0, &s);

        s.set(1);
        assert_eq!(filtered.get(), None);
        s.set(2);
        assert_eq!(filtered.get(), Some(2));
        s.set(3);
        assert_eq!(filtered.get(), Some(2));
        s.set(4);
        assert_eq!(filtered.get(), Some(4));
    }

    #[test]
    fn test_filter_passes_falsy_values() {
        let s = Stream::new();
        let filtered = filter(|b: &bool| !*b, &s);
        s.set(false);
        assert_eq!(filtered.get(), Some(false));
    }

    #[test]
    fn test_scan_merge() {
        let add = Stream::new();
        let mul = Stream::new();
        let result = scan_merge(
            vec![
                (
                    add.clone(),
                    Box::new(|sum: i32, n: &i32| sum + n) as Fold<i32, i32>,
                ),
                (
                    mul.clone(),
                    Box::new(|sum: i32, n: &i32| sum * n) as Fold<i32, i32>,
                ),
            ],
            0,
        );
        assert_eq!(result.get(), Some(0));

        add.set(1);
        assert_eq!(result.get(), Some(1));
        mul.set(2);
        assert_eq!(result.get(), Some(2));
        add.set(3);
        assert_eq!(result.get(), Some(5));
        mul.set(4);
        assert_eq!(result.get(), Some(20));
    }

    #[test]
    fn test_scan_merge_builder_mixed_types() {
        let push = Stream::new();
        let reset = Stream::new();
        let items = ScanMerge::new(Vec::new())
            .on(&push, |mut v: Vec<char>, c: &char| {
                v.push(*c);
                v
            })
            .on(&reset, |_, _: &()| Vec::new())
            .build();

        push.set('a');
        push.set('b');
        assert_eq!(items.get(), Some(vec!['a', 'b']));
        reset.set(());
        assert_eq!(items.get(), Some(vec![]));
        push.set('c');
        assert_eq!(items.get(), Some(vec!['c']));
    }

    #[test]
    fn test_always() {
        let s = Stream::new();
        let s1 = always(1, &s);

        s.set(9);
        assert_eq!(s1.get(), Some(1));
        s.set(10);
        assert_eq!(s1.get(), Some(1));
    }

    #[test]
    fn test_default_to() {
        let s = Stream::new();
        let s1 = default_to(1, &s);
        assert_eq!(s1.get(), Some(1));

        s.set(2);
        assert_eq!(s1.get(), Some(2));
    }

    #[test]
    fn test_flat_map() {
        let s = Stream::new();
        let nested = Stream::new();
        let nested_clone = nested.clone();
        let s1 = flat_map(move |_: &i32| nested_clone.clone(), &s);

        s.set(1);
        assert_eq!(s1.get(), None);
        nested.set(1);
        assert_eq!(s1.get(), Some(1));
    }

    #[test]
    fn test_flat_map_relays_current_inner_value() {
        let s = Stream::new();
        let nested = Stream::with_value("ready");
        let nested_clone = nested.clone();
        let flat = flat_map(move |_: &i32| nested_clone.clone(), &s);
        assert_eq!(flat.get(), None);

        s.set(1);
        assert_eq!(flat.get(), Some("ready"));
    }

    #[test]
    fn test_flat_map_seeds_from_current_source() {
        let s = Stream::with_value(3);
        let flat = flat_map(|n: &i32| Stream::with_value(n * 10), &s);
        assert_eq!(flat.get(), Some(30));
    }

    #[test]
    fn test_flat_map_keeps_stale_inner_streams_live() {
        let left = Stream::new();
        let right = Stream::new();
        let pick = Stream::new();
        let (l, r) = (left.clone(), right.clone());
        let flat = flat_map(
            move |go_left: &bool| if *go_left { l.clone() } else { r.clone() },
            &pick,
        );

        pick.set(true);
        pick.set(false);
        right.set(2);
        assert_eq!(flat.get(), Some(2));

        // The left relay was never detached
        left.set(1);
        assert_eq!(flat.get(), Some(1));
    }

    #[test]
    fn test_switch_map_ignores_stale_inner_streams() {
        let left = Stream::new();
        let right = Stream::new();
        let pick = Stream::new();
        let (l, r) = (left.clone(), right.clone());
        let switched = switch_map(
            move |go_left: &bool| if *go_left { l.clone() } else { r.clone() },
            &pick,
        );

        pick.set(true);
        left.set(1);
        assert_eq!(switched.get(), Some(1));

        pick.set(false);
        right.set(2);
        assert_eq!(switched.get(), Some(2));

        left.set(3);
        assert_eq!(switched.get(), Some(2));

        // Switching back re-attaches a fresh relay
        pick.set(true);
        assert_eq!(switched.get(), Some(3));
        left.set(4);
        assert_eq!(switched.get(), Some(4));
    }
}
