#![cfg_attr(
    test,
    deny(
        missing_docs,
        future_incompatible,
        nonstandard_style,
        rust_2018_idioms,
        missing_copy_implementations,
        trivial_casts,
        trivial_numeric_casts,
        unused_qualifications,
    )
)]
#![cfg_attr(test, deny(
    clippy::decimal_literal_representation,
    clippy::doc_markdown,
    clippy::empty_enum,
    clippy::expl_impl_clone_on_copy,
    clippy::fallible_impl_from,
    clippy::filter_map_next,
    clippy::get_unwrap,
    clippy::if_not_else,
    clippy::inline_always,
    clippy::invalid_upcast_comparisons,
    clippy::manual_find_map,
    clippy::map_flatten,
    clippy::match_like_matches_macro,
    clippy::maybe_infinite_iter,
    clippy::mem_forget,
    clippy::mut_mut,
    clippy::needless_borrow,
    clippy::needless_continue,
    clippy::non_ascii_literal,
    clippy::redundant_closure_for_method_calls,
    clippy::single_match_else,
    clippy::string_add,
    clippy::string_add_assign,
    clippy::type_repetition_in_bounds,
    clippy::unicode_not_nfc,
    clippy::unimplemented,
    clippy::unseparated_literal_suffix,
    clippy::used_underscore_binding,
    clippy::wildcard_dependencies,
))]
#![cfg_attr(
    test,
    warn(
        clippy::missing_const_for_fn,
        clippy::multiple_crate_versions,
        clippy::wildcard_enum_match_arm,
    )
)]

//! A relaxed concurrent priority queue, built on the "mound": a binary
//! tree in which every node holds a short list of values sorted from
//! highest to lowest, and the list heads obey the heap property.
//!
//! Pushes land on a pseudo-randomly chosen path of the tree and lock at
//! most a node and its parent, so producers rarely collide. Pops always
//! take from the root, which is the contended spot, so by default the
//! root hands out a whole batch of its highest values at once through a
//! small shared buffer (`POP_BATCH`) that other consumers drain with one
//! atomic decrement each.
//!
//! The price is relaxed ordering: with a shared buffer, or with several
//! threads racing, a pop returns one of the highest values in the queue
//! rather than strictly the highest. With `POP_BATCH = 0` and a single
//! thread, values come out in exact priority order.
//!
//! Values are returned by cloning them out of nodes that are reclaimed
//! through epoch-based reclamation, so cheap-to-clone types (or values
//! wrapped in `Arc`) work best.
//!
//! ```
//! use concurrent_mound::RelaxedPriorityQueue;
//!
//! let queue = RelaxedPriorityQueue::<u64>::default();
//!
//! for value in [5, 3, 8, 1, 9, 2] {
//!     queue.push(value);
//! }
//!
//! let popped: Vec<u64> = (0..6).map(|_| queue.pop()).collect();
//! assert_eq!(popped, vec![9, 8, 5, 3, 2, 1]);
//! assert!(queue.is_empty());
//! ```

#[cfg(not(feature = "fault_injection"))]
#[inline]
const fn debug_delay() -> bool {
    false
}

/// This function is useful for inducing random jitter into
/// our lock acquisitions, shaking out more possible
/// interleavings quickly. It gets fully eliminated by the
/// compiler in non-test code.
#[cfg(feature = "fault_injection")]
fn debug_delay() -> bool {
    use rand::{thread_rng, Rng};

    let mut rng = thread_rng();

    match rng.gen_range(0..100) {
        0..=96 => false,
        97 => {
            std::thread::yield_now();
            false
        }
        _ => true,
    }
}

mod buffer;
mod futex;
mod mound;
#[cfg(feature = "serde")]
mod serde;
mod spin_lock;

pub use spin_lock::SpinLock;

use std::fmt;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

#[cfg(feature = "timing")]
use std::sync::atomic::AtomicU64;
#[cfg(feature = "timing")]
use std::time::{Duration, Instant};

use crossbeam_utils::{Backoff, CachePadded};
use ebr::Ebr;
use parking_lot::lock_api::RawMutex;

use crate::futex::Blocking;
use crate::mound::{Mound, Node};

const LOCAL_GC_BUFFER_SIZE: usize = 128;

/// A relaxed concurrent priority queue that pops high values first.
///
/// Note that this structure is `Send` but NOT `Sync`. The
/// reclamation system, provided by the `ebr` crate, keeps
/// per-handle state that avoids atomic operations in its hot
/// path. To share a queue between threads, clone it: every
/// clone is a handle to the same queue with its own
/// reclamation state.
///
/// The const generics tune the queue:
///
/// * `MAY_BLOCK`: when `true`, [`pop`](Self::pop) on an empty queue
///   sleeps until a producer pushes, instead of spinning and yielding.
/// * `SUPPORTS_SIZE`: when `true`, pushes and pops are counted so that
///   [`len`](Self::len) can report an estimate.
/// * `POP_BATCH`: how many values the root hands out at once through
///   the shared buffer. `0` disables the buffer, which makes popping
///   from a single thread strictly ordered. Must be at most 256.
/// * `LIST_TARGET_SIZE`: the length each tree node's list is kept
///   near. Lists twice as long are split and pushed down the tree.
///   Must be between 1 and 256.
/// * `M`: the lock guarding each tree node. Any
///   [`lock_api::RawMutex`](parking_lot::lock_api::RawMutex) works; the default is a [`SpinLock`].
///
/// # Examples
///
/// ```
/// use concurrent_mound::RelaxedPriorityQueue;
///
/// let queue = RelaxedPriorityQueue::<usize, true>::default();
///
/// std::thread::scope(|s| {
///     for t in 0..4 {
///         let producer = queue.clone();
///         s.spawn(move || {
///             for i in 0..100 {
///                 producer.push(t * 100 + i);
///             }
///         });
///     }
///
///     let consumer = queue.clone();
///     s.spawn(move || {
///         let sum: usize = (0..400).map(|_| consumer.pop()).sum();
///         assert_eq!(sum, (0..400).sum());
///     });
/// });
///
/// assert!(queue.is_empty());
/// ```
pub struct RelaxedPriorityQueue<
    T,
    const MAY_BLOCK: bool = false,
    const SUPPORTS_SIZE: bool = false,
    const POP_BATCH: usize = 16,
    const LIST_TARGET_SIZE: usize = 25,
    M = SpinLock,
> where
    T: 'static + Clone + Ord + Send + Sync,
    M: RawMutex,
{
    // epoch-based reclamation
    ebr: Ebr<Box<Node<T>>, LOCAL_GC_BUFFER_SIZE>,
    // everything shared between handles
    inner: Arc<Inner<T, M, POP_BATCH, LIST_TARGET_SIZE>>,
}

struct Inner<T, M, const POP_BATCH: usize, const LIST_TARGET_SIZE: usize> {
    mound: Mound<T, M, POP_BATCH, LIST_TARGET_SIZE>,
    // only present for queues that may block
    blocking: Option<Blocking>,
    pushed: CachePadded<AtomicUsize>,
    popped: CachePadded<AtomicUsize>,
    #[cfg(feature = "timing")]
    slowest_op: AtomicU64,
    #[cfg(feature = "timing")]
    fastest_op: AtomicU64,
}

#[cfg(feature = "timing")]
impl<T, M, const POP_BATCH: usize, const LIST_TARGET_SIZE: usize> Drop
    for Inner<T, M, POP_BATCH, LIST_TARGET_SIZE>
{
    fn drop(&mut self) {
        self.print_timing();
    }
}

#[cfg(feature = "timing")]
impl<T, M, const POP_BATCH: usize, const LIST_TARGET_SIZE: usize>
    Inner<T, M, POP_BATCH, LIST_TARGET_SIZE>
{
    fn print_timing(&self) {
        println!(
            "min : {:?}",
            Duration::from_nanos(self.fastest_op.load(Ordering::Acquire))
        );
        println!(
            "max : {:?}",
            Duration::from_nanos(self.slowest_op.load(Ordering::Acquire))
        );
    }

    fn record_timing(&self, time: Duration) {
        let nanos = u64::try_from(time.as_nanos()).unwrap_or(u64::MAX);
        if nanos < self.fastest_op.load(Ordering::Relaxed) {
            self.fastest_op.fetch_min(nanos, Ordering::Relaxed);
        }
        if nanos > self.slowest_op.load(Ordering::Relaxed) {
            self.slowest_op.fetch_max(nanos, Ordering::Relaxed);
        }
    }
}

impl<
        T,
        const MAY_BLOCK: bool,
        const SUPPORTS_SIZE: bool,
        const POP_BATCH: usize,
        const LIST_TARGET_SIZE: usize,
        M,
    > Default for RelaxedPriorityQueue<T, MAY_BLOCK, SUPPORTS_SIZE, POP_BATCH, LIST_TARGET_SIZE, M>
where
    T: 'static + Clone + Ord + Send + Sync,
    M: RawMutex,
{
    fn default() -> RelaxedPriorityQueue<T, MAY_BLOCK, SUPPORTS_SIZE, POP_BATCH, LIST_TARGET_SIZE, M> {
        assert!(
            POP_BATCH <= 256,
            "RelaxedPriorityQueue POP_BATCH must be at most 256"
        );
        assert!(
            (1..=256).contains(&LIST_TARGET_SIZE),
            "RelaxedPriorityQueue LIST_TARGET_SIZE must be between 1 and 256"
        );

        let inner = Arc::new(Inner {
            mound: Mound::new(),
            blocking: MAY_BLOCK.then(Blocking::default),
            pushed: CachePadded::new(AtomicUsize::new(0)),
            popped: CachePadded::new(AtomicUsize::new(0)),
            #[cfg(feature = "timing")]
            slowest_op: u64::MIN.into(),
            #[cfg(feature = "timing")]
            fastest_op: u64::MAX.into(),
        });

        RelaxedPriorityQueue {
            ebr: Ebr::default(),
            inner,
        }
    }
}

impl<
        T,
        const MAY_BLOCK: bool,
        const SUPPORTS_SIZE: bool,
        const POP_BATCH: usize,
        const LIST_TARGET_SIZE: usize,
        M,
    > Clone for RelaxedPriorityQueue<T, MAY_BLOCK, SUPPORTS_SIZE, POP_BATCH, LIST_TARGET_SIZE, M>
where
    T: 'static + Clone + Ord + Send + Sync,
    M: RawMutex,
{
    fn clone(&self) -> Self {
        RelaxedPriorityQueue {
            ebr: self.ebr.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<
        T,
        const MAY_BLOCK: bool,
        const SUPPORTS_SIZE: bool,
        const POP_BATCH: usize,
        const LIST_TARGET_SIZE: usize,
        M,
    > fmt::Debug for RelaxedPriorityQueue<T, MAY_BLOCK, SUPPORTS_SIZE, POP_BATCH, LIST_TARGET_SIZE, M>
where
    T: 'static + fmt::Debug + Clone + Ord + Send + Sync,
    M: RawMutex,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RelaxedPriorityQueue ")?;
        f.debug_list().entries(self.snapshot()).finish()
    }
}

impl<
        T,
        const MAY_BLOCK: bool,
        const SUPPORTS_SIZE: bool,
        const POP_BATCH: usize,
        const LIST_TARGET_SIZE: usize,
        M,
    > RelaxedPriorityQueue<T, MAY_BLOCK, SUPPORTS_SIZE, POP_BATCH, LIST_TARGET_SIZE, M>
where
    T: 'static + Clone + Ord + Send + Sync,
    M: RawMutex,
{
    /// Creates an empty queue. Equivalent to [`Default::default`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value to the queue.
    ///
    /// # Examples
    /// ```
    /// let queue = concurrent_mound::RelaxedPriorityQueue::<&str>::default();
    /// queue.push("low");
    /// queue.push("urgent");
    /// assert_eq!(queue.pop(), "urgent");
    /// ```
    pub fn push(&self, value: T) {
        #[cfg(feature = "timing")]
        let before = Instant::now();

        let guard = self.ebr.pin();
        self.inner.mound.push(value, &guard);
        drop(guard);

        if SUPPORTS_SIZE {
            self.inner.pushed.fetch_add(1, Ordering::Release);
        }

        if let Some(blocking) = &self.inner.blocking {
            blocking.producer_done();
        }

        #[cfg(feature = "timing")]
        self.inner.record_timing(before.elapsed());
    }

    /// Removes and returns one of the highest values in the queue.
    ///
    /// If the queue is empty this waits until a value is pushed: by
    /// spinning and yielding, or by sleeping if `MAY_BLOCK` is set.
    ///
    /// With a single thread and `POP_BATCH = 0`, values come out in
    /// exact priority order. Otherwise a pop may return a value slightly
    /// lower than the current maximum.
    pub fn pop(&self) -> T {
        #[cfg(feature = "timing")]
        let before = Instant::now();

        if let Some(blocking) = &self.inner.blocking {
            blocking.consumer_wait();
        }

        let value = self.pop_inner();

        if SUPPORTS_SIZE {
            self.inner.popped.fetch_add(1, Ordering::Release);
        }

        #[cfg(feature = "timing")]
        self.inner.record_timing(before.elapsed());

        value
    }

    fn pop_inner(&self) -> T {
        if let Some(value) = self.try_pop_from_shared_buffer() {
            return value;
        }

        let backoff = Backoff::new();
        loop {
            let mut guard = self.ebr.pin();
            if let Some(value) = self.inner.mound.pop_from_root(&mut guard) {
                return value;
            }
            drop(guard);

            self.wait_until_not_empty(&backoff);

            if let Some(value) = self.try_pop_from_shared_buffer() {
                return value;
            }
        }
    }

    fn try_pop_from_shared_buffer(&self) -> Option<T> {
        if POP_BATCH == 0 {
            return None;
        }

        let mut guard = self.ebr.pin();
        self.inner.mound.pop_from_shared_buffer(&mut guard)
    }

    fn wait_until_not_empty(&self, backoff: &Backoff) {
        if !self.inner.mound.is_empty() {
            // the root is busy, not empty
            backoff.spin();
            return;
        }

        while self.inner.mound.is_empty() {
            backoff.snooze();
        }
        backoff.reset();
    }

    /// An estimate of the number of values in the queue. Exact when no
    /// other thread is pushing or popping.
    ///
    /// Only meaningful when `SUPPORTS_SIZE` is set; otherwise no counting
    /// happens and this returns 0 (and panics in debug builds).
    ///
    /// # Examples
    /// ```
    /// let queue = concurrent_mound::RelaxedPriorityQueue::<u32, false, true>::default();
    /// queue.push(1);
    /// queue.push(2);
    /// assert_eq!(queue.len(), 2);
    /// queue.pop();
    /// assert_eq!(queue.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        debug_assert!(
            SUPPORTS_SIZE,
            "RelaxedPriorityQueue::len requires SUPPORTS_SIZE"
        );
        let popped = self.inner.popped.load(Ordering::Acquire);
        let pushed = self.inner.pushed.load(Ordering::Acquire);
        pushed.saturating_sub(popped)
    }

    /// Returns `true` if the queue held no values at the moment it was
    /// checked.
    pub fn is_empty(&self) -> bool {
        self.inner.mound.is_empty()
    }

    /// The number of tree levels allocated so far. The tree only ever
    /// grows.
    pub fn height(&self) -> usize {
        self.inner.mound.height()
    }

    /// Copies out the values currently in the queue, highest first,
    /// without removing them.
    ///
    /// Tree nodes are read one at a time, so this is not an atomic
    /// snapshot while other threads are using the queue: values that move
    /// during the walk may be missed or seen twice.
    pub fn snapshot(&self) -> Vec<T> {
        let guard = self.ebr.pin();
        self.inner.mound.snapshot(&guard)
    }
}

impl<
        T,
        const MAY_BLOCK: bool,
        const SUPPORTS_SIZE: bool,
        const POP_BATCH: usize,
        const LIST_TARGET_SIZE: usize,
        M,
    > FromIterator<T>
    for RelaxedPriorityQueue<T, MAY_BLOCK, SUPPORTS_SIZE, POP_BATCH, LIST_TARGET_SIZE, M>
where
    T: 'static + Clone + Ord + Send + Sync,
    M: RawMutex,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let queue = Self::default();
        for value in iter {
            queue.push(value);
        }
        queue
    }
}

impl<
        T,
        const MAY_BLOCK: bool,
        const SUPPORTS_SIZE: bool,
        const POP_BATCH: usize,
        const LIST_TARGET_SIZE: usize,
        M,
    > Extend<T> for RelaxedPriorityQueue<T, MAY_BLOCK, SUPPORTS_SIZE, POP_BATCH, LIST_TARGET_SIZE, M>
where
    T: 'static + Clone + Ord + Send + Sync,
    M: RawMutex,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push(value);
        }
    }
}

const fn _test_impls() {
    const fn send<T: Send>() {}
    const fn clone<T: Clone>() {}
    send::<RelaxedPriorityQueue<usize>>();
    clone::<RelaxedPriorityQueue<usize>>();
    send::<RelaxedPriorityQueue<String, true, true, 0, 4, parking_lot::RawMutex>>();
}

#[cfg(test)]
mod tests {
    use std::collections::BinaryHeap;
    use std::time::Duration;

    use rand::{seq::SliceRandom, thread_rng, Rng};

    use super::*;

    type StrictQueue = RelaxedPriorityQueue<u64, false, true, 0, 4>;

    #[test]
    fn basic_queue() {
        let queue = RelaxedPriorityQueue::<u64>::default();

        for value in [5, 3, 8, 1, 9, 2] {
            queue.push(value);
        }

        for expected in [9, 8, 5, 3, 2, 1] {
            assert_eq!(queue.pop(), expected);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn strict_matches_binary_heap() {
        let queue = StrictQueue::default();
        let mut model = BinaryHeap::new();
        let mut rng = thread_rng();

        for _ in 0..20_000 {
            if model.is_empty() || rng.gen_ratio(3, 5) {
                let value = rng.gen_range(0..1_000);
                queue.push(value);
                model.push(value);
            } else {
                assert_eq!(Some(queue.pop()), model.pop());
            }
            assert_eq!(queue.len(), model.len());
        }

        assert!(queue.inner.mound.is_heap());

        while let Some(expected) = model.pop() {
            assert_eq!(queue.pop(), expected);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn relaxed_pops_every_value() {
        let queue = RelaxedPriorityQueue::<u64>::default();

        let mut values: Vec<u64> = (0..10_000).collect();
        values.shuffle(&mut thread_rng());
        for value in &values {
            queue.push(*value);
        }

        assert!(queue.inner.mound.is_heap());

        let mut popped: Vec<u64> = (0..values.len()).map(|_| queue.pop()).collect();
        assert!(queue.is_empty());

        popped.sort_unstable();
        values.sort_unstable();
        assert_eq!(popped, values);
    }

    #[test]
    fn duplicates_and_interleaving() {
        let queue = RelaxedPriorityQueue::<u8, false, true, 4, 2>::default();
        let mut expected_sum = 0_u64;
        let mut popped_sum = 0_u64;

        for round in 0..100_u64 {
            for value in 0..16_u8 {
                queue.push(value % 3);
                expected_sum += u64::from(value % 3);
            }
            for _ in 0..(round % 16) {
                popped_sum += u64::from(queue.pop());
            }
            assert!(queue.inner.mound.is_heap());
        }

        while !queue.is_empty() {
            popped_sum += u64::from(queue.pop());
        }

        assert_eq!(queue.len(), 0);
        assert_eq!(popped_sum, expected_sum);
    }

    #[test]
    fn tracks_len() {
        let queue = RelaxedPriorityQueue::<u32, false, true>::default();
        assert_eq!(queue.len(), 0);
        assert!(queue.is_empty());

        for i in 0..100 {
            queue.push(i);
        }
        assert_eq!(queue.len(), 100);
        assert!(!queue.is_empty());

        for _ in 0..40 {
            queue.pop();
        }
        assert_eq!(queue.len(), 60);

        for _ in 0..60 {
            queue.pop();
        }
        assert_eq!(queue.len(), 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn stays_empty_until_next_push() {
        let queue = RelaxedPriorityQueue::<u32, false, true, 8, 3>::default();
        let other = queue.clone();

        for round in 1..=4_u32 {
            // a refill larger than the shared buffer, so the last pops
            // come from both the buffer and the root
            for value in 0..round * 50 {
                queue.push(value);
            }
            assert!(!queue.is_empty());
            assert!(!other.is_empty());

            let mut popped: Vec<u32> = (0..round * 50).map(|_| other.pop()).collect();
            popped.sort_unstable();
            assert_eq!(popped, (0..round * 50).collect::<Vec<_>>());

            for _ in 0..3 {
                assert!(queue.is_empty());
                assert!(other.is_empty());
                assert_eq!(queue.len(), 0);
                std::thread::sleep(Duration::from_millis(5));
            }
        }

        queue.push(7);
        assert!(!other.is_empty());
        assert_eq!(other.pop(), 7);
        assert!(queue.is_empty());
    }

    #[test]
    fn grows_and_stays_ordered() {
        let queue = RelaxedPriorityQueue::<u64, false, false, 0, 2>::default();
        assert_eq!(queue.height(), 1);

        for i in 0..1_000 {
            queue.push(i);
        }
        assert!(queue.height() > 1);
        assert!(queue.inner.mound.is_heap());

        for expected in (0..1_000).rev() {
            assert_eq!(queue.pop(), expected);
        }

        // the tree never shrinks
        assert!(queue.height() > 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn low_values_into_a_deep_tree() {
        let queue = RelaxedPriorityQueue::<u64, false, true, 0, 1>::default();
        let mut rng = thread_rng();

        let mut values: Vec<u64> = (0..20_000).map(|_| rng.gen_range(1_000..1_000_000)).collect();
        for value in &values {
            queue.push(*value);
        }
        assert!(queue.height() > 4);

        // below every head, so deep leaves with room take them directly
        for value in 0..1_000 {
            queue.push(value);
            values.push(value);
        }
        assert!(queue.inner.mound.is_heap());
        assert_eq!(queue.len(), values.len());

        values.sort_unstable_by(|a, b| b.cmp(a));
        for expected in values {
            assert_eq!(queue.pop(), expected);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn snapshot_is_sorted() {
        let queue: RelaxedPriorityQueue<u32> = [4, 7, 1, 7, 3].into_iter().collect();
        assert_eq!(queue.snapshot(), vec![7, 7, 4, 3, 1]);

        assert_eq!(queue.pop(), 7);
        // the second 7 may now sit in the shared buffer
        assert_eq!(queue.snapshot(), vec![7, 4, 3, 1]);
        assert_eq!(
            format!("{queue:?}"),
            "RelaxedPriorityQueue [7, 4, 3, 1]"
        );
    }

    #[test]
    fn extend_pushes_everything() {
        let mut queue = RelaxedPriorityQueue::<u16, false, true>::new();
        queue.extend(0..50);
        queue.extend(vec![100, 200]);
        assert_eq!(queue.len(), 52);
        assert_eq!(queue.pop(), 200);
        assert_eq!(queue.pop(), 100);
    }

    #[test]
    fn parking_lot_node_locks() {
        let queue =
            RelaxedPriorityQueue::<u64, false, false, 0, 8, parking_lot::RawMutex>::default();

        for value in [10, 30, 20] {
            queue.push(value);
        }
        assert_eq!(queue.pop(), 30);
        assert_eq!(queue.pop(), 20);
        assert_eq!(queue.pop(), 10);
    }

    #[test]
    fn owned_values_are_dropped() {
        let queue = RelaxedPriorityQueue::<String>::default();
        for i in 0..500 {
            queue.push(format!("{i:04}"));
        }
        for _ in 0..250 {
            queue.pop();
        }
        // the remaining values are freed along with the queue
        drop(queue);
    }

    #[test]
    fn blocking_pop_waits_for_push() {
        let queue = RelaxedPriorityQueue::<u32, true>::default();

        std::thread::scope(|s| {
            let consumer = queue.clone();
            let handle = s.spawn(move || consumer.pop());

            std::thread::sleep(Duration::from_millis(50));
            queue.push(42);

            assert_eq!(handle.join().unwrap(), 42);
        });

        assert!(queue.is_empty());
    }

    #[test]
    #[should_panic(expected = "POP_BATCH must be at most 256")]
    fn rejects_oversized_batch() {
        let _queue = RelaxedPriorityQueue::<u32, false, false, 257>::default();
    }

    #[test]
    #[should_panic(expected = "LIST_TARGET_SIZE must be between 1 and 256")]
    fn rejects_empty_lists() {
        let _queue = RelaxedPriorityQueue::<u32, false, false, 16, 0>::default();
    }
}
