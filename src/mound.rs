//! The mound: a binary tree laid out as one array per level, where every
//! tree node owns a list of values sorted from highest to lowest. The
//! heads of the lists (approximately) satisfy the heap property, so the
//! highest value in the structure sits at the front of the root's list.
//!
//! Tree nodes are never freed while the mound is alive, so they can be
//! addressed by `(level, index)` and inspected without any protection.
//! Value nodes move between lists and are freed after being popped, so a
//! thread may only follow a `head` pointer while pinned in the epoch-based
//! reclamation system.
//!
//! Locking discipline:
//!
//! * a tree node's `head` and `size` only change while its lock is held
//! * blocking `lock` calls go from parent to child, never upward
//! * insertion takes a parent and its child with `try_lock`, and if
//!   either is busy the whole push starts over
//! * a held lock is a [`Locked`] value that unlocks on drop, and it is
//!   moved into whichever function becomes responsible for releasing it

use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU32, AtomicUsize, Ordering};
use std::sync::OnceLock;

use crossbeam_utils::{Backoff, CachePadded};
use ebr::Guard;
use parking_lot::lock_api::RawMutex;
use rand::{thread_rng, Rng};

use crate::buffer::SharedBuffer;
use crate::{debug_delay, LOCAL_GC_BUFFER_SIZE};

pub(crate) const MAX_LEVELS: usize = 32;

// Leaves are only force-inserted into once the tree is deeper than this.
#[cfg(not(feature = "fuzz_constants"))]
const LEVEL_FOR_FORCE_INSERT: u32 = 3;
#[cfg(feature = "fuzz_constants")]
const LEVEL_FOR_FORCE_INSERT: u32 = 1;

// Insertions at or below this level trade their value for the tail of the
// parent's list.
#[cfg(not(feature = "fuzz_constants"))]
const LEVEL_FOR_TRAVERSE_PARENT: u32 = 7;
#[cfg(feature = "fuzz_constants")]
const LEVEL_FOR_TRAVERSE_PARENT: u32 = 2;

pub(crate) type ReclaimGuard<'a, T> = Guard<'a, Box<Node<T>>, LOCAL_GC_BUFFER_SIZE>;

#[derive(Debug)]
pub(crate) struct Node<T> {
    pub(crate) next: *mut Node<T>,
    pub(crate) value: T,
}

unsafe impl<T: Send> Send for Node<T> {}

struct TreeNode<T, M> {
    head: AtomicPtr<Node<T>>,
    size: AtomicUsize,
    lock: CachePadded<M>,
}

impl<T, M> TreeNode<T, M> {
    fn size(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }
}

impl<T, M: RawMutex> TreeNode<T, M> {
    fn new() -> TreeNode<T, M> {
        TreeNode {
            head: AtomicPtr::new(ptr::null_mut()),
            size: AtomicUsize::new(0),
            lock: CachePadded::new(M::INIT),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Position {
    level: u32,
    index: u32,
}

impl Position {
    const ROOT: Position = Position { level: 0, index: 0 };

    const fn is_root(self) -> bool {
        self.level == 0
    }

    const fn parent(self) -> Position {
        Position {
            level: self.level - 1,
            index: self.index / 2,
        }
    }

    const fn left(self) -> Position {
        Position {
            level: self.level + 1,
            index: self.index * 2,
        }
    }

    const fn right(self) -> Position {
        Position {
            level: self.level + 1,
            index: self.index * 2 + 1,
        }
    }
}

/// A tree node whose lock is held by the owner of this value.
struct Locked<'a, T, M: RawMutex> {
    node: &'a TreeNode<T, M>,
    pos: Position,
}

impl<T, M: RawMutex> Drop for Locked<'_, T, M> {
    fn drop(&mut self) {
        unsafe { self.node.lock.unlock() }
    }
}

impl<T, M: RawMutex> Locked<'_, T, M> {
    fn head(&self) -> *mut Node<T> {
        self.node.head.load(Ordering::Acquire)
    }

    fn set_head(&self, head: *mut Node<T>) {
        self.node.head.store(head, Ordering::Release);
    }

    fn size(&self) -> usize {
        self.node.size()
    }

    fn set_size(&self, size: usize) {
        self.node.size.store(size, Ordering::Relaxed);
    }

    /// `None` for an empty list, which orders below every value.
    fn head_value(&self) -> Option<&T> {
        unsafe { self.head().as_ref() }.map(|node| &node.value)
    }

    fn clear(&self) {
        self.set_head(ptr::null_mut());
        self.set_size(0);
    }

    /// Merges a sorted list of `len` nodes into this node's list.
    unsafe fn merge_in(&self, list: *mut Node<T>, len: usize)
    where
        T: Ord,
    {
        self.set_head(merge_lists(self.head(), list));
        self.set_size(self.size() + len);
    }

    /// Links `new` into this node's list in sorted position, possibly as
    /// the new head. The caller accounts for the size.
    unsafe fn insert_sorted(&self, new: *mut Node<T>)
    where
        T: Ord,
    {
        let head = self.head();
        if head.is_null() || (*head).value <= (*new).value {
            (*new).next = head;
            self.set_head(new);
            return;
        }

        let mut cursor = head;
        while !(*cursor).next.is_null() && (*(*cursor).next).value >= (*new).value {
            cursor = (*cursor).next;
        }
        (*new).next = (*cursor).next;
        (*cursor).next = new;
    }
}

fn swap_lists<T, M: RawMutex>(a: &Locked<'_, T, M>, b: &Locked<'_, T, M>) {
    let (a_head, a_size) = (a.head(), a.size());
    a.set_head(b.head());
    a.set_size(b.size());
    b.set_head(a_head);
    b.set_size(a_size);
}

/// Merges two lists sorted from highest to lowest.
unsafe fn merge_lists<T: Ord>(mut a: *mut Node<T>, mut b: *mut Node<T>) -> *mut Node<T> {
    let mut head: *mut Node<T> = ptr::null_mut();
    let mut tail: *mut *mut Node<T> = ptr::addr_of_mut!(head);

    while !a.is_null() && !b.is_null() {
        let taken = if (*a).value >= (*b).value {
            let taken = a;
            a = (*a).next;
            taken
        } else {
            let taken = b;
            b = (*b).next;
            taken
        };
        *tail = taken;
        tail = ptr::addr_of_mut!((*taken).next);
    }

    *tail = if a.is_null() { b } else { a };
    head
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InsertPath {
    /// The leaf has room and a head at least as high as the value, so the
    /// value can go behind the head with only the leaf locked.
    Fast,
    /// The value must be placed on the root-to-leaf path by binary search
    /// and validated against the parent under both locks.
    Validated,
}

pub(crate) struct Mound<T, M, const POP_BATCH: usize, const LIST_TARGET_SIZE: usize> {
    levels: [OnceLock<Box<[TreeNode<T, M>]>>; MAX_LEVELS],
    bottom: CachePadded<AtomicU32>,
    grow_guard: CachePadded<AtomicU32>,
    buffer: SharedBuffer<T>,
}

impl<T, M, const POP_BATCH: usize, const LIST_TARGET_SIZE: usize>
    Mound<T, M, POP_BATCH, LIST_TARGET_SIZE>
{
    fn bottom_level(&self) -> u32 {
        self.bottom.load(Ordering::Acquire)
    }

    fn is_leaf(&self, pos: Position) -> bool {
        pos.level == self.bottom_level()
    }

    fn tree_node(&self, pos: Position) -> &TreeNode<T, M> {
        let level = self.levels[pos.level as usize]
            .get()
            .expect("levels are allocated before they are published as the bottom");
        &level[pos.index as usize]
    }

    /// The number of allocated levels.
    pub(crate) fn height(&self) -> usize {
        self.bottom_level() as usize + 1
    }

    fn is_mound_empty(&self) -> bool {
        self.tree_node(Position::ROOT).size() == 0
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.is_mound_empty() && (POP_BATCH == 0 || self.buffer.is_empty())
    }
}

impl<T, M, const POP_BATCH: usize, const LIST_TARGET_SIZE: usize>
    Mound<T, M, POP_BATCH, LIST_TARGET_SIZE>
where
    T: 'static + Clone + Ord + Send + Sync,
    M: RawMutex,
{
    const PRUNING_SIZE: usize = LIST_TARGET_SIZE * 2;
    const MERGING_SIZE: usize = LIST_TARGET_SIZE;

    pub(crate) fn new() -> Mound<T, M, POP_BATCH, LIST_TARGET_SIZE> {
        Mound {
            levels: core::array::from_fn(|level| {
                if level == 0 {
                    OnceLock::from(Self::new_level(1))
                } else {
                    OnceLock::new()
                }
            }),
            bottom: CachePadded::new(AtomicU32::new(0)),
            grow_guard: CachePadded::new(AtomicU32::new(0)),
            buffer: SharedBuffer::new(POP_BATCH),
        }
    }

    fn new_level(len: usize) -> Box<[TreeNode<T, M>]> {
        (0..len).map(|_| TreeNode::new()).collect()
    }

    fn lock(&self, pos: Position) -> Locked<'_, T, M> {
        let node = self.tree_node(pos);
        node.lock.lock();
        Locked { node, pos }
    }

    fn try_lock(&self, pos: Position) -> Option<Locked<'_, T, M>> {
        if debug_delay() {
            return None;
        }

        let node = self.tree_node(pos);
        if node.lock.try_lock() {
            Some(Locked { node, pos })
        } else {
            None
        }
    }

    /// Reads the head value of a node without its lock. The answer may be
    /// stale by the time it is used, but the node behind it stays alive
    /// for as long as `guard` is pinned.
    fn optimistic_value<'g>(
        &'g self,
        pos: Position,
        _guard: &'g ReclaimGuard<'_, T>,
    ) -> Option<&'g T> {
        let head = self.tree_node(pos).head.load(Ordering::Acquire);
        unsafe { head.as_ref() }.map(|node| &node.value)
    }

    /// Allocates the level below `bottom`, unless somebody else already did.
    fn grow(&self, bottom: u32) {
        let backoff = Backoff::new();
        loop {
            if self.grow_guard.fetch_add(1, Ordering::AcqRel) == 0 {
                break;
            }
            if bottom != self.bottom_level() {
                return;
            }
            backoff.snooze();
        }

        if bottom != self.bottom_level() {
            self.grow_guard.store(0, Ordering::Release);
            return;
        }

        let new_bottom = bottom + 1;
        assert!(
            (new_bottom as usize) < MAX_LEVELS,
            "mound cannot grow past {MAX_LEVELS} levels"
        );

        let leaves = 1_usize << new_bottom;
        if self.levels[new_bottom as usize]
            .set(Self::new_level(leaves))
            .is_err()
        {
            unreachable!("level {new_bottom} allocated twice");
        }
        self.bottom.store(new_bottom, Ordering::Release);
        self.grow_guard.store(0, Ordering::Release);

        tracing::debug!(level = new_bottom, leaves, "mound grew a level");
    }

    pub(crate) fn push(&self, value: T, guard: &ReclaimGuard<'_, T>) {
        let new = Box::into_raw(Box::new(Node {
            next: ptr::null_mut(),
            value,
        }));
        let mut seed = thread_rng().gen::<u32>() % (1 << 21);

        loop {
            // `new` stays private to this thread until an insert succeeds
            let value = unsafe { &(*new).value };
            let (pos, path) = self.select_position(value, &mut seed, guard);

            let inserted = unsafe {
                match path {
                    InsertPath::Fast => self.force_insert(pos, new, guard),
                    InsertPath::Validated => {
                        let pos = self.binary_search_position(pos, value, guard);
                        self.regular_insert(pos, new)
                    }
                }
            };

            if inserted {
                return;
            }
        }
    }

    /// Probes leaves starting from a pseudo-random one, growing the tree
    /// when no leaf on the bottom level can take the value.
    fn select_position(
        &self,
        value: &T,
        seed: &mut u32,
        guard: &ReclaimGuard<'_, T>,
    ) -> (Position, InsertPath) {
        loop {
            let bottom = self.bottom_level();
            let bound = 1_u32 << bottom;
            let steps = 1 + bottom * bottom;
            *seed = seed.wrapping_add(1);
            let start = *seed % bound;

            for i in 0..steps {
                let index = (start + i) % bound;
                let pos = Position {
                    level: bottom,
                    index,
                };

                if self.optimistic_value(pos, guard) <= Some(value) {
                    *seed = index + 1;
                    return (pos, InsertPath::Validated);
                } else if bottom > LEVEL_FOR_FORCE_INSERT
                    && self.tree_node(pos).size() < LIST_TARGET_SIZE
                {
                    *seed = index + 1;
                    return (pos, InsertPath::Fast);
                }

                if bottom != self.bottom_level() {
                    break;
                }
            }

            if bottom == self.bottom_level() {
                self.grow(bottom);
            }
        }
    }

    /// Inserts `new` behind the head of a node that has not reached its
    /// target size yet. Only the node itself is locked, which is fine
    /// because the head, and with it the heap property, does not change.
    unsafe fn force_insert(
        &self,
        pos: Position,
        new: *mut Node<T>,
        guard: &ReclaimGuard<'_, T>,
    ) -> bool {
        debug_assert!(!pos.is_root());

        let value = &(*new).value;
        let backoff = Backoff::new();
        let node = loop {
            if let Some(node) = self.try_lock(pos) {
                break node;
            }
            let still_fits = self.tree_node(pos).size() < LIST_TARGET_SIZE
                && self.optimistic_value(pos, guard) >= Some(value);
            if !still_fits {
                return false;
            }
            backoff.spin();
        };

        let size = node.size();
        let head = node.head();
        if head.is_null() || (*head).value < *value || size >= LIST_TARGET_SIZE {
            return false;
        }

        let mut cursor = head;
        while !(*cursor).next.is_null() && (*(*cursor).next).value > *value {
            cursor = (*cursor).next;
        }
        (*new).next = (*cursor).next;
        (*cursor).next = new;
        node.set_size(size + 1);

        true
    }

    /// Narrows the root-to-`leaf` path down to the node whose head is at
    /// most `value` while its parent's head is above it.
    fn binary_search_position(
        &self,
        leaf: Position,
        value: &T,
        guard: &ReclaimGuard<'_, T>,
    ) -> Position {
        let mut cur = leaf;
        if cur.is_root() {
            return cur;
        }

        let mut parent = Position::ROOT;
        loop {
            let mid_level = (cur.level + parent.level) / 2;
            let mid = Position {
                level: mid_level,
                index: cur.index >> (cur.level - mid_level),
            };

            if Some(value) < self.optimistic_value(mid, guard) {
                parent = mid;
            } else {
                cur = mid;
            }

            if mid.is_root() || (parent.level + 1 == cur.level && !parent.is_root()) {
                return cur;
            }
        }
    }

    /// Makes `new` the head of the node at `pos` after re-checking, under
    /// the node's and its parent's locks, that this keeps the heap order.
    unsafe fn regular_insert(&self, pos: Position, new: *mut Node<T>) -> bool {
        let value = &(*new).value;

        if pos.is_root() {
            let root = self.lock(pos);
            if root.head_value() > Some(value) {
                return false;
            }

            let size = root.size();
            (*new).next = root.head();
            root.set_head(new);
            root.set_size(size + 1);
            if size > Self::PRUNING_SIZE {
                self.start_pruning(root);
            }
            return true;
        }

        let Some(parent) = self.try_lock(pos.parent()) else {
            return false;
        };
        let Some(node) = self.try_lock(pos) else {
            return false;
        };

        if !(parent.head_value() > Some(value) && node.head_value() <= Some(value)) {
            return false;
        }

        let size = node.size();
        if pos.level >= LEVEL_FOR_TRAVERSE_PARENT {
            let demoted = Self::exchange_with_parent_tail(&parent, new);
            drop(parent);
            node.insert_sorted(demoted);
        } else {
            drop(parent);
            (*new).next = node.head();
            node.set_head(new);
        }
        node.set_size(size + 1);

        if size > Self::PRUNING_SIZE {
            self.start_pruning(node);
        }
        true
    }

    /// Puts `new` into the parent's list and hands back the parent's last
    /// node instead, when that node is lower than `new`. Keeps the parent's
    /// size unchanged and the deeper levels holding the lower values.
    unsafe fn exchange_with_parent_tail(
        parent: &Locked<'_, T, M>,
        new: *mut Node<T>,
    ) -> *mut Node<T> {
        let mut cursor = parent.head();
        while !(*cursor).next.is_null() && (*(*cursor).next).value >= (*new).value {
            cursor = (*cursor).next;
        }
        if (*cursor).next.is_null() {
            return new;
        }

        (*new).next = (*cursor).next;
        (*cursor).next = new;

        while !(*(*cursor).next).next.is_null() {
            cursor = (*cursor).next;
        }
        let tail = (*cursor).next;
        (*cursor).next = ptr::null_mut();
        tail
    }

    /// With few leaves in use there is no point widening the tree, so a
    /// leaf keeps its long list until two-thirds of the leaves hold values.
    fn leaf_keeps_list(&self, leaf: &Locked<'_, T, M>) -> bool {
        if leaf.size() <= Self::PRUNING_SIZE {
            return true;
        }

        let bottom = self.bottom_level();
        let leaves = 1_u32 << bottom;
        let threshold = u64::from(leaves) * 2 / 3;

        let mut occupied = 0_u64;
        for index in 0..leaves {
            let pos = Position {
                level: bottom,
                index,
            };
            if self.tree_node(pos).size() != 0 {
                occupied += 1;
                if occupied > threshold {
                    return false;
                }
            }
        }

        true
    }

    /// Cuts an over-long list down to the target size and pushes the rest
    /// into the children, recursively.
    unsafe fn start_pruning(&self, node: Locked<'_, T, M>) {
        let pos = node.pos;
        if self.is_leaf(pos) && self.leaf_keeps_list(&node) {
            return;
        }

        let size = node.size();
        debug_assert!(size > LIST_TARGET_SIZE);

        let mut last_kept = node.head();
        for _ in 1..LIST_TARGET_SIZE {
            last_kept = (*last_kept).next;
        }
        let tail = (*last_kept).next;
        (*last_kept).next = ptr::null_mut();
        let tail_len = size - LIST_TARGET_SIZE;
        node.set_size(LIST_TARGET_SIZE);

        if pos.level != self.bottom_level() {
            let left_len = (tail_len + 1) / 2;
            let right_len = tail_len - left_len;

            let to_left = tail;
            let mut last_left = tail;
            for _ in 1..left_len {
                last_left = (*last_left).next;
            }
            let to_right = (*last_left).next;
            (*last_left).next = ptr::null_mut();

            let left = (left_len != 0).then(|| {
                let left = self.lock(pos.left());
                left.merge_in(to_left, left_len);
                left
            });
            let right = (right_len != 0).then(|| {
                let right = self.lock(pos.right());
                right.merge_in(to_right, right_len);
                right
            });
            drop(node);

            if let Some(left) = left {
                if left.size() > Self::PRUNING_SIZE {
                    self.start_pruning(left);
                }
            }
            if let Some(right) = right {
                if right.size() > Self::PRUNING_SIZE {
                    self.start_pruning(right);
                }
            }
        } else {
            self.grow(pos.level);

            let child_pos = if LIST_TARGET_SIZE % 2 == 1 {
                pos.right()
            } else {
                pos.left()
            };
            let child = self.lock(child_pos);
            child.merge_in(tail, tail_len);
        }
    }

    /// Restores the heap order below a node whose head got smaller, either
    /// by pulling short children up into it or by swapping lists with the
    /// dominant child and continuing there.
    unsafe fn merge_down(&self, node: Locked<'_, T, M>) {
        let pos = node.pos;
        if self.is_leaf(pos) {
            return;
        }

        let left = self.lock(pos.left());
        let right = self.lock(pos.right());

        let (nv, lv, rv) = (node.head_value(), left.head_value(), right.head_value());
        if nv >= lv && nv >= rv {
            return;
        }
        let pull_right = rv >= lv;

        let sum = node.size() + left.size() + right.size();
        if sum <= Self::MERGING_SIZE {
            let children = merge_lists(right.head(), left.head());
            node.set_head(merge_lists(children, node.head()));
            node.set_size(sum);
            left.clear();
            right.clear();
            drop(node);

            self.merge_down(left);
            self.merge_down(right);
            return;
        }

        if pull_right {
            swap_lists(&right, &node);
            drop(node);
            drop(left);
            self.merge_down(right);
        } else {
            swap_lists(&left, &node);
            drop(node);
            drop(right);
            self.merge_down(left);
        }
    }

    /// Called when popping emptied the root. The root keeps its stale
    /// size while the larger child's list moves up, so that the queue never
    /// looks empty halfway through. Returns the child that now needs
    /// repairing, still locked.
    fn defer_setting_root_size<'a>(&'a self, node: Locked<'a, T, M>) -> Option<Locked<'a, T, M>> {
        let pos = node.pos;
        if self.is_leaf(pos) {
            node.set_size(0);
            return None;
        }

        let left = self.lock(pos.left());
        let right = self.lock(pos.right());
        if left.size() == 0 && right.size() == 0 {
            node.set_size(0);
            return None;
        }

        let child = if left.head_value() >= right.head_value() {
            left
        } else {
            right
        };
        swap_lists(&child, &node);
        child.set_size(0);
        Some(child)
    }

    /// Takes the highest value off the root, if the root lock is free.
    pub(crate) fn pop_from_root(&self, guard: &mut ReclaimGuard<'_, T>) -> Option<T> {
        if self.is_mound_empty() {
            return None;
        }

        let root = self.try_lock(Position::ROOT)?;
        unsafe { self.pop_many(root, guard) }
    }

    unsafe fn pop_many(
        &self,
        root: Locked<'_, T, M>,
        guard: &mut ReclaimGuard<'_, T>,
    ) -> Option<T> {
        let head = root.head();
        if head.is_null() {
            return None;
        }

        // consumers are still draining the last batch
        if POP_BATCH > 0 && !self.buffer.is_empty() {
            return None;
        }

        debug_assert!(root.size() > 0);
        let value = (*head).value.clone();
        let rest = (*head).next;
        let mut size = root.size() - 1;

        if POP_BATCH > 0 {
            let (rest, moved) = self.buffer.fill(rest, size);
            root.set_head(rest);
            size -= moved;
        } else {
            root.set_head(rest);
        }

        if size == 0 {
            if let Some(child) = self.defer_setting_root_size(root) {
                self.merge_down(child);
            }
        } else {
            root.set_size(size);
            self.merge_down(root);
        }

        guard.defer_drop(Box::from_raw(head));
        Some(value)
    }

    pub(crate) fn pop_from_shared_buffer(&self, guard: &mut ReclaimGuard<'_, T>) -> Option<T> {
        let node = self.buffer.claim()?;
        let value = unsafe { (*node).value.clone() };
        guard.defer_drop(unsafe { Box::from_raw(node) });
        Some(value)
    }

    /// Copies out every value currently in the queue, highest first. Each
    /// tree node is locked on its own while it is read, so concurrent
    /// operations may cause values to be missed or seen twice.
    pub(crate) fn snapshot(&self, _guard: &ReclaimGuard<'_, T>) -> Vec<T> {
        let mut values: Vec<T> = self
            .buffer
            .occupied()
            .map(|node| unsafe { (*node).value.clone() })
            .collect();

        for level in 0..=self.bottom_level() {
            for index in 0..(1_u32 << level) {
                let node = self.lock(Position { level, index });
                let mut cursor = node.head();
                while let Some(value_node) = unsafe { cursor.as_ref() } {
                    values.push(value_node.value.clone());
                    cursor = value_node.next;
                }
            }
        }

        values.sort_unstable_by(|a, b| b.cmp(a));
        values
    }

    /// Checks that every list is sorted, that its recorded size matches and
    /// that heads obey the heap property. Only meaningful while no other
    /// thread is touching the queue.
    #[cfg(test)]
    pub(crate) fn is_heap(&self) -> bool {
        let bottom = self.bottom_level();
        for level in 0..=bottom {
            for index in 0..(1_u32 << level) {
                let pos = Position { level, index };
                let node = self.tree_node(pos);

                let mut len = 0;
                let mut cursor = node.head.load(Ordering::Acquire);
                while let Some(value_node) = unsafe { cursor.as_ref() } {
                    len += 1;
                    if let Some(next) = unsafe { value_node.next.as_ref() } {
                        if next.value > value_node.value {
                            return false;
                        }
                    }
                    cursor = value_node.next;
                }
                if len != node.size() {
                    return false;
                }

                if level < bottom {
                    let head = unsafe { node.head.load(Ordering::Acquire).as_ref() };
                    for child in [pos.left(), pos.right()] {
                        let child_head =
                            unsafe { self.tree_node(child).head.load(Ordering::Acquire).as_ref() };
                        if child_head.map(|n| &n.value) > head.map(|n| &n.value) {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }
}

impl<T, M, const POP_BATCH: usize, const LIST_TARGET_SIZE: usize> Drop
    for Mound<T, M, POP_BATCH, LIST_TARGET_SIZE>
{
    fn drop(&mut self) {
        for node in self.buffer.occupied() {
            drop(unsafe { Box::from_raw(node) });
        }

        for (depth, level) in self.levels.iter().filter_map(OnceLock::get).enumerate() {
            let mut min_len = usize::MAX;
            let mut max_len = 0;
            let mut total = 0;
            let mut in_use = 0;

            for tree_node in level.iter() {
                let mut len = 0;
                let mut cursor = tree_node.head.load(Ordering::Acquire);
                while !cursor.is_null() {
                    let node: Box<Node<T>> = unsafe { Box::from_raw(cursor) };
                    cursor = node.next;
                    len += 1;
                }

                if len > 0 {
                    in_use += 1;
                    min_len = min_len.min(len);
                    max_len = max_len.max(len);
                    total += len;
                }
            }

            if cfg!(feature = "print_utilization_on_drop") {
                println!("level {depth} nodes {} in use {in_use}", level.len());
                if in_use > 0 {
                    println!(
                        "list length: min: {min_len} max: {max_len} avg: {}",
                        total as f64 / in_use as f64
                    );
                }
            }
        }
    }
}
