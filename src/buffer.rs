use std::ptr;
use std::sync::atomic::{AtomicIsize, AtomicPtr, Ordering};

use crossbeam_utils::{Backoff, CachePadded};

use crate::mound::Node;

/// A small stack of values taken off the root in one go, so that several
/// consumers can split a batch with a single `fetch_sub` each instead of
/// queueing up on the root lock.
///
/// Only the thread holding the root lock refills the buffer, and it only
/// does so once `top` has gone negative. Consumers claim slot `i` by
/// decrementing `top` from `i`, then vacate it; the refiller waits for
/// stragglers to vacate a slot before reusing it.
pub(crate) struct SharedBuffer<T> {
    slots: Box<[CachePadded<AtomicPtr<Node<T>>>]>,
    top: CachePadded<AtomicIsize>,
}

impl<T> SharedBuffer<T> {
    pub(crate) fn new(capacity: usize) -> SharedBuffer<T> {
        SharedBuffer {
            slots: (0..capacity)
                .map(|_| CachePadded::new(AtomicPtr::new(ptr::null_mut())))
                .collect(),
            top: CachePadded::new(AtomicIsize::new(-1)),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.top.load(Ordering::Acquire) < 0
    }

    /// Moves up to `capacity` nodes off the front of the list starting at
    /// `head` into the buffer, highest value into the highest slot so that
    /// it is popped first. Returns the rest of the list and the number of
    /// nodes moved.
    ///
    /// # Safety
    ///
    /// The caller must hold the root lock, must own the list at `head`
    /// (which holds at least `len` nodes) and must have observed the
    /// buffer empty while holding that lock.
    pub(crate) unsafe fn fill(&self, mut head: *mut Node<T>, len: usize) -> (*mut Node<T>, usize) {
        let n = len.min(self.capacity());

        for slot in self.slots[..n].iter().rev() {
            let backoff = Backoff::new();
            while !slot.load(Ordering::Acquire).is_null() {
                backoff.spin();
            }
            debug_assert!(!head.is_null());
            slot.store(head, Ordering::Relaxed);
            head = (*head).next;
        }

        if n > 0 {
            #[allow(clippy::cast_possible_wrap)]
            self.top.store(n as isize - 1, Ordering::Release);
        }

        (head, n)
    }

    /// Claims the node on top of the buffer, if any. The claimed node is
    /// no longer reachable through the buffer, but may still be read by
    /// threads that saw it at the root, so it must be retired rather
    /// than freed.
    pub(crate) fn claim(&self) -> Option<*mut Node<T>> {
        if self.is_empty() {
            return None;
        }

        let loc = self.top.fetch_sub(1, Ordering::AcqRel);
        let index = usize::try_from(loc).ok()?;

        let slot = &self.slots[index];
        let node = slot.load(Ordering::Acquire);
        debug_assert!(!node.is_null(), "claimed an unfilled shared buffer slot");
        slot.store(ptr::null_mut(), Ordering::Release);

        Some(node)
    }

    /// Nodes still sitting in the buffer, for teardown and snapshots.
    pub(crate) fn occupied(&self) -> impl Iterator<Item = *mut Node<T>> + '_ {
        self.slots
            .iter()
            .map(|slot| slot.load(Ordering::Acquire))
            .filter(|node| !node.is_null())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_then_claim_highest_first() {
        let head = [50_u32, 40, 30, 20, 10]
            .iter()
            .rev()
            .fold(ptr::null_mut(), |next, value| {
                Box::into_raw(Box::new(Node {
                    next,
                    value: *value,
                }))
            });

        let buffer = SharedBuffer::new(3);
        assert!(buffer.is_empty());
        assert!(buffer.claim().is_none());

        let (rest, moved) = unsafe { buffer.fill(head, 5) };
        assert_eq!(moved, 3);
        assert_eq!(buffer.occupied().count(), 3);

        let mut claimed = vec![];
        while let Some(node) = buffer.claim() {
            claimed.push(unsafe { Box::from_raw(node) }.value);
        }
        assert_eq!(claimed, vec![50, 40, 30]);
        assert!(buffer.is_empty());
        assert_eq!(buffer.occupied().count(), 0);

        let mut rest_values = vec![];
        let mut cursor = rest;
        while !cursor.is_null() {
            let node = unsafe { Box::from_raw(cursor) };
            rest_values.push(node.value);
            cursor = node.next;
        }
        assert_eq!(rest_values, vec![20, 10]);
    }
}
