use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_utils::Backoff;
use parking_lot::lock_api::{GuardSend, RawMutex};

/// A test-and-test-and-set spin lock.
///
/// Tree nodes are locked for very short critical sections (a few pointer
/// swaps), and optimistic readers check the node before they ever try to
/// acquire it, so spinning on a cached load beats parking. This is the
/// default lock for [`RelaxedPriorityQueue`](crate::RelaxedPriorityQueue);
/// any other [`lock_api::RawMutex`](parking_lot::lock_api::RawMutex), such as [`parking_lot::RawMutex`],
/// may be used instead.
#[derive(Debug)]
pub struct SpinLock {
    locked: AtomicBool,
}

unsafe impl RawMutex for SpinLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: SpinLock = SpinLock {
        locked: AtomicBool::new(false),
    };

    type GuardMarker = GuardSend;

    fn lock(&self) {
        let backoff = Backoff::new();
        while !self.try_lock() {
            while self.locked.load(Ordering::Relaxed) {
                backoff.snooze();
            }
        }
    }

    fn try_lock(&self) -> bool {
        !self.locked.load(Ordering::Relaxed)
            && self
                .locked
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
    }

    unsafe fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}
