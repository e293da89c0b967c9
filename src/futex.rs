//! Ticket-based blocking for consumers.
//!
//! Every successful push draws a producer ticket and every blocking pop
//! draws a consumer ticket. Tickets are hashed onto a small array of
//! words. Each word packs the most recent producer ticket published to
//! it (bits 31..1) together with a flag (bit 0) saying that at least one
//! consumer is asleep on it. A consumer whose ticket has been reached by
//! its word goes ahead without blocking; otherwise it sets the flag and
//! sleeps until a producer publishes a ticket that satisfies it.

use std::sync::atomic::{AtomicU32, Ordering};

use crossbeam_utils::{Backoff, CachePadded};
use parking_lot::{Condvar, Mutex};

const FUTEX_COUNT: usize = 128;

// Consecutive tickets land on words this far apart, keeping hot words off
// neighbouring cache lines.
const STRIDE: usize = 33;

const WAITING_BIT: u32 = 1;
const TICKET_MASK: u32 = 0x7FFF_FFFF;
const HALF_RANGE: u32 = 0x4000_0000;

/// `true` if `ready` has caught up with `ticket`, comparing the low 31
/// bits as serial numbers so that the counters may wrap around.
const fn ticket_reached(ready: u32, ticket: u32) -> bool {
    (ready.wrapping_sub(ticket) & TICKET_MASK) < HALF_RANGE
}

/// `true` if `ready` is strictly newer than `ticket`.
const fn ticket_newer(ready: u32, ticket: u32) -> bool {
    let distance = ready.wrapping_sub(ticket) & TICKET_MASK;
    distance != 0 && distance < HALF_RANGE
}

const fn ready_of(word: u32) -> u32 {
    word >> 1
}

/// A word that threads can sleep on until it changes.
///
/// The waiter re-checks the word while holding `mutex`, and the waker
/// takes `mutex` before notifying, so a change made before `wake` can
/// never slip between the waiter's check and its sleep.
#[derive(Default)]
struct Futex {
    word: AtomicU32,
    mutex: Mutex<()>,
    condvar: Condvar,
}

impl Futex {
    fn wait(&self, expected: u32) {
        let mut held = self.mutex.lock();
        if self.word.load(Ordering::Acquire) == expected {
            self.condvar.wait(&mut held);
        }
    }

    fn wake(&self) {
        let _held = self.mutex.lock();
        self.condvar.notify_all();
    }
}

pub(crate) struct Blocking {
    futexes: Box<[CachePadded<Futex>]>,
    consumer_ticket: CachePadded<AtomicU32>,
    producer_ticket: CachePadded<AtomicU32>,
}

impl Default for Blocking {
    fn default() -> Blocking {
        Blocking {
            futexes: (0..FUTEX_COUNT)
                .map(|_| CachePadded::new(Futex::default()))
                .collect(),
            consumer_ticket: CachePadded::new(AtomicU32::new(1)),
            producer_ticket: CachePadded::new(AtomicU32::new(1)),
        }
    }
}

impl Blocking {
    fn futex(&self, ticket: u32) -> &Futex {
        let loc = (ticket.wrapping_sub(1) as usize).wrapping_mul(STRIDE) & (FUTEX_COUNT - 1);
        &self.futexes[loc]
    }

    fn is_ready(&self, ticket: u32) -> bool {
        let word = self.futex(ticket).word.load(Ordering::Acquire);
        ticket_reached(ready_of(word), ticket & TICKET_MASK)
    }

    /// Called once per completed push. Publishes a fresh producer ticket
    /// and wakes the consumers sleeping on its word, if any.
    pub(crate) fn producer_done(&self) {
        let ticket = self.producer_ticket.fetch_add(1, Ordering::AcqRel) & TICKET_MASK;
        let futex = self.futex(ticket);
        let ready = ticket << 1;

        let mut current = futex.word.load(Ordering::Acquire);
        loop {
            if ticket_newer(ready_of(current), ticket) {
                // a later producer already published past us
                return;
            }

            match futex.word.compare_exchange(
                current,
                ready,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(previous) => {
                    if previous & WAITING_BIT != 0 {
                        futex.wake();
                    }
                    return;
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Called once per pop, before touching the mound. Returns once a
    /// producer ticket at least as new as this consumer's ticket has been
    /// published to its word.
    pub(crate) fn consumer_wait(&self) {
        let ticket = self.consumer_ticket.fetch_add(1, Ordering::AcqRel);
        if self.is_ready(ticket) {
            return;
        }

        let backoff = Backoff::new();
        while !backoff.is_completed() {
            if self.is_ready(ticket) {
                return;
            }
            backoff.snooze();
        }

        let futex = self.futex(ticket);
        let ticket = ticket & TICKET_MASK;
        loop {
            let current = futex.word.load(Ordering::Acquire);
            if ticket_reached(ready_of(current), ticket) {
                return;
            }

            let blocking = current | WAITING_BIT;
            if current != blocking
                && futex
                    .word
                    .compare_exchange(current, blocking, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
            {
                continue;
            }

            tracing::trace!(ticket, "consumer sleeping until its ticket is published");
            futex.wait(blocking);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_ticket_comparison() {
        assert!(ticket_reached(5, 5));
        assert!(ticket_reached(6, 5));
        assert!(!ticket_reached(4, 5));
        assert!(!ticket_newer(5, 5));
        assert!(ticket_newer(6, 5));

        // wrapped past the 31 bit boundary
        assert!(ticket_reached(2, TICKET_MASK - 1));
        assert!(ticket_newer(0, TICKET_MASK));
        assert!(!ticket_reached(TICKET_MASK, 2));
    }

    #[test]
    fn consumer_passes_after_producer() {
        let blocking = Blocking::default();
        blocking.producer_done();
        blocking.producer_done();
        blocking.consumer_wait();
        blocking.consumer_wait();
    }

    #[test]
    fn consumer_sleeps_until_producer() {
        let blocking = Blocking::default();

        std::thread::scope(|s| {
            let consumer = s.spawn(|| blocking.consumer_wait());
            std::thread::sleep(std::time::Duration::from_millis(20));
            blocking.producer_done();
            consumer.join().unwrap();
        });
    }

    #[test]
    fn many_waiters_on_shared_words() {
        // more consumers than words, so every word is shared by several
        // rounds of tickets
        let n = FUTEX_COUNT * 3;
        let blocking = Blocking::default();

        std::thread::scope(|s| {
            let consumers: Vec<_> = (0..n).map(|_| s.spawn(|| blocking.consumer_wait())).collect();
            for _ in 0..n {
                blocking.producer_done();
            }
            for consumer in consumers {
                consumer.join().unwrap();
            }
        });
    }
}
