use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Barrier;
use std::time::Duration;

use concurrent_mound::RelaxedPriorityQueue;

type BlockingQueue = RelaxedPriorityQueue<u64, true, true>;

#[test]
fn consumers_sleep_until_producers_arrive() {
    let threads = 200;
    let per_thread: u64 = 64;

    let queue = BlockingQueue::default();
    let popped_sum = AtomicU64::new(0);

    std::thread::scope(|s| {
        // every consumer starts on an empty queue
        for _ in 0..threads {
            let queue_2 = queue.clone();
            let popped_sum = &popped_sum;
            s.spawn(move || {
                for _ in 0..per_thread {
                    popped_sum.fetch_add(queue_2.pop(), Ordering::Relaxed);
                }
            });
        }

        std::thread::sleep(Duration::from_millis(100));

        for t in 0..threads {
            let queue_2 = queue.clone();
            s.spawn(move || {
                for value in 0..per_thread {
                    queue_2.push(t * per_thread + value);
                }
            });
        }
    });

    let total = threads * per_thread;
    assert_eq!(popped_sum.load(Ordering::Relaxed), (0..total).sum::<u64>());
    assert!(queue.is_empty());
    assert_eq!(queue.len(), 0);
}

#[test]
fn interleaved_blocking_pairs() {
    let pairs = 128;
    let rounds: u64 = 256;

    let queue = RelaxedPriorityQueue::<u64, true, false, 4, 8>::default();
    let barrier = Barrier::new(pairs * 2);

    let popped: u64 = std::thread::scope(|s| {
        for _ in 0..pairs {
            let queue_2 = queue.clone();
            let barrier_2 = &barrier;
            s.spawn(move || {
                barrier_2.wait();
                for value in 0..rounds {
                    queue_2.push(value);
                    if value % 32 == 0 {
                        std::thread::yield_now();
                    }
                }
            });
        }

        let consumers: Vec<_> = (0..pairs)
            .map(|_| {
                let queue_2 = queue.clone();
                let barrier_2 = &barrier;
                s.spawn(move || {
                    barrier_2.wait();
                    (0..rounds).map(|_| queue_2.pop()).sum::<u64>()
                })
            })
            .collect();

        consumers.into_iter().map(|c| c.join().unwrap()).sum()
    });

    assert_eq!(popped, (0..rounds).sum::<u64>() * pairs as u64);
    assert!(queue.is_empty());
}

#[test]
fn strict_blocking_single_consumer() {
    let queue = RelaxedPriorityQueue::<u32, true, false, 0>::default();

    std::thread::scope(|s| {
        let consumer = queue.clone();
        let handle = s.spawn(move || (0..100).map(|_| consumer.pop()).collect::<Vec<u32>>());

        std::thread::sleep(Duration::from_millis(20));
        for value in 0..100 {
            queue.push(value);
        }

        let mut popped = handle.join().unwrap();
        popped.sort_unstable();
        assert_eq!(popped, (0..100).collect::<Vec<u32>>());
    });
}
