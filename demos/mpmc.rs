use std::thread::scope;
use std::time::Instant;

use concurrent_mound::RelaxedPriorityQueue;

const PRODUCERS: usize = 128;
const CONSUMERS: usize = 128;
const N: usize = 1024 * 1024;
const PRODUCER_N: usize = N / PRODUCERS;
const CONSUMER_N: usize = N / CONSUMERS;

type Queue = RelaxedPriorityQueue<usize, true>;

fn producer(queue: Queue, min: usize, max: usize) {
    for i in min..max {
        queue.push(i);
    }
}

fn consumer(queue: Queue, n: usize) -> usize {
    let mut sum = 0;
    for _ in 0..n {
        sum += queue.pop();
    }
    sum
}

fn main() {
    let queue = Queue::default();

    let before = Instant::now();
    let sum: usize = scope(|s| {
        for i in 0..PRODUCERS {
            let min = i * PRODUCER_N;
            let max = (i + 1) * PRODUCER_N;
            let queue = queue.clone();
            s.spawn(move || producer(queue, min, max));
        }

        let consumers: Vec<_> = (0..CONSUMERS)
            .map(|_| {
                let queue = queue.clone();
                s.spawn(move || consumer(queue, CONSUMER_N))
            })
            .collect();

        consumers
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .sum()
    });

    let elapsed = before.elapsed();
    assert_eq!(sum, (0..N).sum::<usize>());

    let per_second = N as u128 * 1000 / elapsed.as_millis().max(1);

    println!(
        "with {} producers and {} consumers, took {:?} to transfer {} items ({} per second), mound height {}",
        PRODUCERS,
        CONSUMERS,
        elapsed,
        N,
        per_second,
        queue.height(),
    );
}
