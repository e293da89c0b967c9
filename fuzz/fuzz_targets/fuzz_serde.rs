#![no_main]
#[macro_use]
extern crate libfuzzer_sys;
extern crate concurrent_mound;

fuzz_target!(|data: Vec<u64>| {
    let queue = concurrent_mound::RelaxedPriorityQueue::<u64, false, true, 4, 2>::default();

    for item in &data {
        queue.push(*item);
    }

    let serialized = bincode::serialize(&queue).unwrap();
    let deserialized: concurrent_mound::RelaxedPriorityQueue<u64, false, true, 4, 2> =
        bincode::deserialize(&serialized).unwrap();

    assert_eq!(deserialized.len(), data.len());
    assert_eq!(queue.snapshot(), deserialized.snapshot());
});
