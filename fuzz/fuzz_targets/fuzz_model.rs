#![no_main]
#[macro_use]
extern crate libfuzzer_sys;
extern crate arbitrary;
extern crate concurrent_mound;

use arbitrary::Arbitrary;

const VALUESPACE: u64 = 128;

#[derive(Debug)]
enum Op {
    Push { value: u64 },
    Pop,
}

impl<'a> Arbitrary<'a> for Op {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(if u.ratio(3, 5)? {
            Op::Push {
                value: u.int_in_range(0..=VALUESPACE)?,
            }
        } else {
            Op::Pop
        })
    }
}

fuzz_target!(|ops: Vec<Op>| {
    // without a shared buffer, a single thread sees exact priority order
    let queue = concurrent_mound::RelaxedPriorityQueue::<u64, false, true, 0, 2>::default();
    let mut model = std::collections::BinaryHeap::new();

    for op in ops {
        match op {
            Op::Push { value } => {
                queue.push(value);
                model.push(value);
            }
            Op::Pop => {
                if let Some(expected) = model.pop() {
                    assert_eq!(queue.pop(), expected);
                } else {
                    assert!(queue.is_empty());
                }
            }
        };

        assert_eq!(queue.len(), model.len());
    }

    let mut expected = model.into_sorted_vec();
    expected.reverse();
    assert_eq!(queue.snapshot(), expected);

    for value in expected {
        assert_eq!(queue.pop(), value);
    }
    assert!(queue.is_empty());
});
