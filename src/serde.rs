use std::fmt;
use std::marker::PhantomData;

use parking_lot::lock_api::RawMutex;
use serde::de::{Deserializer, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};

use crate::RelaxedPriorityQueue;

/// Serializes the values in the queue, highest first, as a sequence. Like
/// [`RelaxedPriorityQueue::snapshot`], this is only exact when no other
/// thread is using the queue.
impl<
        T,
        const MAY_BLOCK: bool,
        const SUPPORTS_SIZE: bool,
        const POP_BATCH: usize,
        const LIST_TARGET_SIZE: usize,
        M,
    > Serialize for RelaxedPriorityQueue<T, MAY_BLOCK, SUPPORTS_SIZE, POP_BATCH, LIST_TARGET_SIZE, M>
where
    T: 'static + Serialize + Clone + Ord + Send + Sync,
    M: RawMutex,
{
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let values = self.snapshot();
        let mut seq = s.serialize_seq(Some(values.len()))?;
        for value in &values {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

struct RelaxedPriorityQueueVisitor<
    T,
    const MAY_BLOCK: bool,
    const SUPPORTS_SIZE: bool,
    const POP_BATCH: usize,
    const LIST_TARGET_SIZE: usize,
    M,
> {
    pd: PhantomData<(T, M)>,
}

impl<
        'de,
        T,
        const MAY_BLOCK: bool,
        const SUPPORTS_SIZE: bool,
        const POP_BATCH: usize,
        const LIST_TARGET_SIZE: usize,
        M,
    > Visitor<'de>
    for RelaxedPriorityQueueVisitor<T, MAY_BLOCK, SUPPORTS_SIZE, POP_BATCH, LIST_TARGET_SIZE, M>
where
    T: 'static + Deserialize<'de> + Clone + Ord + Send + Sync,
    M: RawMutex,
{
    type Value = RelaxedPriorityQueue<T, MAY_BLOCK, SUPPORTS_SIZE, POP_BATCH, LIST_TARGET_SIZE, M>;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a sequence of queue values")
    }

    fn visit_seq<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let queue = RelaxedPriorityQueue::default();

        while let Some(value) = access.next_element()? {
            queue.push(value);
        }

        Ok(queue)
    }
}

impl<
        'de,
        T,
        const MAY_BLOCK: bool,
        const SUPPORTS_SIZE: bool,
        const POP_BATCH: usize,
        const LIST_TARGET_SIZE: usize,
        M,
    > Deserialize<'de>
    for RelaxedPriorityQueue<T, MAY_BLOCK, SUPPORTS_SIZE, POP_BATCH, LIST_TARGET_SIZE, M>
where
    T: 'static + Deserialize<'de> + Clone + Ord + Send + Sync,
    M: RawMutex,
{
    fn deserialize<D>(
        d: D,
    ) -> Result<RelaxedPriorityQueue<T, MAY_BLOCK, SUPPORTS_SIZE, POP_BATCH, LIST_TARGET_SIZE, M>, D::Error>
    where
        D: Deserializer<'de>,
    {
        d.deserialize_seq(RelaxedPriorityQueueVisitor { pd: PhantomData })
    }
}
