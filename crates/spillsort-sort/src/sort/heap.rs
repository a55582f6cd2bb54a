//! Min-heap of tagged records for the k-way merge.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use spillsort_core::id::PartitionId;
use spillsort_core::types::{Row, RowBatch, Scalar};

use crate::sort::comparator::{compare_key_tuples, RecordComparator};
use crate::sort::keys::SortDirection;
use crate::traits::{Result, SortError};

/// One record on its way through the merge, tagged with where it came from.
#[derive(Debug, Clone)]
pub struct TaggedRecord {
    row: Row,
    keys: Vec<Scalar>,
    origin: PartitionId,
    slot: usize,
}

impl TaggedRecord {
    /// Build from a singleton batch read from `origin` (cursor `slot`).
    ///
    /// Any batch without exactly one record is a `DataShape` error.
    pub fn from_batch(
        batch: RowBatch,
        origin: PartitionId,
        slot: usize,
        comparator: &RecordComparator,
    ) -> Result<Self> {
        if batch.num_rows() != 1 {
            return Err(SortError::DataShape(format!(
                "partition '{}' yielded a batch of {} records, expected exactly 1",
                origin,
                batch.num_rows()
            )));
        }
        let mut rows = batch.rows;
        let row = rows.remove(0);
        let keys = comparator.extract_keys(&row)?;
        Ok(Self {
            row,
            keys,
            origin,
            slot,
        })
    }

    pub fn row(&self) -> &Row {
        &self.row
    }

    pub fn keys(&self) -> &[Scalar] {
        &self.keys
    }

    pub fn origin(&self) -> &PartitionId {
        &self.origin
    }

    /// Index of the cursor the record was read from.
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn into_row(self) -> Row {
        self.row
    }
}

/// Entry ordering is reversed so `BinaryHeap` pops the minimum.
struct HeapEntry {
    record: TaggedRecord,
    seq: u64,
    directions: Arc<[SortDirection]>,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Equal keys pop in insertion order.
        compare_key_tuples(&self.directions, &other.record.keys, &self.record.keys)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

pub struct MergeHeap {
    heap: BinaryHeap<HeapEntry>,
    directions: Arc<[SortDirection]>,
    next_seq: u64,
}

impl MergeHeap {
    pub fn new(comparator: &RecordComparator) -> Self {
        Self {
            heap: BinaryHeap::new(),
            directions: comparator.directions(),
            next_seq: 0,
        }
    }

    pub fn push(&mut self, record: TaggedRecord) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(HeapEntry {
            record,
            seq,
            directions: Arc::clone(&self.directions),
        });
    }

    /// Remove and return the smallest record.
    pub fn pop(&mut self) -> Option<TaggedRecord> {
        self.heap.pop().map(|entry| entry.record)
    }

    pub fn peek(&self) -> Option<&TaggedRecord> {
        self.heap.peek().map(|entry| &entry.record)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
