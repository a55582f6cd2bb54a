//! Pull-based cursors over pre-sorted singleton partitions.

use spillsort_core::error::Error as CoreError;
use spillsort_core::id::PartitionId;
use spillsort_core::types::RowBatch;
use spillsort_mem::{BatchStream, ChunkedCache};

use crate::sort::buffer::BoundedBuffer;
use crate::sort::comparator::RecordComparator;
use crate::sort::heap::{MergeHeap, TaggedRecord};
use crate::traits::{Result, SortError};

/// Lazy cursor holding at most one look-ahead batch of its partition.
pub struct PartitionCursor<'c> {
    partition: PartitionId,
    stream: BatchStream<'c>,
    current: Option<RowBatch>,
}

impl<'c> PartitionCursor<'c> {
    pub fn open(cache: &'c dyn ChunkedCache, partition: PartitionId) -> Result<Self> {
        let mut stream = cache.read(&partition)?;
        let current = stream.next().transpose()?;
        Ok(Self {
            partition,
            stream,
            current,
        })
    }

    pub fn partition(&self) -> &PartitionId {
        &self.partition
    }

    pub fn current(&self) -> Option<&RowBatch> {
        self.current.as_ref()
    }

    /// Take the current batch and pull the next one from the cache.
    pub fn advance(&mut self) -> Result<Option<RowBatch>> {
        let Some(head) = self.current.take() else {
            return Ok(None);
        };
        self.current = self.stream.next().transpose()?;
        Ok(Some(head))
    }

    pub fn is_exhausted(&self) -> bool {
        self.current.is_none()
    }
}

/// One cursor per source partition, indexed in the order the partitions were
/// given. That index is the stable scan order for heap refills.
pub struct MergeCursors<'c> {
    cursors: Vec<PartitionCursor<'c>>,
}

impl<'c> MergeCursors<'c> {
    pub fn open(cache: &'c dyn ChunkedCache, partitions: &[PartitionId]) -> Result<Self> {
        let cursors = partitions
            .iter()
            .map(|p| PartitionCursor::open(cache, p.clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { cursors })
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    /// Cursors that still hold unconsumed records.
    pub fn open_count(&self) -> usize {
        self.cursors.iter().filter(|c| !c.is_exhausted()).count()
    }

    pub fn has_remaining(&self) -> bool {
        self.cursors.iter().any(|c| !c.is_exhausted())
    }

    /// Seed a heap with the head of every non-empty cursor.
    pub fn build_heap(&mut self, comparator: &RecordComparator) -> Result<MergeHeap> {
        let mut heap = MergeHeap::new(comparator);
        for slot in 0..self.cursors.len() {
            self.push_head(slot, &mut heap, comparator)?;
        }
        Ok(heap)
    }

    /// Move the heap minimum into `buffer` under `output`, then refill the
    /// heap with one record: from the popped record's cursor if it has more,
    /// otherwise from the first cursor (by index) that does.
    ///
    /// Returns `false` if the heap was already empty.
    pub fn take_next(
        &mut self,
        heap: &mut MergeHeap,
        output: &PartitionId,
        buffer: &mut BoundedBuffer<'_>,
        comparator: &RecordComparator,
    ) -> Result<bool> {
        let Some(min) = heap.pop() else {
            return Ok(false);
        };
        let origin = min.slot();
        buffer.add_row(output, min.into_row())?;

        if !self.push_head(origin, heap, comparator)? {
            if let Some(slot) = self.cursors.iter().position(|c| !c.is_exhausted()) {
                self.push_head(slot, heap, comparator)?;
            }
        }
        Ok(true)
    }

    fn push_head(
        &mut self,
        slot: usize,
        heap: &mut MergeHeap,
        comparator: &RecordComparator,
    ) -> Result<bool> {
        let cursor = self.cursors.get_mut(slot).ok_or_else(|| {
            SortError::from(CoreError::Invariant(format!("no merge cursor at slot {slot}")))
        })?;
        let Some(batch) = cursor.advance()? else {
            return Ok(false);
        };
        let record = TaggedRecord::from_batch(batch, cursor.partition().clone(), slot, comparator)?;
        heap.push(record);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::keys::SortKey;
    use spillsort_core::types::{Row, Scalar};
    use spillsort_io::MemoryCache;

    fn singletons(cache: &MemoryCache, id: &str, ids: &[i64]) -> PartitionId {
        let partition = PartitionId::new(id);
        for &i in ids {
            cache
                .add(&partition, RowBatch::single(Row::new().with("id", i)))
                .unwrap();
        }
        partition
    }

    #[test]
    fn test_cursor_walks_partition() {
        let cache = MemoryCache::new();
        let p = singletons(&cache, "p", &[1, 2]);
        let mut cursor = PartitionCursor::open(&cache, p).unwrap();

        assert_eq!(cursor.current().map(RowBatch::num_rows), Some(1));
        assert!(cursor.advance().unwrap().is_some());
        assert!(cursor.advance().unwrap().is_some());
        assert!(cursor.is_exhausted());
        assert!(cursor.advance().unwrap().is_none());
    }

    #[test]
    fn test_heap_tracks_open_cursors() {
        let cache = MemoryCache::new();
        let parts = vec![
            singletons(&cache, "a", &[1, 4, 7]),
            singletons(&cache, "b", &[]),
            singletons(&cache, "c", &[2, 3]),
        ];
        let cmp = RecordComparator::try_new(&[SortKey::asc("id")]).unwrap();
        let mut cursors = MergeCursors::open(&cache, &parts).unwrap();
        let mut heap = cursors.build_heap(&cmp).unwrap();
        assert_eq!(heap.len(), 2);

        let out = PartitionId::new("out");
        let mut buffer = BoundedBuffer::new(&cache, 100).unwrap();
        while cursors.has_remaining() || !heap.is_empty() {
            let open_before = cursors.open_count();
            assert!(cursors.take_next(&mut heap, &out, &mut buffer, &cmp).unwrap());
            if open_before > 0 {
                assert_eq!(heap.len(), 2);
            }
        }
        assert!(!cursors.take_next(&mut heap, &out, &mut buffer, &cmp).unwrap());
        buffer.close().unwrap();

        let ids: Vec<Scalar> = cache
            .read(&out)
            .unwrap()
            .flat_map(|b| b.unwrap().values("id").unwrap())
            .collect();
        assert_eq!(ids, [1, 2, 3, 4, 7].map(Scalar::I64).to_vec());
    }

    #[test]
    fn test_non_singleton_batch_is_shape_error() {
        let cache = MemoryCache::new();
        let p = PartitionId::new("bad");
        cache
            .add(&p, (0..2).map(|i| Row::new().with("id", i as i64)).collect())
            .unwrap();
        let cmp = RecordComparator::try_new(&[SortKey::asc("id")]).unwrap();
        let mut cursors = MergeCursors::open(&cache, &[p]).unwrap();
        assert!(matches!(
            cursors.build_heap(&cmp),
            Err(SortError::DataShape(_))
        ));
    }
}
