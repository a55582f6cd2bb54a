//! External k-way merge sort over a chunked cache.
//!
//! Phases:
//! 1. PreSorting: every cached chunk of the base partition is sorted in
//!    memory and written, one record per batch, to its own chunk partition.
//!    The base partition is cleared afterwards.
//! 2. Merging: one cursor per chunk partition feeds a min-heap; the heap
//!    minimum goes to a [`BoundedBuffer`] writing the output partition in
//!    batches no larger than the largest input chunk.
//! 3. Cleanup: the buffer is flushed and the chunk partitions are cleared.
//! 4. Done: the output partition is returned as a [`SortedSource`] that
//!    clears it once drained.

use spillsort_core::error::Error as CoreError;
use spillsort_core::id::PartitionId;
use spillsort_mem::ChunkedCache;

use crate::sort::buffer::{BoundedBuffer, BufferStats};
use crate::sort::comparator::RecordComparator;
use crate::sort::cursor::MergeCursors;
use crate::sort::keys::SortKey;
use crate::sort::source::SortedSource;
use crate::traits::{Result, SortError, Sorter};

const CHUNK_TAG: &str = "chunk";
const OUTPUT_TAG: &str = "sorted";

/// Result of the pre-sort phase.
#[derive(Debug, Default)]
struct PreSorted {
    chunks: Vec<PartitionId>,
    max_chunk_rows: usize,
    rows: usize,
}

pub struct ExternalMergeSort<'c> {
    cache: &'c dyn ChunkedCache,
    base: PartitionId,
}

impl<'c> ExternalMergeSort<'c> {
    pub fn new(cache: &'c dyn ChunkedCache, base: impl Into<PartitionId>) -> Self {
        Self {
            cache,
            base: base.into(),
        }
    }

    pub fn base(&self) -> &PartitionId {
        &self.base
    }

    /// Partition holding the singleton records of input chunk `index`.
    pub fn chunk_partition(&self, index: usize) -> PartitionId {
        self.base.derive(CHUNK_TAG, index)
    }

    /// Partition the merged output is written to.
    pub fn output_partition(&self) -> PartitionId {
        self.base.derive(OUTPUT_TAG, 0)
    }

    /// Run all phases. The returned source borrows only the cache.
    pub fn run(&self, keys: &[SortKey]) -> Result<SortedSource<'c>> {
        let comparator = RecordComparator::try_new(keys)?;

        let presorted = self.presort(&comparator)?;
        if presorted.chunks.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::debug!(base = %self.base, "external sort: empty input");
            return Ok(SortedSource::empty());
        }

        let output = self.output_partition();
        let _stats = self.merge(&presorted, &output, &comparator)?;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            base = %self.base,
            chunks = presorted.chunks.len(),
            rows = presorted.rows,
            output_batches = _stats.spills,
            "external sort: merged"
        );

        SortedSource::cached(self.cache, output)
    }

    fn presort(&self, comparator: &RecordComparator) -> Result<PreSorted> {
        let mut out = PreSorted::default();

        for batch in self.cache.read(&self.base)? {
            let mut batch = batch?;
            if batch.is_empty() {
                continue;
            }
            out.max_chunk_rows = out.max_chunk_rows.max(batch.num_rows());
            out.rows += batch.num_rows();

            comparator.sort_batch(&mut batch)?;
            let chunk = self.chunk_partition(out.chunks.len());
            for single in batch.into_singletons() {
                self.cache.add(&chunk, single)?;
            }
            out.chunks.push(chunk);
        }

        self.cache.clear(&self.base)?;
        #[cfg(feature = "tracing")]
        tracing::trace!(
            base = %self.base,
            chunks = out.chunks.len(),
            rows = out.rows,
            max_chunk_rows = out.max_chunk_rows,
            "external sort: pre-sorted"
        );
        Ok(out)
    }

    fn merge(
        &self,
        presorted: &PreSorted,
        output: &PartitionId,
        comparator: &RecordComparator,
    ) -> Result<BufferStats> {
        // Leftovers of an abandoned earlier run must not leak into this one.
        self.cache.clear(output)?;

        let mut buffer = BoundedBuffer::new(self.cache, presorted.max_chunk_rows)?;
        let mut cursors = MergeCursors::open(self.cache, &presorted.chunks)?;
        let mut heap = cursors.build_heap(comparator)?;

        while cursors.has_remaining() || !heap.is_empty() {
            if !cursors.take_next(&mut heap, output, &mut buffer, comparator)? {
                return Err(SortError::from(CoreError::Invariant(
                    "merge heap drained while cursors remain open".into(),
                )));
            }
        }

        let stats = buffer.close()?;
        drop(cursors);
        for chunk in &presorted.chunks {
            self.cache.clear(chunk)?;
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(
            base = %self.base,
            cleared = presorted.chunks.len(),
            "external sort: chunk partitions cleared"
        );
        Ok(stats)
    }
}

impl Sorter for ExternalMergeSort<'_> {
    fn name(&self) -> &'static str {
        "external_merge_sort"
    }

    fn sort_by(&self, keys: &[SortKey]) -> Result<SortedSource<'_>> {
        self.run(keys)
    }
}
