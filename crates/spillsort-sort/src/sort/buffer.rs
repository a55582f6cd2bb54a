//! Per-partition row accumulator that spills to the cache at a fixed size.

use std::collections::BTreeMap;

use spillsort_core::id::PartitionId;
use spillsort_core::types::{Row, RowBatch};
use spillsort_mem::ChunkedCache;

use crate::traits::{Result, SortError};

/// Spill accounting for one buffer's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStats {
    /// Batches written to the cache.
    pub spills: usize,
    /// Rows written to the cache.
    pub rows: usize,
    /// Largest single spill, in rows.
    pub max_spill_rows: usize,
}

/// Buffers rows per partition and appends them to the cache in batches of
/// exactly `threshold` rows; `close` flushes the remainders.
///
/// Invariants:
/// - every added row reaches the cache exactly once, in add order within its
///   partition;
/// - no partition holds `threshold` or more rows between calls, and no spill
///   exceeds `threshold` rows.
pub struct BoundedBuffer<'c> {
    cache: &'c dyn ChunkedCache,
    threshold: usize,
    pending: BTreeMap<PartitionId, RowBatch>,
    stats: BufferStats,
}

impl<'c> BoundedBuffer<'c> {
    pub fn new(cache: &'c dyn ChunkedCache, threshold: usize) -> Result<Self> {
        if threshold == 0 {
            return Err(SortError::Config(
                "buffer threshold must be greater than 0".into(),
            ));
        }
        Ok(Self {
            cache,
            threshold,
            pending: BTreeMap::new(),
            stats: BufferStats::default(),
        })
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn stats(&self) -> BufferStats {
        self.stats
    }

    /// Rows currently held in memory for `partition`.
    pub fn buffered_rows(&self, partition: &PartitionId) -> usize {
        self.pending.get(partition).map(RowBatch::num_rows).unwrap_or(0)
    }

    /// Append a group of rows; full chunks are spilled immediately.
    pub fn add(&mut self, partition: &PartitionId, batch: RowBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let Self {
            cache,
            threshold,
            pending,
            stats,
        } = self;

        let buffered = pending.entry(partition.clone()).or_default();
        buffered.append(batch);
        while buffered.num_rows() >= *threshold {
            let full = buffered.split_front(*threshold);
            spill(*cache, stats, partition, full)?;
        }
        Ok(())
    }

    pub fn add_row(&mut self, partition: &PartitionId, row: Row) -> Result<()> {
        self.add(partition, RowBatch::single(row))
    }

    /// Flush every non-empty remainder once, in partition-id order.
    pub fn close(mut self) -> Result<BufferStats> {
        for (partition, rest) in std::mem::take(&mut self.pending) {
            if !rest.is_empty() {
                spill(self.cache, &mut self.stats, &partition, rest)?;
            }
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(
            spills = self.stats.spills,
            rows = self.stats.rows,
            "buffer closed"
        );
        Ok(self.stats)
    }
}

fn spill(
    cache: &dyn ChunkedCache,
    stats: &mut BufferStats,
    partition: &PartitionId,
    batch: RowBatch,
) -> Result<()> {
    let rows = batch.num_rows();
    cache.add(partition, batch)?;
    stats.spills += 1;
    stats.rows += rows;
    stats.max_spill_rows = stats.max_spill_rows.max(rows);
    Ok(())
}
