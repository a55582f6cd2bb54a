//! Memory-watching in-memory sort with external fallback.

use spillsort_core::budget::{MemoryLimit, MemoryMonitor};
use spillsort_core::config::SortConfig;
use spillsort_core::id::PartitionId;
use spillsort_core::types::RowBatch;
use spillsort_mem::{ChunkedCache, PeakTracker};

use crate::sort::comparator::RecordComparator;
use crate::sort::external::ExternalMergeSort;
use crate::sort::keys::SortKey;
use crate::sort::source::SortedSource;
use crate::traits::{Result, SortError, Sorter};

/// Smaller of `configured` and 90% of a finite runtime limit.
pub fn effective_ceiling(configured: usize, runtime: MemoryLimit) -> usize {
    match runtime {
        MemoryLimit::Bytes(limit) => configured.min(limit - limit / 10),
        MemoryLimit::Infinite => configured,
    }
}

enum Accumulation {
    Completed { batch: RowBatch, max_chunk_rows: usize },
    Exceeded,
}

/// Sorts the base partition in memory unless that would cost more than the
/// memory ceiling, in which case the job is redone by [`ExternalMergeSort`]
/// from the untouched base partition.
pub struct BoundedMemorySort<'c> {
    cache: &'c dyn ChunkedCache,
    base: PartitionId,
    monitor: &'c dyn MemoryMonitor,
    ceiling_bytes: usize,
    peak: PeakTracker,
}

impl<'c> BoundedMemorySort<'c> {
    pub fn new(
        cache: &'c dyn ChunkedCache,
        base: impl Into<PartitionId>,
        monitor: &'c dyn MemoryMonitor,
        ceiling_bytes: usize,
    ) -> Self {
        Self {
            cache,
            base: base.into(),
            monitor,
            ceiling_bytes,
            peak: PeakTracker::new(),
        }
    }

    pub fn from_config(
        cache: &'c dyn ChunkedCache,
        base: impl Into<PartitionId>,
        monitor: &'c dyn MemoryMonitor,
        cfg: &SortConfig,
    ) -> Self {
        Self::new(cache, base, monitor, cfg.memory_ceiling_bytes)
    }

    pub fn base(&self) -> &PartitionId {
        &self.base
    }

    pub fn effective_ceiling(&self) -> usize {
        effective_ceiling(self.ceiling_bytes, self.monitor.configured_ceiling())
    }

    /// Largest memory growth observed while accumulating, across calls.
    pub fn peak_delta(&self) -> usize {
        self.peak.peak()
    }

    pub fn run(&self, keys: &[SortKey]) -> Result<SortedSource<'c>> {
        let comparator = RecordComparator::try_new(keys)?;
        if self.ceiling_bytes == 0 {
            return Err(SortError::Config(
                "memory ceiling must be greater than 0".into(),
            ));
        }

        let ceiling = self.effective_ceiling();
        match self.accumulate(ceiling)? {
            Accumulation::Completed {
                mut batch,
                max_chunk_rows,
            } => {
                comparator.sort_batch(&mut batch)?;
                self.cache.clear(&self.base)?;
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    base = %self.base,
                    rows = batch.num_rows(),
                    peak_delta = self.peak.peak(),
                    ceiling,
                    "bounded sort: completed in memory"
                );
                Ok(SortedSource::in_memory(batch, max_chunk_rows))
            }
            Accumulation::Exceeded => {
                ExternalMergeSort::new(self.cache, self.base.clone()).run(keys)
            }
        }
    }

    /// Pull the whole base partition into one batch, checking memory growth
    /// after every chunk. The stream and the partial batch are dropped on
    /// return, before any fallback starts.
    fn accumulate(&self, ceiling: usize) -> Result<Accumulation> {
        let baseline = match self.monitor.current_usage() {
            Ok(bytes) => bytes,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(base = %self.base, error = %_e, "bounded sort: baseline probe failed, delegating");
                return Ok(Accumulation::Exceeded);
            }
        };

        let mut acc = RowBatch::empty();
        let mut max_chunk_rows = 0;
        for batch in self.cache.read(&self.base)? {
            let batch = batch?;
            max_chunk_rows = max_chunk_rows.max(batch.num_rows());
            acc.append(batch);

            match self.monitor.current_delta(baseline) {
                Ok(delta) => {
                    self.peak.record_used(delta);
                    if delta > ceiling {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(
                            base = %self.base,
                            delta,
                            ceiling,
                            buffered_rows = acc.num_rows(),
                            "bounded sort: ceiling exceeded, delegating"
                        );
                        return Ok(Accumulation::Exceeded);
                    }
                }
                Err(_e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(base = %self.base, error = %_e, "bounded sort: delta probe failed, delegating");
                    return Ok(Accumulation::Exceeded);
                }
            }
        }

        Ok(Accumulation::Completed {
            batch: acc,
            max_chunk_rows,
        })
    }
}

impl Sorter for BoundedMemorySort<'_> {
    fn name(&self) -> &'static str {
        "bounded_memory_sort"
    }

    fn sort_by(&self, keys: &[SortKey]) -> Result<SortedSource<'_>> {
        self.run(keys)
    }
}
