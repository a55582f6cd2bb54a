//! `ChunkedCache` that keeps batches as plain values in a HashMap.
//!
//! No serialization, no I/O. Suits tests and pipelines whose intermediate
//! data is known to fit in memory but still want the cache-driven sorters.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use spillsort_core::id::PartitionId;
use spillsort_core::types::RowBatch;
use spillsort_mem::error::{Error as MemError, Result as MemResult};
use spillsort_mem::{BatchStream, ChunkedCache};

type Partitions = HashMap<PartitionId, Vec<RowBatch>>;

#[derive(Clone, Default)]
pub struct MemoryCache {
    data: Arc<Mutex<Partitions>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> MemResult<MutexGuard<'_, Partitions>> {
        self.data
            .lock()
            .map_err(|_| MemError::Storage("memory cache lock poisoned".into()))
    }

    /// Partitions holding at least one batch, sorted by id.
    pub fn partitions(&self) -> MemResult<Vec<PartitionId>> {
        let mut ids: Vec<PartitionId> = self
            .data()?
            .iter()
            .filter(|(_, batches)| !batches.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Row count of every batch stored under `id`, in append order.
    pub fn batch_sizes(&self, id: &PartitionId) -> MemResult<Vec<usize>> {
        Ok(self
            .data()?
            .get(id)
            .map(|batches| batches.iter().map(RowBatch::num_rows).collect())
            .unwrap_or_default())
    }

    pub fn is_empty(&self) -> MemResult<bool> {
        Ok(self.partitions()?.is_empty())
    }
}

/// Pulls batch `pos` under a short-lived lock on every `next`, stopping at
/// the batch count seen when the read started.
struct MemoryCacheReader<'a> {
    cache: &'a MemoryCache,
    id: PartitionId,
    pos: usize,
    end: usize,
}

impl Iterator for MemoryCacheReader<'_> {
    type Item = MemResult<RowBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.end {
            return None;
        }
        let data = match self.cache.data() {
            Ok(data) => data,
            Err(e) => return Some(Err(e)),
        };
        let batch = data.get(&self.id)?.get(self.pos)?.clone();
        self.pos += 1;
        Some(Ok(batch))
    }
}

impl ChunkedCache for MemoryCache {
    fn add(&self, id: &PartitionId, batch: RowBatch) -> MemResult<()> {
        self.data()?.entry(id.clone()).or_default().push(batch);
        Ok(())
    }

    fn read(&self, id: &PartitionId) -> MemResult<BatchStream<'_>> {
        let end = self.data()?.get(id).map_or(0, Vec::len);
        Ok(Box::new(MemoryCacheReader {
            cache: self,
            id: id.clone(),
            pos: 0,
            end,
        }))
    }

    fn clear(&self, id: &PartitionId) -> MemResult<()> {
        self.data()?.remove(id);
        Ok(())
    }

    fn has(&self, id: &PartitionId) -> MemResult<bool> {
        Ok(self.data()?.get(id).is_some_and(|b| !b.is_empty()))
    }
}
