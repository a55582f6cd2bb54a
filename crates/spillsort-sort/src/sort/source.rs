//! Lazily-iterated sort output.

use spillsort_core::id::PartitionId;
use spillsort_core::types::{Row, RowBatch};
use spillsort_mem::{BatchStream, ChunkedCache};

use crate::traits::{Result, SortError};

/// Globally ordered batches produced by a [`Sorter`](crate::Sorter).
///
/// Cache-backed output is cleared from the cache when the iterator is
/// drained. Dropping the source early leaves the output partition behind.
pub struct SortedSource<'c> {
    inner: Inner<'c>,
}

enum Inner<'c> {
    Empty,
    InMemory {
        rows: std::vec::IntoIter<Row>,
        chunk_rows: usize,
    },
    Cached {
        cache: &'c dyn ChunkedCache,
        partition: PartitionId,
        stream: Option<BatchStream<'c>>,
    },
}

impl<'c> SortedSource<'c> {
    pub(crate) fn empty() -> Self {
        Self { inner: Inner::Empty }
    }

    /// Serve a sorted batch in chunks of `chunk_rows`.
    pub(crate) fn in_memory(batch: RowBatch, chunk_rows: usize) -> Self {
        Self {
            inner: Inner::InMemory {
                rows: batch.rows.into_iter(),
                chunk_rows: chunk_rows.max(1),
            },
        }
    }

    /// Replay `partition`, clearing it once the replay ends.
    pub(crate) fn cached(cache: &'c dyn ChunkedCache, partition: PartitionId) -> Result<Self> {
        let stream = cache.read(&partition)?;
        Ok(Self {
            inner: Inner::Cached {
                cache,
                partition,
                stream: Some(stream),
            },
        })
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self.inner, Inner::InMemory { .. })
    }

    /// Cache partition backing this source, if any.
    pub fn partition(&self) -> Option<&PartitionId> {
        match &self.inner {
            Inner::Cached { partition, .. } => Some(partition),
            _ => None,
        }
    }

    /// Drain into a flat list of rows.
    pub fn into_rows(self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        for batch in self {
            rows.extend(batch?);
        }
        Ok(rows)
    }

    /// Drain into one batch.
    pub fn into_batch(self) -> Result<RowBatch> {
        self.into_rows().map(RowBatch::new)
    }
}

impl Iterator for SortedSource<'_> {
    type Item = Result<RowBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            Inner::Empty => None,
            Inner::InMemory { rows, chunk_rows } => {
                let chunk: RowBatch = rows.by_ref().take(*chunk_rows).collect();
                (!chunk.is_empty()).then_some(Ok(chunk))
            }
            Inner::Cached {
                cache,
                partition,
                stream,
            } => {
                let next = stream.as_mut()?.next();
                match next {
                    Some(batch) => Some(batch.map_err(SortError::from)),
                    None => {
                        *stream = None;
                        #[cfg(feature = "tracing")]
                        tracing::debug!(partition = %partition, "sorted output drained");
                        cache.clear(partition).err().map(|e| Err(e.into()))
                    }
                }
            }
        }
    }
}
