//! Keyed, append-only batch storage.

use spillsort_core::id::PartitionId;
use spillsort_core::types::RowBatch;

use crate::error::Result;

/// Lazy replay of a partition's batches, in append order.
///
/// Streams never hold a cache lock between pulls, so a caller may read one
/// partition while appending to another.
pub type BatchStream<'a> = Box<dyn Iterator<Item = Result<RowBatch>> + 'a>;

/// Keyed, append-only storage of record batches.
///
/// Invariants:
/// - `read` replays batches in exactly the order they were `add`ed, up to
///   the last batch present when `read` was called. Later appends are left
///   for the next read.
/// - Reading an unknown partition yields an empty stream, not an error.
/// - `clear` is idempotent.
pub trait ChunkedCache: Send + Sync {
    /// Append one batch to a partition.
    fn add(&self, id: &PartitionId, batch: RowBatch) -> Result<()>;

    /// Lazily replay a partition.
    fn read(&self, id: &PartitionId) -> Result<BatchStream<'_>>;

    /// Drop every batch of a partition.
    fn clear(&self, id: &PartitionId) -> Result<()>;

    /// Whether the partition currently holds any batch.
    fn has(&self, id: &PartitionId) -> Result<bool>;
}
