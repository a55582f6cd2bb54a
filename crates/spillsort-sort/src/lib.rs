#![forbid(unsafe_code)]
//! spillsort-sort: sorting of record batches that may not fit in memory.
//!
//! Two strategies share the [`Sorter`] surface:
//! - [`ExternalMergeSort`] pre-sorts every cached chunk, explodes it into a
//!   singleton partition and k-way merges those partitions through a heap.
//! - [`BoundedMemorySort`] accumulates the input in memory while watching a
//!   [`MemoryMonitor`](spillsort_core::budget::MemoryMonitor), and hands the
//!   whole job to [`ExternalMergeSort`] once the memory ceiling is crossed.
//!
//! Both read their input from, and write intermediates to, a
//! [`ChunkedCache`](spillsort_mem::ChunkedCache) passed in by the caller.

pub mod sort;
pub mod traits;

pub use sort::{
    BoundedBuffer, BoundedMemorySort, BufferStats, ExternalMergeSort, MergeCursors, MergeHeap,
    PartitionCursor, RecordComparator, SortDirection, SortKey, SortKeySpec, SortedSource,
    TaggedRecord,
};
pub use traits::{Result, SortError, Sorter};
