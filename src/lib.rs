#![forbid(unsafe_code)]
//! spillsort: sort record batches larger than memory.
//!
//! Facade over the workspace crates:
//! - [`spillsort_core`]: rows, batches, partition ids, memory-monitor trait, config.
//! - [`spillsort_mem`]: the `ChunkedCache` trait, the segment-backed `SpillCache`,
//!   memory monitors.
//! - [`spillsort_io`]: filesystem / in-memory storage and cache backends.
//! - [`spillsort_sort`]: `ExternalMergeSort`, `BoundedMemorySort` and their parts.
//!
//! ```no_run
//! use spillsort::prelude::*;
//!
//! # fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let cache = MemoryCache::new();
//! let base = PartitionId::new("orders");
//! cache.add(&base, RowBatch::single(Row::new().with("id", 2i64)))?;
//! cache.add(&base, RowBatch::single(Row::new().with("id", 1i64)))?;
//!
//! let monitor = ProcessMemoryMonitor::new(MemoryLimit::Infinite)?;
//! let sorter = BoundedMemorySort::new(&cache, base, &monitor, 64 << 20);
//! for batch in sorter.sort_by(&[SortKey::asc("id")])? {
//!     println!("{:?}", batch?);
//! }
//! # Ok(())
//! # }
//! ```

pub use spillsort_core;
pub use spillsort_io;
pub use spillsort_mem;
pub use spillsort_sort;

pub mod prelude {
    pub use spillsort_core::prelude::*;
    pub use spillsort_io::{build_cache_from_config, FsStorage, MemoryCache, MemoryStorage};
    pub use spillsort_mem::{
        AllocationTracker, ChunkedCache, Codec, ProcessMemoryMonitor, SpillCache, Storage,
    };
    pub use spillsort_sort::{
        BoundedMemorySort, ExternalMergeSort, SortDirection, SortError, SortKey, SortedSource,
        Sorter,
    };
}
