#![forbid(unsafe_code)]
//! spillsort-io: concrete storage adapters and cache backends.
//!
//! - `storage::FsStorage`: local filesystem `Storage` for `SpillCache`.
//! - `memory_storage::MemoryStorage`: HashMap-backed `Storage` for tests.
//! - `memory_cache::MemoryCache`: `ChunkedCache` that keeps batches as values.
//! - `build_cache_from_config`: pick a backend from a `CacheConfig`.

pub mod error;
pub mod memory_cache;
pub mod memory_storage;
pub mod storage;

pub use memory_cache::MemoryCache;
pub use memory_storage::MemoryStorage;
pub use storage::{build_cache_from_config, FsStorage};
