//! Storage adapters implementing `spillsort_mem::spill::Storage`, plus the
//! builder that turns a `CacheConfig` into a ready `ChunkedCache`.

mod fs;
pub use fs::FsStorage;

use spillsort_core::config::CacheConfig;
use spillsort_mem::{ChunkedCache, Codec, SpillCache};

use crate::error::{Error, Result};
use crate::memory_cache::MemoryCache;

/// Build the cache backend selected by the configured URI scheme.
///
/// - `memory://` keeps batches as values in a [`MemoryCache`].
/// - `file://…`, a bare path or no URI spills segments under `cfg.root` via
///   [`FsStorage`].
pub fn build_cache_from_config(cfg: &CacheConfig) -> Result<Box<dyn ChunkedCache>> {
    match cfg.scheme() {
        Some("memory") => Ok(Box::new(MemoryCache::new())),
        Some("file") | None => {
            let codec = Codec::from_name(&cfg.codec)?;
            Ok(Box::new(SpillCache::new(
                Box::new(FsStorage::new()),
                codec,
                cfg.root.clone(),
            )))
        }
        Some(other) => Err(Error::Config(format!("unsupported spill scheme '{other}'"))),
    }
}
