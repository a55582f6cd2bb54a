//! Sorter trait + error type shared by both strategies.

use spillsort_core::error::Error as CoreError;
use thiserror::Error;

use crate::sort::{SortKey, SortedSource};

pub type Result<T> = std::result::Result<T, SortError>;

#[derive(Debug, Error)]
pub enum SortError {
    #[error("configuration error: {0}")]
    Config(String),

    /// A singleton partition yielded a batch without exactly one record.
    #[error("data shape violation: {0}")]
    DataShape(String),

    #[error("sort field '{field}' not found in record")]
    FieldResolution { field: String },

    #[error(transparent)]
    Cache(#[from] spillsort_mem::error::Error),

    #[error(transparent)]
    Core(CoreError),
}

impl From<CoreError> for SortError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::FieldNotFound(field) => SortError::FieldResolution { field },
            other => SortError::Core(other),
        }
    }
}

/// A strategy producing a globally ordered view over one cached partition.
///
/// Invariants:
/// - `sort_by` rejects an empty key list before touching the cache.
/// - Once the returned source is fully drained, neither the base partition
///   nor any intermediate partition of the run remains in the cache.
pub trait Sorter {
    /// Human-readable strategy name (stable).
    fn name(&self) -> &'static str;

    fn sort_by(&self, keys: &[SortKey]) -> Result<SortedSource<'_>>;
}
