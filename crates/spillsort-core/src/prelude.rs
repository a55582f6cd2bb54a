//! Convenient re-exports for downstream crates.

pub use crate::budget::{MemoryLimit, MemoryMonitor};
pub use crate::config::{CacheConfig, SortConfig};
pub use crate::error::{Error, Result};
pub use crate::id::PartitionId;
pub use crate::types::{Row, RowBatch, Scalar};
