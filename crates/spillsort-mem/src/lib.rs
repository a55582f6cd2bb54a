#![forbid(unsafe_code)]
//! spillsort-mem: chunked-cache interface, spill cache, and memory monitors.
//!
//! `ChunkedCache` is the seam every sorter talks to. `SpillCache` implements it
//! on top of a byte-level `Storage` trait (implemented by `spillsort-io`), so
//! batches can live on disk or any other backend. The monitors implement
//! `spillsort_core::budget::MemoryMonitor`.

pub mod cache;
pub mod error;
pub mod monitor;
pub mod spill;
pub mod tracking;

pub use cache::{BatchStream, ChunkedCache};
pub use monitor::ProcessMemoryMonitor;
pub use spill::{Codec, SpillCache, Storage};
pub use tracking::{AllocationTracker, PeakTracker, TrackedBytes};
