#![forbid(unsafe_code)]
//! spillsort-core: record model, identifiers, memory-monitor interfaces and
//! configuration shared by every other spillsort crate.
//!
//! Nothing in here performs I/O. The cache and storage backends live in
//! `spillsort-mem` / `spillsort-io`, the sorting engine in `spillsort-sort`.

pub mod budget;
pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod prelude;
pub mod types;
