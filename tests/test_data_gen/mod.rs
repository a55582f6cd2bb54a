//! Shared data generators and helpers for integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use spillsort_core::budget::{MemoryLimit, MemoryMonitor};
use spillsort_core::error::Result as CoreResult;
use spillsort_core::id::PartitionId;
use spillsort_core::types::{Row, RowBatch, Scalar};
use spillsort_mem::ChunkedCache;

/// Deterministic xorshift generator so runs are reproducible without `rand`.
pub struct XorShift(u64);

impl XorShift {
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    pub fn below(&mut self, n: u64) -> u64 {
        self.next_u64() % n
    }
}

/// Rows with fields `id` (i64), `group` (string, few distinct values),
/// `score` (f64) and `name` (string). Ids repeat, so ties are exercised.
pub fn generate_random_batch(rows: usize, seed: u64) -> RowBatch {
    let mut rng = XorShift::new(seed);
    (0..rows)
        .map(|i| {
            Row::new()
                .with("id", rng.below(rows as u64 / 2 + 1) as i64)
                .with("group", format!("group-{}", rng.below(5)))
                .with("score", rng.below(1000) as f64 / 10.0)
                .with("name", format!("row-{i:05}"))
        })
        .collect()
}

/// Append `batch` to `base` in chunks of `chunk_rows`.
pub fn load_chunks(
    cache: &dyn ChunkedCache,
    base: &str,
    batch: RowBatch,
    chunk_rows: usize,
) -> PartitionId {
    let base = PartitionId::new(base);
    for chunk in batch.chunks(chunk_rows).expect("chunk size > 0") {
        cache.add(&base, chunk).expect("load chunk");
    }
    base
}

/// Project each row onto `fields`.
pub fn tuples(rows: &[Row], fields: &[&str]) -> Vec<Vec<Scalar>> {
    rows.iter()
        .map(|row| {
            fields
                .iter()
                .map(|f| row.get(f).cloned().unwrap_or(Scalar::Null))
                .collect()
        })
        .collect()
}

/// Same tuples in canonical order, for multiset comparison.
pub fn sorted_tuples(rows: &[Row], fields: &[&str]) -> Vec<Vec<Scalar>> {
    let mut out = tuples(rows, fields);
    out.sort_by(|a, b| {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| x.total_cmp(y))
            .find(|o| o.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    out
}

pub fn i64_values(rows: &[Row], field: &str) -> Vec<i64> {
    rows.iter()
        .map(|row| match row.get(field) {
            Some(Scalar::I64(v)) => *v,
            other => panic!("expected i64 in '{field}', got {other:?}"),
        })
        .collect()
}

/// Monitor whose usage grows by `step` bytes on every probe.
pub struct StepMonitor {
    step: usize,
    calls: AtomicUsize,
    limit: MemoryLimit,
}

impl StepMonitor {
    pub fn new(step: usize) -> Self {
        Self::with_limit(step, MemoryLimit::Infinite)
    }

    pub fn with_limit(step: usize, limit: MemoryLimit) -> Self {
        Self {
            step,
            calls: AtomicUsize::new(0),
            limit,
        }
    }

    pub fn probes(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl MemoryMonitor for StepMonitor {
    fn current_usage(&self) -> CoreResult<usize> {
        Ok(self.calls.fetch_add(1, Ordering::Relaxed) * self.step)
    }

    fn configured_ceiling(&self) -> MemoryLimit {
        self.limit
    }
}

pub fn create_temp_spill_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("spillsort-tests-")
        .tempdir()
        .expect("create temp spill dir")
}
