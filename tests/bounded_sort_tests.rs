//! Bounded-memory sort tests: in-memory fast path and external fallback

mod test_data_gen;

use std::sync::Mutex;

use spillsort_core::budget::{MemoryLimit, MemoryMonitor};
use spillsort_core::config::SortConfig;
use spillsort_core::error::{Error as CoreError, Result as CoreResult};
use spillsort_core::id::PartitionId;
use spillsort_core::types::RowBatch;
use spillsort_io::{build_cache_from_config, MemoryCache};
use spillsort_mem::error::Result as MemResult;
use spillsort_mem::{AllocationTracker, BatchStream, ChunkedCache, ProcessMemoryMonitor, TrackedBytes};
use spillsort_sort::{BoundedMemorySort, ExternalMergeSort, SortKey, Sorter};
use test_data_gen::{generate_random_batch, i64_values, load_chunks, sorted_tuples, tuples, StepMonitor};

const ALL_FIELDS: [&str; 4] = ["id", "group", "score", "name"];

/// Monitor that always fails to probe.
struct BrokenMonitor;

impl MemoryMonitor for BrokenMonitor {
    fn current_usage(&self) -> CoreResult<usize> {
        Err(CoreError::Probe("probe unavailable".into()))
    }

    fn configured_ceiling(&self) -> MemoryLimit {
        MemoryLimit::Infinite
    }
}

/// Cache that charges every batch it hands out to an `AllocationTracker`
/// and keeps the charge until `release` is called.
struct ChargingCache {
    inner: MemoryCache,
    tracker: AllocationTracker,
    held: Mutex<Vec<TrackedBytes>>,
}

impl ChargingCache {
    fn new(tracker: AllocationTracker) -> Self {
        Self {
            inner: MemoryCache::new(),
            tracker,
            held: Mutex::new(Vec::new()),
        }
    }

    fn release(&self) {
        self.held.lock().expect("lock").clear();
    }
}

impl ChunkedCache for ChargingCache {
    fn add(&self, id: &PartitionId, batch: RowBatch) -> MemResult<()> {
        self.inner.add(id, batch)
    }

    fn read(&self, id: &PartitionId) -> MemResult<BatchStream<'_>> {
        let stream = self.inner.read(id)?;
        Ok(Box::new(stream.inspect(move |batch| {
            if let Ok(batch) = batch {
                let guard = self.tracker.track(batch.estimated_bytes(), "read");
                self.held.lock().expect("lock").push(guard);
            }
        })))
    }

    fn clear(&self, id: &PartitionId) -> MemResult<()> {
        self.inner.clear(id)
    }

    fn has(&self, id: &PartitionId) -> MemResult<bool> {
        self.inner.has(id)
    }
}

#[test]
fn test_small_input_completes_in_memory() {
    let cache = MemoryCache::new();
    let base = load_chunks(&cache, "small", generate_random_batch(64, 1), 8);
    let monitor = AllocationTracker::unlimited();
    let sorter = BoundedMemorySort::new(&cache, base.clone(), &monitor, 1 << 20);

    let source = sorter.sort_by(&[SortKey::asc("id")]).expect("sort");
    assert!(source.is_in_memory());
    // The in-memory path clears the base before handing out results.
    assert!(!cache.has(&base).expect("has"));

    let batches: Vec<RowBatch> = source.map(|b| b.expect("batch")).collect();
    assert!(batches.iter().all(|b| b.num_rows() <= 8));
    let rows: Vec<_> = batches.into_iter().flatten().collect();
    let ids = i64_values(&rows, "id");
    assert_eq!(ids.len(), 64);
    assert!(ids.windows(2).all(|w| w[0] <= w[1]));
    assert!(cache.is_empty().expect("is_empty"));
}

#[test]
fn test_in_memory_matches_external() {
    let input = generate_random_batch(400, 42);
    let keys = [SortKey::asc("group"), SortKey::desc("id")];

    let mem_cache = MemoryCache::new();
    let mem_base = load_chunks(&mem_cache, "cross", input.clone(), 30);
    let monitor = AllocationTracker::unlimited();
    let bounded = BoundedMemorySort::new(&mem_cache, mem_base, &monitor, 1 << 30);
    let source = bounded.sort_by(&keys).expect("bounded sort");
    assert!(source.is_in_memory());
    let in_memory = source.into_rows().expect("drain");

    let ext_cache = MemoryCache::new();
    let ext_base = load_chunks(&ext_cache, "cross", input, 30);
    let external = ExternalMergeSort::new(&ext_cache, ext_base)
        .sort_by(&keys)
        .expect("external sort")
        .into_rows()
        .expect("drain");

    // Same key sequence, same multiset of records.
    assert_eq!(
        tuples(&in_memory, &["group", "id"]),
        tuples(&external, &["group", "id"])
    );
    assert_eq!(
        sorted_tuples(&in_memory, &ALL_FIELDS),
        sorted_tuples(&external, &ALL_FIELDS)
    );
}

#[test]
fn test_tiny_ceiling_matches_direct_external() {
    let input = generate_random_batch(250, 99);
    let keys = [SortKey::asc("score"), SortKey::asc("name")];

    let cache = MemoryCache::new();
    let base = load_chunks(&cache, "tiny", input.clone(), 20);
    let monitor = StepMonitor::new(64);
    let bounded = BoundedMemorySort::new(&cache, base, &monitor, 1);
    let source = bounded.sort_by(&keys).expect("bounded sort");
    assert!(!source.is_in_memory(), "tiny ceiling should delegate");
    let via_bounded = source.into_rows().expect("drain");
    assert!(cache.is_empty().expect("is_empty"));

    let direct_cache = MemoryCache::new();
    let direct_base = load_chunks(&direct_cache, "tiny", input, 20);
    let direct = ExternalMergeSort::new(&direct_cache, direct_base)
        .sort_by(&keys)
        .expect("external sort")
        .into_rows()
        .expect("drain");

    assert_eq!(via_bounded, direct);
}

#[test]
fn test_tracked_allocations_trigger_fallback() {
    let tracker = AllocationTracker::unlimited();
    let cache = ChargingCache::new(tracker.clone());
    let input = generate_random_batch(200, 17);
    let one_chunk = input.rows[..10].iter().cloned().collect::<RowBatch>();
    let ceiling = one_chunk.estimated_bytes() * 3;
    let base = load_chunks(&cache, "charged", input.clone(), 10);

    let sorter = BoundedMemorySort::new(&cache, base, &tracker, ceiling);
    let source = sorter.sort_by(&[SortKey::asc("id")]).expect("sort");
    assert!(!source.is_in_memory());
    assert!(sorter.peak_delta() > ceiling);

    let rows = source.into_rows().expect("drain");
    cache.release();
    assert_eq!(tracker.used_bytes(), 0);
    assert_eq!(
        sorted_tuples(&rows, &ALL_FIELDS),
        sorted_tuples(&input.rows, &ALL_FIELDS)
    );
    assert!(i64_values(&rows, "id").windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_runtime_limit_lowers_ceiling() {
    let cache = MemoryCache::new();
    let base = load_chunks(&cache, "limit", generate_random_batch(30, 8), 10);
    // Configured ceiling is generous; 90% of the runtime limit (180) is not.
    let monitor = StepMonitor::with_limit(100, MemoryLimit::Bytes(200));
    let sorter = BoundedMemorySort::new(&cache, base, &monitor, 10_000);
    assert_eq!(sorter.effective_ceiling(), 180);

    let source = sorter.sort_by(&[SortKey::asc("id")]).expect("sort");
    assert!(!source.is_in_memory());
    // Baseline, first chunk (100), second chunk (200 > 180).
    assert_eq!(monitor.probes(), 3);
    assert_eq!(source.into_rows().expect("drain").len(), 30);
}

#[test]
fn test_probe_failure_falls_back_to_external() {
    let cache = MemoryCache::new();
    let input = generate_random_batch(40, 12);
    let base = load_chunks(&cache, "probe", input.clone(), 8);
    let sorter = BoundedMemorySort::new(&cache, base, &BrokenMonitor, 1 << 30);

    let source = sorter.sort_by(&[SortKey::asc("id")]).expect("sort");
    assert!(!source.is_in_memory());
    let rows = source.into_rows().expect("drain");
    assert_eq!(
        sorted_tuples(&rows, &ALL_FIELDS),
        sorted_tuples(&input.rows, &ALL_FIELDS)
    );
    assert!(cache.is_empty().expect("is_empty"));
}

#[test]
fn test_process_monitor_with_generous_ceiling() {
    let cache = MemoryCache::new();
    let base = load_chunks(&cache, "rss", generate_random_batch(100, 31), 25);
    let monitor = ProcessMemoryMonitor::new(MemoryLimit::Infinite).expect("monitor");
    let sorter = BoundedMemorySort::new(&cache, base, &monitor, 1 << 30);

    let source = sorter.sort_by(&[SortKey::desc("id")]).expect("sort");
    assert!(source.is_in_memory());
    let ids = i64_values(&source.into_rows().expect("drain"), "id");
    assert!(ids.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn test_sort_from_config() {
    let cfg = SortConfig::from_lookup(|key| match key {
        "SPILLSORT_MEMORY_CEILING_BYTES" => Some("1".into()),
        "SPILLSORT_SPILL_URI" => Some("memory://".into()),
        _ => None,
    });
    cfg.validate().expect("valid config");

    let cache = build_cache_from_config(&cfg.cache_config()).expect("cache");
    let base = load_chunks(cache.as_ref(), "configured", generate_random_batch(50, 2), 10);
    let monitor = StepMonitor::new(10);
    let sorter = BoundedMemorySort::from_config(cache.as_ref(), base.clone(), &monitor, &cfg);

    let rows = sorter
        .sort_by(&[SortKey::asc("name")])
        .expect("sort")
        .into_rows()
        .expect("drain");
    assert_eq!(rows.len(), 50);
    assert!(!cache.has(&base).expect("has"));
}
