//! Allocation accounting and peak tracking.
//!
//! `AllocationTracker` is the guard-based monitor: engines that account their
//! own buffers charge bytes through RAII `TrackedBytes` handles and hand the
//! tracker to the sorter as its `MemoryMonitor`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use spillsort_core::budget::{MemoryLimit, MemoryMonitor};

struct TrackerInner {
    limit: MemoryLimit,
    used: AtomicUsize,
}

impl TrackerInner {
    fn charge(&self, bytes: usize) {
        self.used.fetch_add(bytes, Ordering::AcqRel);
    }

    fn try_charge(&self, bytes: usize) -> bool {
        let MemoryLimit::Bytes(cap) = self.limit else {
            self.charge(bytes);
            return true;
        };
        loop {
            let cur = self.used.load(Ordering::Relaxed);
            let next = cur.saturating_add(bytes);
            if next > cap {
                return false;
            }
            if self
                .used
                .compare_exchange(cur, next, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return true;
            }
        }
    }

    fn release(&self, bytes: usize) {
        self.used.fetch_sub(bytes, Ordering::AcqRel);
    }
}

/// Shared byte counter that doubles as a [`MemoryMonitor`].
#[derive(Clone)]
pub struct AllocationTracker {
    inner: Arc<TrackerInner>,
}

impl AllocationTracker {
    pub fn new(limit: MemoryLimit) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                limit,
                used: AtomicUsize::new(0),
            }),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(MemoryLimit::Infinite)
    }

    /// Account `bytes` unconditionally. The limit is advisory here; the
    /// sorter compares usage against it, it does not refuse allocations.
    pub fn track(&self, bytes: usize, tag: &'static str) -> TrackedBytes {
        self.inner.charge(bytes);
        TrackedBytes {
            inner: Arc::clone(&self.inner),
            bytes,
            tag,
        }
    }

    /// Account `bytes` only if that keeps usage within the limit.
    pub fn try_track(&self, bytes: usize, tag: &'static str) -> Option<TrackedBytes> {
        self.inner.try_charge(bytes).then(|| TrackedBytes {
            inner: Arc::clone(&self.inner),
            bytes,
            tag,
        })
    }

    pub fn used_bytes(&self) -> usize {
        self.inner.used.load(Ordering::Relaxed)
    }

    pub fn limit(&self) -> MemoryLimit {
        self.inner.limit
    }
}

impl MemoryMonitor for AllocationTracker {
    fn current_usage(&self) -> spillsort_core::error::Result<usize> {
        Ok(self.used_bytes())
    }

    fn configured_ceiling(&self) -> MemoryLimit {
        self.inner.limit
    }
}

/// RAII handle for tracked bytes. Dropping it returns them to the tracker.
pub struct TrackedBytes {
    inner: Arc<TrackerInner>,
    bytes: usize,
    tag: &'static str,
}

impl TrackedBytes {
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    /// Re-account this handle at `new_bytes`.
    pub fn resize(&mut self, new_bytes: usize) {
        if new_bytes > self.bytes {
            self.inner.charge(new_bytes - self.bytes);
        } else {
            self.inner.release(self.bytes - new_bytes);
        }
        self.bytes = new_bytes;
    }
}

impl Drop for TrackedBytes {
    fn drop(&mut self) {
        if self.bytes > 0 {
            self.inner.release(self.bytes);
            // NOTE: do not log here to keep drop path fast.
            self.bytes = 0;
        }
    }
}

/// Lock-free high-water mark.
#[derive(Default)]
pub struct PeakTracker {
    peak_bytes: AtomicUsize,
}

impl PeakTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new "used bytes" value; updates peak if higher.
    pub fn record_used(&self, used_bytes: usize) {
        let mut cur = self.peak_bytes.load(Ordering::Relaxed);
        while used_bytes > cur {
            match self.peak_bytes.compare_exchange(
                cur,
                used_bytes,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => cur = observed,
            }
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(
            used_bytes,
            peak = self.peak_bytes.load(Ordering::Relaxed),
            "mem usage"
        );
    }

    pub fn peak(&self) -> usize {
        self.peak_bytes.load(Ordering::Relaxed)
    }
}
