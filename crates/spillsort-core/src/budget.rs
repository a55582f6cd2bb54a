//! Abstract memory-monitor interfaces.
//!
//! Concrete monitors live in `spillsort-mem`. We keep only the trait here so
//! the sorting crate can depend on the API without pulling in `sysinfo`.

use crate::error::Result;

/// Upper bound on memory a process (or tracked allocator) may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryLimit {
    Bytes(usize),
    Infinite,
}

impl MemoryLimit {
    pub fn from_option(bytes: Option<usize>) -> Self {
        bytes.map(MemoryLimit::Bytes).unwrap_or(MemoryLimit::Infinite)
    }

    pub fn is_finite(&self) -> bool {
        matches!(self, MemoryLimit::Bytes(_))
    }
}

/// Probe reporting current memory consumption.
///
/// Implementations must be cheap to call; the in-memory sort path queries the
/// monitor after every batch it accumulates.
pub trait MemoryMonitor: Send + Sync {
    /// Bytes currently in use, as seen by this monitor.
    fn current_usage(&self) -> Result<usize>;

    /// Runtime-imposed ceiling, if any.
    fn configured_ceiling(&self) -> MemoryLimit;

    /// Bytes gained since `baseline` (a previous `current_usage` reading).
    /// Usage that dropped below the baseline reports 0.
    fn current_delta(&self, baseline: usize) -> Result<usize> {
        Ok(self.current_usage()?.saturating_sub(baseline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed(AtomicUsize);

    impl MemoryMonitor for Fixed {
        fn current_usage(&self) -> Result<usize> {
            Ok(self.0.load(Ordering::Relaxed))
        }
        fn configured_ceiling(&self) -> MemoryLimit {
            MemoryLimit::Infinite
        }
    }

    #[test]
    fn test_delta_saturates() {
        let m = Fixed(AtomicUsize::new(100));
        assert_eq!(m.current_delta(40).unwrap(), 60);
        assert_eq!(m.current_delta(400).unwrap(), 0);
    }

    #[test]
    fn test_limit_from_option() {
        assert_eq!(MemoryLimit::from_option(None), MemoryLimit::Infinite);
        assert!(MemoryLimit::from_option(Some(1)).is_finite());
    }
}
