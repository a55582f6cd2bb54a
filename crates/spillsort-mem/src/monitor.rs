//! Process-level memory monitor backed by `sysinfo`.

use std::sync::Mutex;

use spillsort_core::budget::{MemoryLimit, MemoryMonitor};
use spillsort_core::config::SortConfig;
use spillsort_core::error::{Error as CoreError, Result as CoreResult};
use sysinfo::{Pid, ProcessExt, System, SystemExt};

use crate::error::{Error, Result};

/// Reports the resident-set size of the current process.
///
/// The ceiling is whatever runtime limit the caller configures (container
/// limit, `ulimit`, ...); `sysinfo` cannot discover it reliably on its own.
pub struct ProcessMemoryMonitor {
    system: Mutex<System>,
    pid: Pid,
    limit: MemoryLimit,
}

impl ProcessMemoryMonitor {
    pub fn new(limit: MemoryLimit) -> Result<Self> {
        let pid = sysinfo::get_current_pid().map_err(|e| Error::Probe(e.to_string()))?;
        Ok(Self {
            system: Mutex::new(System::new()),
            pid,
            limit,
        })
    }

    pub fn from_config(cfg: &SortConfig) -> Result<Self> {
        Self::new(cfg.runtime_limit())
    }
}

impl MemoryMonitor for ProcessMemoryMonitor {
    fn current_usage(&self) -> CoreResult<usize> {
        let mut system = self
            .system
            .lock()
            .map_err(|_| CoreError::Probe("monitor lock poisoned".into()))?;
        if !system.refresh_process(self.pid) {
            return Err(CoreError::Probe(format!("process {} not visible", self.pid)));
        }
        system
            .process(self.pid)
            .map(|p| p.memory() as usize)
            .ok_or_else(|| CoreError::Probe(format!("process {} not visible", self.pid)))
    }

    fn configured_ceiling(&self) -> MemoryLimit {
        self.limit
    }
}
