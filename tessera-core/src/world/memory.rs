//! Best-effort process memory sampling for the emergency watchdog.

use parking_lot::Mutex;
use sysinfo::{Pid, ProcessesToUpdate, System};

/// A point-in-time memory reading.
#[derive(Debug, Clone, Copy)]
pub struct MemoryUsage {
    /// Resident bytes of this process.
    pub used_bytes: u64,
    /// Total bytes of system memory.
    pub total_bytes: u64,
}

impl MemoryUsage {
    /// Used over total, in `[0, 1]` under normal conditions.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        self.used_bytes as f64 / self.total_bytes as f64
    }
}

/// Samples process and system memory counters. Readings are
/// unsynchronized with the rest of the server; the watchdog only needs
/// a rough signal.
pub struct MemoryWatchdog {
    system: Mutex<System>,
    pid: Pid,
}

impl Default for MemoryWatchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryWatchdog {
    /// Creates the watchdog for the current process.
    #[must_use]
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
            pid: sysinfo::get_current_pid().unwrap_or(Pid::from_u32(0)),
        }
    }

    /// Takes a fresh reading.
    #[must_use]
    pub fn usage(&self) -> MemoryUsage {
        let mut system = self.system.lock();
        system.refresh_memory();
        let total_bytes = system.total_memory().max(1);
        let _ = system.refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);
        let used_bytes = system
            .process(self.pid)
            .map_or_else(|| system.used_memory(), sysinfo::Process::memory);
        MemoryUsage {
            used_bytes,
            total_bytes,
        }
    }
}
