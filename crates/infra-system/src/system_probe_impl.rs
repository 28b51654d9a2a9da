// System probe implementation
// reason: sysinfo for cross-platform CPU discovery
use std::sync::{Mutex, PoisonError};
use sysinfo::System;
use tracing::{debug, warn};

use dispatch_core::port::system_probe::SystemProbe;

/// System probe implementation using sysinfo
///
/// Falls back to `std::thread::available_parallelism` when sysinfo reports
/// no CPUs (restricted containers, unsupported platforms).
pub struct SystemProbeImpl {
    system: Mutex<System>,
}

impl SystemProbeImpl {
    /// Create a new system probe
    ///
    /// # Example
    /// ```ignore
    /// let probe = SystemProbeImpl::new();
    /// let window = WindowConfig::for_parallelism(probe.parallelism());
    /// ```
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    /// Total memory in MiB, for the startup banner
    pub fn total_memory_mb(&self) -> u64 {
        let mut sys = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        sys.refresh_memory();
        sys.total_memory() / 1024 / 1024
    }
}

impl Default for SystemProbeImpl {
    fn default() -> Self {
        Self::new()
    }
}

fn fallback_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl SystemProbe for SystemProbeImpl {
    fn parallelism(&self) -> usize {
        let cpus = {
            let mut sys = self.system.lock().unwrap_or_else(PoisonError::into_inner);
            sys.refresh_cpu();
            sys.cpus().len()
        };

        if cpus == 0 {
            let fallback = fallback_parallelism();
            warn!(fallback = fallback, "sysinfo reported no CPUs, using available_parallelism");
            return fallback;
        }

        debug!(cpus = cpus, "CPU count collected");
        cpus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallelism_is_positive() {
        let probe = SystemProbeImpl::new();
        assert!(probe.parallelism() >= 1);
    }

    #[test]
    fn test_fallback_is_positive() {
        assert!(fallback_parallelism() >= 1);
    }

    #[test]
    fn test_total_memory_is_reported() {
        let probe = SystemProbeImpl::default();
        assert!(probe.total_memory_mb() > 0);
    }
}
