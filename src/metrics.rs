//! Sweep Metrics
//!
//! Counters for the background eviction sweeper.

use std::sync::atomic::{AtomicU64, Ordering};

/// Sweeper counters
#[derive(Debug, Default)]
pub struct SweepMetrics {
    /// Sweeps run since construction
    sweeps: AtomicU64,

    /// Values evicted across all sweeps
    evicted: AtomicU64,

    /// Values evicted by the most recent sweep
    last_evicted: AtomicU64,
}

impl SweepMetrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished sweep
    pub fn record_sweep(&self, evicted: usize) {
        let evicted = evicted as u64;
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.evicted.fetch_add(evicted, Ordering::Relaxed);
        self.last_evicted.store(evicted, Ordering::Relaxed);
    }

    pub fn sweeps(&self) -> u64 {
        self.sweeps.load(Ordering::Relaxed)
    }

    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    pub fn last_evicted(&self) -> u64 {
        self.last_evicted.load(Ordering::Relaxed)
    }

    /// Get a summary of metrics
    pub fn summary(&self) -> String {
        format!(
            "Sweeps: {} | Evicted: total={}, last={}",
            self.sweeps(),
            self.evicted(),
            self.last_evicted()
        )
    }
}
