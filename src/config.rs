//! Set Configuration

use std::time::Duration;

/// Expiring set configuration
#[derive(Debug, Clone)]
pub struct SetConfig {
    /// Period between expiry sweeps
    pub sweep_interval: Duration,

    /// Number of values to reserve room for up front
    pub initial_capacity: usize,
}

impl Default for SetConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(1),
            initial_capacity: 0,
        }
    }
}

impl SetConfig {
    /// Set the sweep interval
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set the initial capacity
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }
}
