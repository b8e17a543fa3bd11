//! EXPSET - Generic Expiring Set
//!
//! A thread-safe set where every value carries its own time-to-live. Values
//! are tracked in two indices (by value and by deadline) and a background
//! sweeper running on tokio evicts expired values once per interval.
//!
//! ```no_run
//! use std::time::Duration;
//! use expset::ExpiringSet;
//!
//! # async fn demo() -> expset::Result<()> {
//! let seen = ExpiringSet::new();
//! seen.start()?;
//!
//! seen.add("session-1".to_string(), Duration::from_secs(30));
//! assert!(seen.has(&"session-1".to_string()));
//!
//! seen.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod metrics;
pub mod storage;

pub use clock::{Clock, ManualClock, TokioClock};
pub use config::SetConfig;
pub use error::{Error, Result};
pub use metrics::SweepMetrics;
pub use storage::ExpiringSet;
