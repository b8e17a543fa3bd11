//! Storage Engine
//!
//! Dual-indexed expiring set and its background sweeper.

mod index;
mod set;
mod sweeper;

pub use index::{ExpiryIndex, Timestamp};
pub use set::ExpiringSet;
