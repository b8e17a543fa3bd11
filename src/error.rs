//! Errors
//!
//! Data operations on the set are total. Only starting the sweeper can fail.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("Expiry sweeper is already running")]
    AlreadyRunning,
    #[error("No tokio runtime available to run the expiry sweeper")]
    NoRuntime,
    #[error("Sweep interval must be greater than zero")]
    ZeroInterval,
}

pub type Result<T> = std::result::Result<T, Error>;
