//! Expiry Sweeper
//!
//! Background task that periodically evicts expired values from a set.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use super::set::Core;
use crate::error::{Error, Result};

/// Handle to a running sweeper task.
///
/// Dropping it cancels the task without waiting for it.
pub(crate) struct Sweeper {
    cancel: DropGuard,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Spawn the sweep loop on the current tokio runtime
    pub(crate) fn spawn<T>(core: Arc<Core<T>>, period: Duration) -> Result<Self>
    where
        T: Eq + Hash + Clone + Send + Sync + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;
        let token = CancellationToken::new();
        let handle = runtime.spawn(run(core, period, token.clone()));
        Ok(Self {
            cancel: token.drop_guard(),
            handle,
        })
    }

    /// Cancel the loop and wait until it has exited
    pub(crate) async fn shutdown(self) {
        let Self { cancel, handle } = self;
        drop(cancel);
        if let Err(e) = handle.await {
            warn!(error = %e, "Expiry sweeper exited abnormally");
        }
    }
}

async fn run<T>(core: Arc<Core<T>>, period: Duration, cancel: CancellationToken)
where
    T: Eq + Hash + Clone,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("Expiry sweeper started, interval: {:?}", period);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let removed = core.sweep();
                if removed > 0 {
                    debug!(removed = removed, "Evicted expired values");
                }
            }
        }
    }

    info!("Expiry sweeper stopped");
}
