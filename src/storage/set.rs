//! Expiring Set
//!
//! Thread-safe set whose values disappear once their TTL has elapsed.

use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use super::index::{ExpiryIndex, Timestamp};
use super::sweeper::Sweeper;
use crate::clock::{Clock, TokioClock};
use crate::config::SetConfig;
use crate::error::{Error, Result};
use crate::metrics::SweepMetrics;

/// State shared between set handles and the sweeper task
pub(crate) struct Core<T> {
    index: RwLock<ExpiryIndex<T>>,
    clock: Arc<dyn Clock>,
    epoch: Instant,
    metrics: SweepMetrics,
}

impl<T> Core<T>
where
    T: Eq + Hash + Clone,
{
    fn now(&self) -> Timestamp {
        let elapsed = self.clock.now().saturating_duration_since(self.epoch);
        u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX)
    }

    /// Evict everything due at the current instant
    pub(crate) fn sweep(&self) -> usize {
        let mut index = self.index.write();
        let removed = index.evict_expired(self.now());
        drop(index);
        self.metrics.record_sweep(removed);
        removed
    }
}

/// Generic expiring set.
///
/// Every value carries its own TTL. Expired values are removed by a background
/// sweeper that runs once per sweep interval after [`ExpiringSet::start`], so a
/// value may still be reported present for up to one interval past its
/// deadline.
///
/// Cloning is cheap and every clone refers to the same set.
pub struct ExpiringSet<T> {
    core: Arc<Core<T>>,
    sweeper: Arc<Mutex<Option<Sweeper>>>,
    config: SetConfig,
}

impl<T> Clone for ExpiringSet<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            sweeper: Arc::clone(&self.sweeper),
            config: self.config.clone(),
        }
    }
}

impl<T> Default for ExpiringSet<T>
where
    T: Eq + Hash + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ExpiringSet<T>
where
    T: Eq + Hash + Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringSet")
            .field("len", &self.len())
            .field("running", &self.is_running())
            .field("config", &self.config)
            .finish()
    }
}

impl<T> ExpiringSet<T>
where
    T: Eq + Hash + Clone + Send + Sync + 'static,
{
    /// Create an empty, stopped set reading tokio's clock
    pub fn new() -> Self {
        Self::with_config(SetConfig::default())
    }

    pub fn with_config(config: SetConfig) -> Self {
        Self::with_clock(config, Arc::new(TokioClock))
    }

    /// Create a set stamping deadlines with the given clock
    pub fn with_clock(config: SetConfig, clock: Arc<dyn Clock>) -> Self {
        let epoch = clock.now();
        let core = Core {
            index: RwLock::new(ExpiryIndex::with_capacity(config.initial_capacity)),
            clock,
            epoch,
            metrics: SweepMetrics::new(),
        };
        Self {
            core: Arc::new(core),
            sweeper: Arc::new(Mutex::new(None)),
            config,
        }
    }

    /// Start the background sweeper on the current tokio runtime.
    ///
    /// Call once per set. A second call while running returns
    /// [`Error::AlreadyRunning`] and leaves the running sweeper untouched.
    pub fn start(&self) -> Result<()> {
        if self.config.sweep_interval.is_zero() {
            return Err(Error::ZeroInterval);
        }

        let mut slot = self.sweeper.lock();
        if slot.is_some() {
            return Err(Error::AlreadyRunning);
        }
        *slot = Some(Sweeper::spawn(
            Arc::clone(&self.core),
            self.config.sweep_interval,
        )?);
        Ok(())
    }

    /// Stop the background sweeper.
    ///
    /// Returns once the sweep loop has fully exited; no eviction happens after
    /// this resolves. Does nothing if the sweeper is not running.
    pub async fn stop(&self) {
        let sweeper = self.sweeper.lock().take();
        match sweeper {
            Some(sweeper) => sweeper.shutdown().await,
            None => debug!("Expiry sweeper not running, nothing to stop"),
        }
    }

    pub fn is_running(&self) -> bool {
        self.sweeper.lock().is_some()
    }

    /// Add `value` with the given TTL.
    ///
    /// If the value is already present its previous TTL is discarded and the
    /// deadline restarts from now with `ttl`.
    pub fn add(&self, value: T, ttl: Duration) {
        let mut index = self.core.index.write();
        let now = self.core.now();
        index.upsert(value, ttl, now);
    }

    /// Restart the deadline of `value` using the TTL it was last added with.
    ///
    /// Returns false if the value is not in the set.
    pub fn refresh(&self, value: &T) -> bool {
        let mut index = self.core.index.write();
        let now = self.core.now();
        index.refresh(value, now)
    }

    /// Check if `value` is in the set.
    ///
    /// Does not look at the deadline: a value stays visible until a sweep
    /// removes it.
    pub fn has(&self, value: &T) -> bool {
        self.core.index.read().contains(value)
    }

    /// Drop every value
    pub fn clear(&self) {
        let mut index = self.core.index.write();
        let dropped = index.len();
        index.clear();
        drop(index);
        info!(dropped = dropped, "Cleared expiring set");
    }

    /// Number of values not yet evicted
    pub fn len(&self) -> usize {
        self.core.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.index.read().is_empty()
    }

    /// Sweeper counters
    pub fn metrics(&self) -> &SweepMetrics {
        &self.core.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Weak;
    use std::thread;
    use tokio_test::{assert_err, assert_ok};

    fn manual_set() -> (ExpiringSet<String>, ManualClock) {
        let clock = ManualClock::new();
        let set = ExpiringSet::with_clock(SetConfig::default(), Arc::new(clock.clone()));
        (set, clock)
    }

    /// Let virtual time pass and give the sweeper a chance to run
    async fn elapse(d: Duration) {
        tokio::time::sleep(d).await;
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_add_then_has() {
        let (set, _clock) = manual_set();
        set.add("a".to_string(), Duration::from_secs(10));
        assert!(set.has(&"a".to_string()));
        assert!(!set.has(&"b".to_string()));
        assert_eq!(set.len(), 1);
        assert!(!set.is_empty());
    }

    #[test]
    fn test_has_is_eventual() {
        let (set, clock) = manual_set();
        set.add("a".to_string(), Duration::from_secs(1));

        clock.advance(Duration::from_secs(5));
        // Past its deadline but not swept yet
        assert!(set.has(&"a".to_string()));

        assert_eq!(set.core.sweep(), 1);
        assert!(!set.has(&"a".to_string()));
    }

    #[test]
    fn test_sweep_with_manual_clock() {
        let (set, clock) = manual_set();
        set.add("k1".to_string(), Duration::from_secs(10));
        set.add("k2".to_string(), Duration::from_secs(20));

        clock.advance(Duration::from_secs(10));
        assert_eq!(set.core.sweep(), 1);
        assert!(!set.has(&"k1".to_string()));
        assert!(set.has(&"k2".to_string()));

        assert_eq!(set.metrics().sweeps(), 1);
        assert_eq!(set.metrics().evicted(), 1);
    }

    #[test]
    fn test_refresh_with_manual_clock() {
        let (set, clock) = manual_set();
        let key = "a".to_string();
        set.add(key.clone(), Duration::from_secs(10));

        clock.advance(Duration::from_secs(5));
        assert!(set.refresh(&key));
        clock.advance(Duration::from_secs(5));
        assert_eq!(set.core.sweep(), 0);

        clock.advance(Duration::from_secs(5));
        assert_eq!(set.core.sweep(), 1);
        assert!(set.is_empty());

        assert!(!set.refresh(&key));
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn test_clear() {
        let (set, _clock) = manual_set();
        set.add("a".to_string(), Duration::from_secs(10));
        set.add("b".to_string(), Duration::from_secs(10));
        set.clear();
        assert_eq!(set.len(), 0);
        assert!(!set.has(&"a".to_string()));
        assert!(!set.has(&"b".to_string()));
    }

    #[test]
    fn test_clones_share_state() {
        let (set, _clock) = manual_set();
        let other = set.clone();
        other.add("a".to_string(), Duration::from_secs(10));
        assert!(set.has(&"a".to_string()));
    }

    #[test]
    fn test_start_without_runtime() {
        let set = ExpiringSet::<u64>::new();
        assert_eq!(set.start(), Err(Error::NoRuntime));
        assert!(!set.is_running());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = SetConfig::default().with_sweep_interval(Duration::ZERO);
        let set = ExpiringSet::<u64>::with_config(config);
        assert_eq!(set.start(), Err(Error::ZeroInterval));
    }

    #[test]
    fn test_concurrent_access() {
        let set = ExpiringSet::<String>::new();

        // Spawn multiple threads writing concurrently
        let handles: Vec<_> = (0..10)
            .map(|i| {
                let s = set.clone();
                thread::spawn(move || {
                    for j in 0..100 {
                        let key = format!("key-{}-{}", i, j);
                        s.add(key.clone(), Duration::from_secs(60));
                        assert!(s.has(&key));
                        assert!(s.refresh(&key));
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(set.len(), 1000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_after_ttl() {
        let set = ExpiringSet::new();
        assert_ok!(set.start());
        assert!(set.is_running());

        set.add(7u64, Duration::from_secs(3));
        elapse(Duration::from_millis(2500)).await;
        assert!(set.has(&7));

        elapse(Duration::from_secs(1)).await;
        assert!(!set.has(&7));
        assert!(set.metrics().evicted() >= 1);

        set.stop().await;
        assert!(!set.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_granularity_is_one_interval() {
        let set = ExpiringSet::new();
        assert_ok!(set.start());

        set.add(1u64, Duration::from_millis(500));
        elapse(Duration::from_millis(700)).await;
        // Deadline passed, next sweep is at one second
        assert!(set.has(&1));

        elapse(Duration::from_millis(300)).await;
        assert!(!set.has(&1));

        set.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_rejected() {
        let set = ExpiringSet::<u64>::new();
        assert_ok!(set.start());
        assert_err!(set.start());
        assert!(set.is_running());
        set.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_eviction_after_stop() {
        let set = ExpiringSet::new();
        assert_ok!(set.start());
        set.add(1u64, Duration::from_secs(1));
        set.stop().await;

        let sweeps = set.metrics().sweeps();
        elapse(Duration::from_secs(10)).await;
        assert!(set.has(&1));
        assert_eq!(set.metrics().sweeps(), sweeps);

        // Stopping twice is harmless
        set.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_stop() {
        let set = ExpiringSet::new();
        assert_ok!(set.start());
        set.stop().await;

        set.add(1u64, Duration::from_secs(1));
        assert_ok!(set.start());
        elapse(Duration::from_secs(2)).await;
        assert!(!set.has(&1));
        set.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_last_handle_cancels_sweeper() {
        let set = ExpiringSet::<u64>::new();
        assert_ok!(set.start());
        let core: Weak<Core<u64>> = Arc::downgrade(&set.core);

        drop(set);
        elapse(Duration::from_secs(1)).await;
        assert!(core.upgrade().is_none());
    }
}
