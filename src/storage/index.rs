//! Dual Index
//!
//! Value-keyed entries plus an expiry-ordered index over the same values.
//! Both maps are only ever mutated together, so every entry has exactly one
//! slot in the expiry index and every slot points back at a live entry.

use hashbrown::HashMap;
use std::collections::BTreeMap;
use std::hash::Hash;
use std::time::Duration;

/// Nanoseconds since the owning set's epoch
pub type Timestamp = u64;

/// Latest deadline handed out. Leaves room above it for collision bumps.
const HORIZON: Timestamp = u64::MAX >> 1;

/// Metadata for one tracked value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    /// TTL requested by the last `upsert`, reused on refresh
    ttl: Duration,
    /// Slot in the expiry index
    expiry: Timestamp,
}

/// Deadline for a value stamped at `now` with the given TTL
fn deadline(now: Timestamp, ttl: Duration) -> Timestamp {
    let ttl = u64::try_from(ttl.as_nanos()).unwrap_or(u64::MAX);
    now.saturating_add(ttl).min(HORIZON)
}

#[derive(Debug)]
pub struct ExpiryIndex<T> {
    items: HashMap<T, Entry>,
    by_expiry: BTreeMap<Timestamp, T>,
}

impl<T> Default for ExpiryIndex<T> {
    fn default() -> Self {
        Self {
            items: HashMap::new(),
            by_expiry: BTreeMap::new(),
        }
    }
}

impl<T> ExpiryIndex<T>
where
    T: Eq + Hash + Clone,
{
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: HashMap::with_capacity(capacity),
            by_expiry: BTreeMap::new(),
        }
    }

    /// Insert `value`, or replace its TTL and deadline if already tracked
    pub fn upsert(&mut self, value: T, ttl: Duration, now: Timestamp) {
        if let Some(old) = self.items.get(&value) {
            self.by_expiry.remove(&old.expiry);
        }
        let expiry = self.free_slot(deadline(now, ttl));
        self.items.insert(value.clone(), Entry { ttl, expiry });
        self.by_expiry.insert(expiry, value);
    }

    /// Restart the deadline of `value` using its stored TTL.
    /// Returns false if the value is not tracked.
    pub fn refresh(&mut self, value: &T, now: Timestamp) -> bool {
        let Some(entry) = self.items.get_mut(value) else {
            return false;
        };

        // The old slot is still taken while the new one is chosen.
        let mut expiry = deadline(now, entry.ttl);
        while self.by_expiry.contains_key(&expiry) {
            expiry += 1;
        }

        let stored = self
            .by_expiry
            .remove(&entry.expiry)
            .unwrap_or_else(|| value.clone());
        self.by_expiry.insert(expiry, stored);
        entry.expiry = expiry;
        true
    }

    #[inline]
    pub fn contains(&self, value: &T) -> bool {
        self.items.contains_key(value)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.by_expiry.clear();
    }

    /// Remove one value from both maps
    pub fn evict(&mut self, value: &T) -> bool {
        match self.items.remove(value) {
            Some(entry) => {
                self.by_expiry.remove(&entry.expiry);
                true
            }
            None => false,
        }
    }

    /// Evict every value whose deadline is at or before `now`, earliest first.
    /// Stops at the first live deadline. Returns the number evicted.
    pub fn evict_expired(&mut self, now: Timestamp) -> usize {
        let mut removed = 0;
        while let Some(slot) = self.by_expiry.first_entry() {
            if *slot.key() > now {
                break;
            }
            let value = slot.remove();
            self.items.remove(&value);
            removed += 1;
        }
        removed
    }

    /// First deadline not yet evicted
    pub fn next_expiry(&self) -> Option<Timestamp> {
        self.by_expiry.keys().next().copied()
    }

    /// Lowest free slot at or after `at`
    fn free_slot(&self, mut at: Timestamp) -> Timestamp {
        while self.by_expiry.contains_key(&at) {
            at += 1;
        }
        at
    }
}
