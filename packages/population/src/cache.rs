//! Time-bounded cache of fetched hours.
//!
//! Entries are keyed by [`HourKey`] and carry the time they were stored.
//! Expiry is checked when an entry is read; there is no background
//! eviction.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use visitor_map_population_models::{HourKey, PopulationRecord};

/// Records of one hour, shared between the cache and callers.
pub type HourRecords = Arc<Vec<PopulationRecord>>;

struct CacheEntry {
    stored_at: DateTime<Utc>,
    records: HourRecords,
}

/// Process-wide cache of filtered hourly records.
///
/// The lock is only held for map operations, never across a fetch.
pub struct HourlyCache {
    ttl: Duration,
    entries: Mutex<BTreeMap<HourKey, CacheEntry>>,
}

impl HourlyCache {
    /// Creates an empty cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            ttl: Duration::from_std(ttl).unwrap_or(Duration::MAX),
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns the cached records for `key` if they were stored less than
    /// the TTL before `now`. Expired entries are removed.
    pub fn get(&self, key: &HourKey, now: DateTime<Utc>) -> Option<HourRecords> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(key)?;

        if now.signed_duration_since(entry.stored_at) >= self.ttl {
            log::debug!("Cache entry for {key} expired");
            entries.remove(key);
            return None;
        }

        Some(Arc::clone(&entry.records))
    }

    /// Stores `records` for `key`, replacing any previous entry.
    pub fn insert(&self, key: HourKey, records: HourRecords, now: DateTime<Utc>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                key,
                CacheEntry {
                    stored_at: now,
                    records,
                },
            );
    }

    /// Number of stored entries, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
