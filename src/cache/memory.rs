//! Memory Store Module
//!
//! In-process store combining HashMap storage with LRU tracking and TTL
//! expiration, guarded by a single lock.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{
    CacheEntry, CacheStats, LruTracker, StatsMap, Store, StoreKind, MAX_KEY_LENGTH,
    MAX_VALUE_SIZE,
};

// == Inner State ==
/// Map, access order and counters; one consistency domain.
#[derive(Debug)]
struct Inner {
    entries: HashMap<String, CacheEntry>,
    lru: LruTracker,
    stats: CacheStats,
    max_size: usize,
}

impl Inner {
    fn get(&mut self, key: &str, now: Instant) -> Option<String> {
        let Some((owned_key, entry)) = self.entries.remove_entry(key) else {
            self.stats.record_miss();
            return None;
        };

        if entry.is_expired_at(now) {
            self.lru.remove(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            return None;
        }

        let entry = entry.accessed();
        let value = entry.value.clone();
        self.entries.insert(owned_key, entry);
        self.lru.touch(key);
        self.stats.record_hit();
        Some(value)
    }

    fn set(&mut self, key: &str, value: &str, ttl: Option<Duration>, now: Instant) -> bool {
        if key.len() > MAX_KEY_LENGTH || value.len() > MAX_VALUE_SIZE {
            debug!(key_len = key.len(), value_len = value.len(), "rejecting oversized entry");
            return false;
        }

        if !self.entries.contains_key(key) && self.entries.len() >= self.max_size {
            if let Some(evicted) = self.lru.evict_oldest() {
                self.entries.remove(&evicted);
                self.stats.record_eviction();
                debug!(key = %evicted, "evicted least recently used entry");
            }
        }

        let entry = CacheEntry::new_at(value.to_string(), ttl, now);
        self.entries.insert(key.to_string(), entry);
        self.lru.touch(key);
        true
    }

    fn delete(&mut self, key: &str, now: Instant) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.lru.remove(key);
                !entry.is_expired_at(now)
            }
            None => false,
        }
    }

    fn exists(&self, key: &str, now: Instant) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    fn increment(
        &mut self,
        key: &str,
        amount: i64,
        ttl: Option<Duration>,
        now: Instant,
    ) -> Option<i64> {
        let live = self
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now));

        let Some(entry) = live else {
            return self.set(key, &amount.to_string(), ttl, now).then_some(amount);
        };

        let next = entry.value.trim().parse::<i64>().ok()?.checked_add(amount)?;
        let (owned_key, entry) = self.entries.remove_entry(key)?;
        self.entries
            .insert(owned_key, entry.with_value(next.to_string()));
        self.lru.touch(key);
        Some(next)
    }

    fn purge_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.remove(key);
            self.lru.remove(key);
        }

        self.stats.record_expirations(expired.len());
        expired.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
    }
}

// == Memory Store ==
/// Bounded in-process store with LRU eviction and TTL expiry.
///
/// A single mutex covers the map, the access order and the counters, so all
/// operations on one instance are totally ordered. `exists` does not refresh
/// recency.
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    default_ttl: Option<Duration>,
}

impl MemoryStore {
    /// Creates a store holding at most `max_size` entries (at least one).
    pub fn new(max_size: usize, default_ttl: Option<Duration>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                lru: LruTracker::new(),
                stats: CacheStats::new(),
                max_size: max_size.max(1),
            }),
            default_ttl,
        }
    }

    pub fn max_size(&self) -> usize {
        self.inner.lock().max_size
    }

    /// Physical entry count, including expired entries not yet removed.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys from least to most recently used.
    pub fn keys_by_recency(&self) -> Vec<String> {
        self.inner.lock().lru.iter().cloned().collect()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats.clone()
    }

    fn effective_ttl(&self, ttl: Option<Duration>) -> Option<Duration> {
        ttl.or(self.default_ttl)
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Memory
    }

    async fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().get(key, Instant::now())
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> bool {
        let ttl = self.effective_ttl(ttl);
        self.inner.lock().set(key, value, ttl, Instant::now())
    }

    async fn delete(&self, key: &str) -> bool {
        self.inner.lock().delete(key, Instant::now())
    }

    async fn exists(&self, key: &str) -> bool {
        self.inner.lock().exists(key, Instant::now())
    }

    async fn clear(&self) -> bool {
        self.inner.lock().clear();
        true
    }

    async fn size(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.purge_expired(Instant::now());
        inner.entries.len()
    }

    // Runs under the lock and keeps the existing expiry of a live counter.
    async fn increment(&self, key: &str, amount: i64, ttl: Option<Duration>) -> Option<i64> {
        let ttl = self.effective_ttl(ttl);
        self.inner.lock().increment(key, amount, ttl, Instant::now())
    }

    async fn sweep_expired(&self) -> usize {
        self.inner.lock().purge_expired(Instant::now())
    }

    async fn extras(&self) -> StatsMap {
        let inner = self.inner.lock();
        let mut report = StatsMap::new();
        report.insert("max_size".to_string(), inner.max_size.into());
        report.insert(
            "lru_occupancy".to_string(),
            (inner.entries.len() as f64 / inner.max_size as f64).into(),
        );
        report.insert("lru_tracked".to_string(), inner.lru.len().into());
        inner.stats.fill(&mut report);
        report
    }
}
