//! Cache Manager Module
//!
//! Façade that owns one store, namespaces keys and optionally times every
//! store call.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::cache::stats::hit_rate;
use crate::cache::store::get_or_compute;
use crate::cache::{
    MemoryStore, MetricsSink, NullStore, Operation, OperationSample, RemoteStore, StatsMap,
    Store, StoreKind,
};
use crate::config::Config;
use crate::error::Result;

/// Key recorded in samples for whole-store operations.
const ALL_KEYS: &str = "*";

// == Counters ==
#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
}

impl Counters {
    fn record_read(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_set(&self, stored: bool) {
        if stored {
            self.sets.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_delete(&self, removed: bool) {
        if removed {
            self.deletes.fetch_add(1, Ordering::Relaxed);
        }
    }
}

// == Cache Manager ==
/// Entry point for all cache traffic.
///
/// The store variant is chosen once at construction and never changes. Keys
/// are stored as `{key_prefix}:{key}` (or unchanged when the prefix is empty).
/// Apart from construction, no operation returns an error: failures degrade
/// to a miss, `false` or `None`.
pub struct CacheManager {
    store: Box<dyn Store>,
    kind: StoreKind,
    enabled: bool,
    key_prefix: String,
    metrics: Option<Weak<dyn MetricsSink>>,
    counters: Counters,
}

impl CacheManager {
    // == Constructors ==
    /// Builds the store selected by `config`.
    ///
    /// An unknown store kind is rejected even when caching is disabled; a
    /// disabled cache always runs on the null store.
    pub fn new(config: &Config) -> Result<Self> {
        let requested: StoreKind = config.store_kind.parse()?;
        let kind = if config.enabled {
            requested
        } else {
            StoreKind::Null
        };

        let store: Box<dyn Store> = match kind {
            StoreKind::Memory => Box::new(MemoryStore::new(config.max_size, config.default_ttl)),
            StoreKind::Remote => Box::new(RemoteStore::connect(
                &config.remote_url,
                config.pool_size,
                config.timeout,
                config.default_ttl,
            )?),
            StoreKind::Null => Box::new(NullStore::new()),
        };

        if config.compress {
            debug!("value compression is reserved; storing values uncompressed");
        }

        info!(
            store = %kind,
            requested = %requested,
            enabled = config.enabled,
            prefix = %config.key_prefix,
            "cache manager initialized"
        );

        let mut manager = Self::with_store(store, &config.key_prefix);
        manager.enabled = config.enabled;
        Ok(manager)
    }

    /// Wraps an already-built store with caching enabled.
    pub fn with_store(store: Box<dyn Store>, key_prefix: &str) -> Self {
        Self {
            kind: store.kind(),
            store,
            enabled: true,
            key_prefix: key_prefix.to_string(),
            metrics: None,
            counters: Counters::default(),
        }
    }

    /// Attaches a metrics sink. The manager keeps only a weak handle; once
    /// the sink is dropped, operations stop being timed.
    pub fn with_metrics(mut self, sink: Weak<dyn MetricsSink>) -> Self {
        self.metrics = Some(sink);
        self
    }

    // == Accessors ==
    pub fn kind(&self) -> StoreKind {
        self.kind
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// The physical key used for `key`.
    pub fn namespaced(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.key_prefix, key)
        }
    }

    // == Reads ==
    pub async fn get(&self, key: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let key = self.namespaced(key);
        let value = self
            .timed(Operation::Get, &key, None, self.store.get(&key), |value| {
                (value.is_some(), value.as_ref().map(String::len))
            })
            .await;
        self.counters.record_read(value.is_some());
        value
    }

    /// Returns the cached value or computes, stores and returns it.
    ///
    /// Concurrent misses on the same key each run `producer`; the last write
    /// wins. With caching disabled the producer always runs.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, ttl: Option<Duration>, producer: F) -> String
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = String>,
    {
        if !self.enabled {
            return producer().await;
        }
        let key = self.namespaced(key);
        let call = get_or_compute(self.store.as_ref(), &key, ttl, producer);
        let fetched = self
            .timed(Operation::Fetch, &key, ttl, call, |fetched| {
                (fetched.is_hit(), Some(fetched.value().len()))
            })
            .await;
        self.counters.record_read(fetched.is_hit());
        fetched.into_value()
    }

    /// Alias of [`CacheManager::get_or_compute`].
    pub async fn fetch<F, Fut>(&self, key: &str, ttl: Option<Duration>, producer: F) -> String
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = String>,
    {
        self.get_or_compute(key, ttl, producer).await
    }

    pub async fn exists(&self, key: &str) -> bool {
        if !self.enabled {
            return false;
        }
        let key = self.namespaced(key);
        self.timed(Operation::Exists, &key, None, self.store.exists(&key), |found| (*found, None))
            .await
    }

    /// Values for `keys`, keyed by the caller's (un-prefixed) keys.
    pub async fn get_multi<K: AsRef<str>>(&self, keys: &[K]) -> HashMap<String, Option<String>> {
        if !self.enabled {
            return keys.iter().map(|key| (key.as_ref().to_string(), None)).collect();
        }

        let namespaced: Vec<String> = keys.iter().map(|key| self.namespaced(key.as_ref())).collect();
        let found = self
            .timed(
                Operation::GetMulti,
                ALL_KEYS,
                None,
                self.store.get_multi(&namespaced),
                |found| (found.values().any(Option::is_some), None),
            )
            .await;

        keys.iter()
            .zip(&namespaced)
            .map(|(key, physical)| {
                let value = found.get(physical).cloned().flatten();
                self.counters.record_read(value.is_some());
                (key.as_ref().to_string(), value)
            })
            .collect()
    }

    // == Writes ==
    /// Stores `value` under the namespaced key.
    ///
    /// Store limits such as [`crate::cache::MAX_KEY_LENGTH`] apply to the
    /// namespaced key, prefix and separator included.
    pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> bool {
        if !self.enabled {
            return false;
        }
        let key = self.namespaced(key);
        let value_size = value.len();
        let stored = self
            .timed(Operation::Set, &key, ttl, self.store.set(&key, value, ttl), |stored| {
                (*stored, Some(value_size))
            })
            .await;
        self.counters.record_set(stored);
        stored
    }

    /// True iff every value was stored.
    pub async fn set_multi(&self, values: &HashMap<String, String>, ttl: Option<Duration>) -> bool {
        if !self.enabled {
            return false;
        }
        let namespaced: HashMap<String, String> = values
            .iter()
            .map(|(key, value)| (self.namespaced(key), value.clone()))
            .collect();
        let total_size: usize = values.values().map(String::len).sum();
        let stored = self
            .timed(
                Operation::SetMulti,
                ALL_KEYS,
                ttl,
                self.store.set_multi(&namespaced, ttl),
                |stored| (*stored, Some(total_size)),
            )
            .await;
        if stored {
            self.counters
                .sets
                .fetch_add(values.len() as u64, Ordering::Relaxed);
        }
        stored
    }

    pub async fn delete(&self, key: &str) -> bool {
        if !self.enabled {
            return false;
        }
        let key = self.namespaced(key);
        let removed = self
            .timed(Operation::Delete, &key, None, self.store.delete(&key), |removed| (*removed, None))
            .await;
        self.counters.record_delete(removed);
        removed
    }

    /// Removes every entry of the underlying store.
    ///
    /// The remote store flushes its whole database, not just this prefix.
    pub async fn clear(&self) -> bool {
        if !self.enabled {
            return true;
        }
        self.timed(Operation::Clear, ALL_KEYS, None, self.store.clear(), |cleared| (*cleared, None))
            .await
    }

    // == Counters ==
    /// Adds `amount` to the counter at `key`, creating it with `ttl` if absent.
    ///
    /// None if the stored value is not an integer or the store is unavailable.
    pub async fn increment(&self, key: &str, amount: i64, ttl: Option<Duration>) -> Option<i64> {
        if !self.enabled {
            return None;
        }
        let key = self.namespaced(key);
        self.timed(
            Operation::Increment,
            &key,
            ttl,
            self.store.increment(&key, amount, ttl),
            |value| (value.is_some(), None),
        )
        .await
    }

    pub async fn decrement(&self, key: &str, amount: i64, ttl: Option<Duration>) -> Option<i64> {
        if !self.enabled {
            return None;
        }
        let key = self.namespaced(key);
        self.timed(
            Operation::Decrement,
            &key,
            ttl,
            self.store.decrement(&key, amount, ttl),
            |value| (value.is_some(), None),
        )
        .await
    }

    // == Introspection ==
    pub async fn size(&self) -> usize {
        if !self.enabled {
            return 0;
        }
        self.timed(Operation::Size, ALL_KEYS, None, self.store.size(), |_| (true, None))
            .await
    }

    /// Aggregated counters plus store-specific figures.
    pub async fn stats(&self) -> StatsMap {
        let mut report = if self.enabled {
            self.store.extras().await
        } else {
            StatsMap::new()
        };
        let hits = self.counters.hits.load(Ordering::Relaxed);
        let misses = self.counters.misses.load(Ordering::Relaxed);

        report.insert("store".to_string(), self.kind.as_str().into());
        report.insert("enabled".to_string(), self.enabled.into());
        report.insert("key_prefix".to_string(), self.key_prefix.as_str().into());
        report.insert("size".to_string(), self.size().await.into());
        report.insert("hits".to_string(), hits.into());
        report.insert("misses".to_string(), misses.into());
        report.insert("hit_rate".to_string(), hit_rate(hits, misses).into());
        report.insert(
            "sets".to_string(),
            self.counters.sets.load(Ordering::Relaxed).into(),
        );
        report.insert(
            "deletes".to_string(),
            self.counters.deletes.load(Ordering::Relaxed).into(),
        );
        report
    }

    /// Remote PING reply; None for other stores or when unreachable.
    pub async fn ping(&self) -> Option<String> {
        if !self.enabled {
            return None;
        }
        self.store.as_remote()?.ping().await
    }

    /// Remote INFO fields; None for other stores or when unreachable.
    pub async fn info(&self) -> Option<BTreeMap<String, String>> {
        if !self.enabled {
            return None;
        }
        self.store.as_remote()?.info().await
    }

    /// Drops expired entries from stores that keep them in process.
    pub async fn sweep_expired(&self) -> usize {
        if !self.enabled {
            return 0;
        }
        self.store.sweep_expired().await
    }

    // == Instrumentation ==
    /// Awaits `call` once, recording a sample if a live sink is attached.
    ///
    /// `describe` maps the result to (success, value size).
    async fn timed<T, Fut, D>(
        &self,
        operation: Operation,
        key: &str,
        ttl: Option<Duration>,
        call: Fut,
        describe: D,
    ) -> T
    where
        Fut: Future<Output = T>,
        D: FnOnce(&T) -> (bool, Option<usize>),
    {
        let Some(sink) = self.metrics.as_ref().and_then(Weak::upgrade) else {
            return call.await;
        };

        let started = Instant::now();
        let result = call.await;
        let duration = started.elapsed();
        let (success, value_size) = describe(&result);

        sink.record(&OperationSample {
            key: key.to_string(),
            operation,
            store: self.kind,
            key_size: key.len(),
            value_size,
            ttl,
            success,
            duration,
        });
        result
    }
}
