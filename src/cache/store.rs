//! Cache Store Module
//!
//! The capability contract every store variant implements, plus the derived
//! operations written once against the primitives.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::cache::{RemoteStore, StatsMap};
use crate::error::CacheError;

// == Store Kind ==
/// The store variants a manager can be built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Memory,
    Remote,
    Null,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Memory => "memory",
            StoreKind::Remote => "remote",
            StoreKind::Null => "null",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreKind::Memory),
            "remote" | "redis" => Ok(StoreKind::Remote),
            "null" => Ok(StoreKind::Null),
            other => Err(CacheError::UnsupportedStore(other.to_string())),
        }
    }
}

// == Store Trait ==
/// Key/value store capability.
///
/// Primitives never fail for ordinary misses; absence is reported through
/// `None`/`false`. A `ttl` of `None` means "use the store's default".
#[async_trait]
pub trait Store: Send + Sync {
    /// Which variant this is.
    fn kind(&self) -> StoreKind;

    /// Returns the live value for `key`, or None on miss or expiry.
    async fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`; true on success.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> bool;

    /// Removes `key`; true iff a live entry existed.
    async fn delete(&self, key: &str) -> bool;

    /// True iff a live entry exists. Does not count as an access.
    async fn exists(&self, key: &str) -> bool;

    /// Removes every entry.
    async fn clear(&self) -> bool;

    /// Number of live entries.
    async fn size(&self) -> usize;

    async fn get_multi(&self, keys: &[String]) -> HashMap<String, Option<String>> {
        pointwise_get_multi(self, keys).await
    }

    async fn set_multi(&self, values: &HashMap<String, String>, ttl: Option<Duration>) -> bool {
        pointwise_set_multi(self, values, ttl).await
    }

    /// Adds `amount` to the integer stored under `key`, creating it if absent.
    ///
    /// Returns None if the stored value is not an integer or the write fails.
    async fn increment(&self, key: &str, amount: i64, ttl: Option<Duration>) -> Option<i64> {
        read_modify_increment(self, key, amount, ttl).await
    }

    async fn decrement(&self, key: &str, amount: i64, ttl: Option<Duration>) -> Option<i64> {
        let amount = amount.checked_neg()?;
        self.increment(key, amount, ttl).await
    }

    /// Drops expired entries eagerly, returning how many were removed.
    async fn sweep_expired(&self) -> usize {
        0
    }

    /// Variant-specific figures for the stats report.
    async fn extras(&self) -> StatsMap {
        StatsMap::new()
    }

    /// Downcast used by the remote-only diagnostics.
    fn as_remote(&self) -> Option<&RemoteStore> {
        None
    }
}

// == Derived Operations ==
/// Pointwise union of individual gets.
pub async fn pointwise_get_multi<S>(store: &S, keys: &[String]) -> HashMap<String, Option<String>>
where
    S: Store + ?Sized,
{
    let mut found = HashMap::with_capacity(keys.len());
    for key in keys {
        let value = store.get(key).await;
        found.insert(key.clone(), value);
    }
    found
}

/// Individual sets; true iff all of them succeed.
///
/// Every key is attempted even after a failure, so already-written keys stay
/// written.
pub async fn pointwise_set_multi<S>(
    store: &S,
    values: &HashMap<String, String>,
    ttl: Option<Duration>,
) -> bool
where
    S: Store + ?Sized,
{
    let mut all_stored = true;
    for (key, value) in values {
        all_stored &= store.set(key, value, ttl).await;
    }
    all_stored
}

/// Counter update expressed as get, parse, set.
///
/// The TTL only matters when the counter is created; an existing counter is
/// rewritten with the store default.
pub async fn read_modify_increment<S>(
    store: &S,
    key: &str,
    amount: i64,
    ttl: Option<Duration>,
) -> Option<i64>
where
    S: Store + ?Sized,
{
    let (next, ttl) = match store.get(key).await {
        None => (amount, ttl),
        Some(current) => (current.trim().parse::<i64>().ok()?.checked_add(amount)?, None),
    };

    if store.set(key, &next.to_string(), ttl).await {
        Some(next)
    } else {
        None
    }
}

// == Get Or Compute ==
/// Result of [`get_or_compute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    /// Served from the store
    Hit(String),
    /// Produced on a miss and written through
    Computed(String),
}

impl Fetched {
    pub fn is_hit(&self) -> bool {
        matches!(self, Fetched::Hit(_))
    }

    pub fn value(&self) -> &str {
        match self {
            Fetched::Hit(value) | Fetched::Computed(value) => value,
        }
    }

    pub fn into_value(self) -> String {
        match self {
            Fetched::Hit(value) | Fetched::Computed(value) => value,
        }
    }
}

/// Returns the cached value, or runs `producer` on a miss and stores its result.
///
/// There is no single-flight: concurrent misses on one key each run the
/// producer and the last write wins. A failed write still returns the value.
pub async fn get_or_compute<S, F, Fut>(
    store: &S,
    key: &str,
    ttl: Option<Duration>,
    producer: F,
) -> Fetched
where
    S: Store + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = String>,
{
    if let Some(value) = store.get(key).await {
        return Fetched::Hit(value);
    }

    let value = producer().await;
    store.set(key, &value, ttl).await;
    Fetched::Computed(value)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryStore, NullStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Memory store whose batch write "natively" fails halfway through.
    struct FlakyBatchStore {
        inner: MemoryStore,
        native_calls: AtomicUsize,
    }

    #[async_trait]
    impl Store for FlakyBatchStore {
        fn kind(&self) -> StoreKind {
            StoreKind::Memory
        }
        async fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key).await
        }
        async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> bool {
            self.inner.set(key, value, ttl).await
        }
        async fn delete(&self, key: &str) -> bool {
            self.inner.delete(key).await
        }
        async fn exists(&self, key: &str) -> bool {
            self.inner.exists(key).await
        }
        async fn clear(&self) -> bool {
            self.inner.clear().await
        }
        async fn size(&self) -> usize {
            self.inner.size().await
        }
        async fn set_multi(&self, values: &HashMap<String, String>, ttl: Option<Duration>) -> bool {
            self.native_calls.fetch_add(1, Ordering::SeqCst);
            // Native batch wrote only the first key before failing
            if let Some((key, value)) = values.iter().next() {
                self.inner.set(key, value, ttl).await;
            }
            pointwise_set_multi(self, values, ttl).await
        }
    }

    fn memory() -> MemoryStore {
        MemoryStore::new(100, None)
    }

    #[test]
    fn test_store_kind_parse() {
        assert_eq!("memory".parse::<StoreKind>().unwrap(), StoreKind::Memory);
        assert_eq!(" Remote ".parse::<StoreKind>().unwrap(), StoreKind::Remote);
        assert_eq!("redis".parse::<StoreKind>().unwrap(), StoreKind::Remote);
        assert_eq!("NULL".parse::<StoreKind>().unwrap(), StoreKind::Null);
        assert!(matches!(
            "memcached".parse::<StoreKind>(),
            Err(CacheError::UnsupportedStore(kind)) if kind == "memcached"
        ));
    }

    #[test]
    fn test_store_kind_display() {
        assert_eq!(StoreKind::Memory.to_string(), "memory");
        assert_eq!(StoreKind::Remote.to_string(), "remote");
        assert_eq!(StoreKind::Null.as_str(), "null");
    }

    #[tokio::test]
    async fn test_get_or_compute_miss_then_hit() {
        let store = memory();
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let first = get_or_compute(&store, "k", None, || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            "computed".to_string()
        })
        .await;
        assert_eq!(first, Fetched::Computed("computed".to_string()));

        let second = get_or_compute(&store, "k", None, || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            "other".to_string()
        })
        .await;
        assert!(second.is_hit());
        assert_eq!(second.into_value(), "computed");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_compute_on_null_store_always_computes() {
        let store = NullStore::new();
        for _ in 0..2 {
            let fetched = get_or_compute(&store, "k", None, || async { "v".to_string() }).await;
            assert_eq!(fetched, Fetched::Computed("v".to_string()));
        }
    }

    #[tokio::test]
    async fn test_get_or_compute_has_no_single_flight() {
        let store = Arc::new(memory());
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(tokio::sync::Barrier::new(2));

        let mut handles = Vec::new();
        for i in 0..2 {
            let store = store.clone();
            let calls = calls.clone();
            let gate = gate.clone();
            handles.push(tokio::spawn(async move {
                get_or_compute(store.as_ref(), "race", None, || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    // Both callers are inside the producer before either writes
                    gate.wait().await;
                    format!("v{}", i)
                })
                .await
            }));
        }
        for handle in handles {
            assert!(!handle.await.unwrap().is_hit());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let stored = store.get("race").await.unwrap();
        assert!(stored == "v0" || stored == "v1");
    }

    #[tokio::test]
    async fn test_pointwise_multi_ops() {
        let store = memory();
        let values: HashMap<String, String> = [("a", "1"), ("b", "2")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        assert!(pointwise_set_multi(&store, &values, None).await);

        let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let found = pointwise_get_multi(&store, &keys).await;
        assert_eq!(found.len(), 3);
        assert_eq!(found["a"].as_deref(), Some("1"));
        assert_eq!(found["b"].as_deref(), Some("2"));
        assert_eq!(found["c"], None);
    }

    #[tokio::test]
    async fn test_partial_batch_failure_falls_back_without_losing_keys() {
        let store = FlakyBatchStore {
            inner: memory(),
            native_calls: AtomicUsize::new(0),
        };
        let values: HashMap<String, String> = [("a", "1"), ("b", "2"), ("c", "3")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        assert!(store.set_multi(&values, None).await);
        assert_eq!(store.native_calls.load(Ordering::SeqCst), 1);

        let keys: Vec<String> = values.keys().cloned().collect();
        let found = store.get_multi(&keys).await;
        for (key, value) in &values {
            assert_eq!(found[key].as_ref(), Some(value));
        }
    }

    #[tokio::test]
    async fn test_read_modify_increment() {
        let store = memory();

        assert_eq!(read_modify_increment(&store, "n", 1, None).await, Some(1));
        assert_eq!(read_modify_increment(&store, "n", 5, None).await, Some(6));
        assert_eq!(read_modify_increment(&store, "n", -10, None).await, Some(-4));

        store.set("x", "abc", None).await;
        assert_eq!(read_modify_increment(&store, "x", 1, None).await, None);
        assert_eq!(store.get("x").await.as_deref(), Some("abc"));

        store.set("big", &i64::MAX.to_string(), None).await;
        assert_eq!(read_modify_increment(&store, "big", 1, None).await, None);
    }

    #[tokio::test]
    async fn test_default_decrement_rejects_unnegatable_amount() {
        let store = NullStore::new();
        assert_eq!(store.decrement("n", i64::MIN, None).await, None);
    }
}
