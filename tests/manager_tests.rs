//! Manager behaviour on the memory store
//!
//! Exercises the public API the way an application would: configuration in,
//! namespaced cache traffic out.

use std::collections::HashMap;
use std::time::Duration;

use cache_engine::cache::{MemoryStore, NullStore};
use cache_engine::{CacheError, CacheManager, Config, Store, StoreKind};

fn memory_manager(max_size: usize) -> CacheManager {
    let config = Config {
        max_size,
        default_ttl: None,
        key_prefix: "it".to_string(),
        ..Config::default()
    };
    CacheManager::new(&config).unwrap()
}

#[tokio::test]
async fn test_set_then_get_round_trip() {
    let manager = memory_manager(10);

    assert!(manager.set("greeting", "hello", None).await);
    assert_eq!(manager.get("greeting").await.as_deref(), Some("hello"));
    assert!(manager.exists("greeting").await);
}

#[tokio::test]
async fn test_ttl_expiry() {
    let manager = memory_manager(10);

    manager.set("k", "v", Some(Duration::from_millis(1))).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(manager.get("k").await, None);
    assert!(!manager.exists("k").await);
    assert_eq!(manager.size().await, 0);
}

#[tokio::test]
async fn test_default_ttl_from_config() {
    let manager = CacheManager::new(&Config {
        default_ttl: Some(Duration::from_millis(5)),
        ..Config::default()
    })
    .unwrap();

    manager.set("k", "v", None).await;
    manager.set("pinned", "v", Some(Duration::from_secs(60))).await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(manager.get("k").await, None);
    assert_eq!(manager.get("pinned").await.as_deref(), Some("v"));
}

#[tokio::test]
async fn test_lru_eviction_order() {
    let manager = memory_manager(2);

    manager.set("a", "1", None).await;
    manager.set("b", "2", None).await;
    assert_eq!(manager.get("a").await.as_deref(), Some("1"));
    manager.set("c", "3", None).await;

    assert_eq!(manager.get("b").await, None);
    assert_eq!(manager.get("a").await.as_deref(), Some("1"));
    assert_eq!(manager.get("c").await.as_deref(), Some("3"));

    let stats = manager.stats().await;
    assert_eq!(stats["evictions"].as_i64(), Some(1));
}

#[tokio::test]
async fn test_counters() {
    let manager = memory_manager(10);

    assert_eq!(manager.increment("visits", 1, None).await, Some(1));
    assert_eq!(manager.increment("visits", 1, None).await, Some(2));
    assert_eq!(manager.decrement("visits", 5, None).await, Some(-3));
    assert_eq!(manager.get("visits").await.as_deref(), Some("-3"));
}

#[tokio::test]
async fn test_increment_on_non_numeric_value() {
    let manager = memory_manager(10);

    manager.set("name", "abc", None).await;
    assert_eq!(manager.increment("name", 1, None).await, None);
    assert_eq!(manager.get("name").await.as_deref(), Some("abc"));
}

#[tokio::test]
async fn test_counter_ttl_applies_on_creation_only() {
    let manager = memory_manager(10);

    manager.increment("n", 1, Some(Duration::from_millis(30))).await;
    manager.increment("n", 1, Some(Duration::from_secs(60))).await;
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert_eq!(manager.get("n").await, None);
}

#[tokio::test]
async fn test_batch_operations() {
    let manager = memory_manager(10);
    let values = HashMap::from([
        ("x".to_string(), "1".to_string()),
        ("y".to_string(), "2".to_string()),
    ]);

    assert!(manager.set_multi(&values, None).await);

    let keys = vec!["x".to_string(), "y".to_string(), "z".to_string()];
    let found = manager.get_multi(&keys).await;
    assert_eq!(found.len(), 3);
    assert_eq!(found["x"].as_deref(), Some("1"));
    assert_eq!(found["y"].as_deref(), Some("2"));
    assert_eq!(found["z"], None);
}

#[tokio::test]
async fn test_disabled_cache_is_a_no_op() {
    let manager = CacheManager::new(&Config {
        enabled: false,
        ..Config::default()
    })
    .unwrap();

    assert_eq!(manager.kind(), StoreKind::Null);
    assert!(!manager.set("k", "v", None).await);
    assert_eq!(manager.get("k").await, None);
    assert_eq!(manager.size().await, 0);
    assert_eq!(
        manager.fetch("k", None, || async { "computed".to_string() }).await,
        "computed"
    );
}

#[tokio::test]
async fn test_fetch_stores_computed_value() {
    let manager = memory_manager(10);

    let value = manager
        .get_or_compute("report", None, || async { "expensive".to_string() })
        .await;
    assert_eq!(value, "expensive");
    assert_eq!(manager.get("report").await.as_deref(), Some("expensive"));
}

#[tokio::test]
async fn test_prefix_scopes_physical_keys() {
    let store = MemoryStore::new(10, None);
    store.set("a:shared", "from a", None).await;

    let owner = CacheManager::with_store(Box::new(store), "a");
    assert_eq!(owner.get("shared").await.as_deref(), Some("from a"));
    assert_eq!(owner.get("a:shared").await, None);

    let store = MemoryStore::new(10, None);
    store.set("a:shared", "from a", None).await;
    let other = CacheManager::with_store(Box::new(store), "b");
    assert_eq!(other.get("shared").await, None);
    assert!(!other.exists("shared").await);
}

#[tokio::test]
async fn test_null_store_manager() {
    let manager = CacheManager::with_store(Box::new(NullStore::new()), "n");

    assert!(!manager.set("k", "v", None).await);
    assert_eq!(manager.get("k").await, None);
    assert!(manager.clear().await);
    assert_eq!(manager.increment("n", 1, None).await, None);
}

#[test]
fn test_unsupported_store_kind() {
    let result = CacheManager::new(&Config {
        store_kind: "memcached".to_string(),
        ..Config::default()
    });
    assert!(matches!(result, Err(CacheError::UnsupportedStore(_))));
}
