//! Remote store integration tests
//!
//! The fail-open tests run everywhere against a port nothing listens on.
//! The live tests need a Redis server and only run when
//! `CACHE_TEST_REDIS_URL` is set, e.g. `redis://127.0.0.1:6379/15`. They
//! write under unique prefixes and never flush the database.

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use cache_engine::cache::RemoteStore;
use cache_engine::{CacheManager, Config, Store, StoreKind};

const UNREACHABLE_URL: &str = "redis://127.0.0.1:1/0";

fn remote_config(url: &str, prefix: &str) -> Config {
    Config {
        store_kind: "remote".to_string(),
        remote_url: url.to_string(),
        key_prefix: prefix.to_string(),
        default_ttl: Some(Duration::from_secs(60)),
        pool_size: 4,
        timeout: Duration::from_millis(500),
        ..Config::default()
    }
}

fn live_url() -> Option<String> {
    std::env::var("CACHE_TEST_REDIS_URL").ok()
}

fn unique_prefix(name: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("cache_engine_test:{}:{}", name, nanos)
}

// == Fail-open ==

#[tokio::test]
async fn test_manager_on_unreachable_remote_fails_open() {
    let manager = CacheManager::new(&Config {
        timeout: Duration::from_millis(250),
        ..remote_config(UNREACHABLE_URL, "down")
    })
    .unwrap();
    assert_eq!(manager.kind(), StoreKind::Remote);

    assert_eq!(manager.get("k").await, None);
    assert!(!manager.set("k", "v", None).await);
    assert!(!manager.exists("k").await);
    assert!(!manager.delete("k").await);
    assert_eq!(manager.increment("n", 1, None).await, None);
    assert_eq!(manager.size().await, 0);
    assert_eq!(manager.ping().await, None);
    assert_eq!(manager.info().await, None);

    let found = manager.get_multi(&["a", "b"]).await;
    assert_eq!(found.len(), 2);
    assert!(found.values().all(Option::is_none));

    let value = manager
        .fetch("k", None, || async { "computed".to_string() })
        .await;
    assert_eq!(value, "computed");
}

#[test]
fn test_invalid_remote_url_is_a_construction_error() {
    let result = CacheManager::new(&remote_config("not a url", "bad"));
    assert!(result.is_err());
}

// == Live server ==

#[tokio::test]
async fn test_live_round_trip_and_ttl() {
    let Some(url) = live_url() else { return };
    let manager = CacheManager::new(&remote_config(&url, &unique_prefix("rt"))).unwrap();

    assert_eq!(manager.ping().await.as_deref(), Some("PONG"));
    assert!(manager.set("k", "hello", None).await);
    assert_eq!(manager.get("k").await.as_deref(), Some("hello"));
    assert!(manager.exists("k").await);

    assert!(manager.set("short", "v", Some(Duration::from_millis(50))).await);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(manager.get("short").await, None);

    assert!(manager.delete("k").await);
    assert!(!manager.exists("k").await);
}

#[tokio::test]
async fn test_live_prefixes_isolate_managers() {
    let Some(url) = live_url() else { return };
    let first = CacheManager::new(&remote_config(&url, &unique_prefix("one"))).unwrap();
    let second = CacheManager::new(&remote_config(&url, &unique_prefix("two"))).unwrap();

    first.set("shared", "first", None).await;
    second.set("shared", "second", None).await;

    assert_eq!(first.get("shared").await.as_deref(), Some("first"));
    assert_eq!(second.get("shared").await.as_deref(), Some("second"));

    first.delete("shared").await;
    assert_eq!(second.get("shared").await.as_deref(), Some("second"));
    second.delete("shared").await;
}

#[tokio::test]
async fn test_live_counters() {
    let Some(url) = live_url() else { return };
    let manager = CacheManager::new(&remote_config(&url, &unique_prefix("ctr"))).unwrap();

    assert_eq!(manager.increment("hits", 5, Some(Duration::from_secs(30))).await, Some(5));
    assert_eq!(manager.increment("hits", 2, None).await, Some(7));
    assert_eq!(manager.decrement("hits", 10, None).await, Some(-3));

    manager.set("word", "abc", None).await;
    assert_eq!(manager.increment("word", 1, None).await, None);
    assert_eq!(manager.get("word").await.as_deref(), Some("abc"));

    manager.delete("hits").await;
    manager.delete("word").await;
}

#[tokio::test]
async fn test_live_counter_ttl_set_on_creation() {
    let Some(url) = live_url() else { return };
    let manager = CacheManager::new(&remote_config(&url, &unique_prefix("ttl"))).unwrap();

    manager.increment("n", 1, Some(Duration::from_millis(80))).await;
    manager.increment("n", 1, Some(Duration::from_secs(60))).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(manager.get("n").await, None);
}

#[tokio::test]
async fn test_live_batch_operations() {
    let Some(url) = live_url() else { return };
    let manager = CacheManager::new(&remote_config(&url, &unique_prefix("batch"))).unwrap();

    let values = HashMap::from([
        ("a".to_string(), "1".to_string()),
        ("b".to_string(), "2".to_string()),
    ]);
    assert!(manager.set_multi(&values, None).await);

    let found = manager.get_multi(&["a", "b", "c"]).await;
    assert_eq!(found["a"].as_deref(), Some("1"));
    assert_eq!(found["b"].as_deref(), Some("2"));
    assert_eq!(found["c"], None);

    let stats = manager.stats().await;
    assert_eq!(stats["store"].as_str(), Some("remote"));
    assert!(stats["size"].as_i64().unwrap_or_default() >= 2);

    manager.delete("a").await;
    manager.delete("b").await;
}

#[tokio::test]
async fn test_live_store_info() {
    let Some(url) = live_url() else { return };
    let store = RemoteStore::connect(&url, 2, Duration::from_secs(1), None).unwrap();

    let info = store.info().await.unwrap();
    assert!(info.contains_key("redis_version"));
    assert!(!store.exists("cache_engine_test:definitely-missing").await);
}
