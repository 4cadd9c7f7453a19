//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::time::Duration;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// The store kind is kept as raw text; it is resolved (and rejected if unknown)
/// when the manager is built.
#[derive(Debug, Clone)]
pub struct Config {
    /// Master switch; a disabled cache always uses the null store
    pub enabled: bool,
    /// Store selector: `memory`, `remote` (alias `redis`) or `null`
    pub store_kind: String,
    /// Maximum number of entries the memory store can hold
    pub max_size: usize,
    /// TTL applied to writes without an explicit TTL, None = never expire
    pub default_ttl: Option<Duration>,
    /// Namespace prepended to every key as `{prefix}:{key}`
    pub key_prefix: String,
    /// Reserved; values are stored uncompressed
    pub compress: bool,
    /// Remote connection URL
    pub remote_url: String,
    /// Maximum pooled remote connections
    pub pool_size: usize,
    /// Pool checkout, connect and recycle timeout
    pub timeout: Duration,
    /// Interval between expired-entry sweeps, None = no background sweep
    pub sweep_interval: Option<Duration>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_ENABLED` - Enable caching (default: true)
    /// - `CACHE_STORE` - Store kind (default: memory)
    /// - `CACHE_MAX_SIZE` - Maximum in-process entries (default: 1000)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds, 0 disables (default: 300)
    /// - `CACHE_KEY_PREFIX` - Key namespace (default: cache)
    /// - `CACHE_COMPRESS` - Reserved compression flag (default: false)
    /// - `CACHE_REDIS_URL` - Remote URL (default: redis://127.0.0.1:6379/0)
    /// - `CACHE_POOL_SIZE` - Remote pool size (default: 16)
    /// - `CACHE_TIMEOUT` - Remote timeout in seconds (default: 5)
    /// - `CACHE_SWEEP_INTERVAL` - Sweep interval in seconds, 0 disables (default: 60)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from an arbitrary variable source.
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let number = |name: &str| lookup(name).and_then(|v| v.trim().parse::<u64>().ok());
        let seconds = |name: &str, fallback: Option<Duration>| match number(name) {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => fallback,
        };

        Self {
            enabled: lookup("CACHE_ENABLED")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.enabled),
            store_kind: lookup("CACHE_STORE")
                .map(|v| v.trim().to_string())
                .unwrap_or(defaults.store_kind),
            max_size: lookup("CACHE_MAX_SIZE")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.max_size),
            default_ttl: seconds("CACHE_DEFAULT_TTL", defaults.default_ttl),
            key_prefix: lookup("CACHE_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            compress: lookup("CACHE_COMPRESS")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.compress),
            remote_url: lookup("CACHE_REDIS_URL").unwrap_or(defaults.remote_url),
            pool_size: lookup("CACHE_POOL_SIZE")
                .and_then(|v| v.trim().parse().ok())
                .filter(|size: &usize| *size > 0)
                .unwrap_or(defaults.pool_size),
            timeout: number("CACHE_TIMEOUT")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            sweep_interval: seconds("CACHE_SWEEP_INTERVAL", defaults.sweep_interval),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            store_kind: "memory".to_string(),
            max_size: 1000,
            default_ttl: Some(Duration::from_secs(300)),
            key_prefix: "cache".to_string(),
            compress: false,
            remote_url: "redis://127.0.0.1:6379/0".to_string(),
            pool_size: 16,
            timeout: Duration::from_secs(5),
            sweep_interval: Some(Duration::from_secs(60)),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
