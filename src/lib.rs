//! Cache Engine - a pluggable key/value cache
//!
//! One manager façade over interchangeable stores: an in-process LRU/TTL
//! memory store, a pooled Redis store and a no-op store.

pub mod cache;
pub mod config;
pub mod error;
pub mod shell;
pub mod tasks;

pub use cache::{CacheManager, MetricsRecorder, MetricsSink, Store, StoreKind};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::{shutdown_signal, spawn_sweeper, ShutdownSignal};
