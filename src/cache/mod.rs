//! Cache Module
//!
//! Store abstraction with memory (LRU + TTL), remote (pooled Redis) and null
//! variants, fronted by [`CacheManager`].

mod entry;
mod lru;
mod manager;
mod memory;
mod metrics;
mod null;
mod remote;
mod stats;
pub mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use manager::CacheManager;
pub use memory::MemoryStore;
pub use metrics::{MetricsRecorder, MetricsSink, Operation, OperationSample};
pub use null::NullStore;
pub use remote::{parse_info, parse_keyspace_keys, RemoteStore};
pub use stats::{CacheStats, StatValue, StatsMap};
pub use store::{get_or_compute, Fetched, Store, StoreKind};

// == Public Constants ==
/// Maximum key length in bytes accepted by the memory store.
///
/// The limit applies to the stored key, so under a manager it covers the
/// namespaced `{prefix}:{key}` form.
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum value size in bytes accepted by the memory store
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB
