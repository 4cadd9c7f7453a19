//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.
//!
//! Only construction errors ever reach a caller of the manager. Remote
//! transport and pool failures are produced inside the remote store and
//! swallowed there.

use deadpool_redis::redis::RedisError;
use deadpool_redis::{CreatePoolError, PoolError};
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Configured store kind is not one of memory, remote or null
    #[error("Unsupported cache store: {0}")]
    UnsupportedStore(String),

    /// Configuration value could not be used
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Connection pool could not be built
    #[error("Failed to create connection pool: {0}")]
    CreatePool(#[from] CreatePoolError),

    /// Connection checkout failed or timed out
    #[error("Connection pool error: {0}")]
    Pool(#[from] PoolError),

    /// Remote command failed
    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),

    /// Shell input could not be parsed
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
