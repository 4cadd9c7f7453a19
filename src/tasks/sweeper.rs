//! Expiry Sweeper Task
//!
//! Background task that periodically drops expired entries from the
//! manager's store.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheManager;

/// Spawns a background task that sweeps expired entries every `interval`.
///
/// The task only holds a weak handle to the manager and stops on its own
/// once the last strong reference is dropped. Stores without in-process
/// entries report nothing to sweep.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
///
/// # Example
/// ```ignore
/// let manager = Arc::new(CacheManager::new(&config)?);
/// let sweeper = spawn_sweeper(&manager, Duration::from_secs(60));
/// // Later, during shutdown:
/// sweeper.abort();
/// ```
pub fn spawn_sweeper(manager: &Arc<CacheManager>, interval: Duration) -> JoinHandle<()> {
    let manager: Weak<CacheManager> = Arc::downgrade(manager);

    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "starting expiry sweeper");

        loop {
            tokio::time::sleep(interval).await;

            let Some(manager) = manager.upgrade() else {
                debug!("cache manager dropped, stopping expiry sweeper");
                break;
            };

            let removed = manager.sweep_expired().await;
            if removed > 0 {
                info!(removed, "expiry sweep removed entries");
            } else {
                debug!("expiry sweep found no expired entries");
            }
        }
    })
}
