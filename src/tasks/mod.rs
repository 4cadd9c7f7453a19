//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a manager is alive,
//! and the process shutdown signal.
//!
//! # Tasks
//! - Expiry sweep: Removes expired in-process entries at a configured interval
//! - Shutdown: Resolves on Ctrl+C or SIGTERM

mod shutdown;
mod sweeper;

pub use shutdown::{shutdown_signal, ShutdownSignal};
pub use sweeper::spawn_sweeper;
