//! Shutdown Signal
//!
//! Waits for the process to be asked to stop.

use std::io;

use tokio::signal;

/// Which signal ended the wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// Ctrl+C / SIGINT
    Interrupt,
    /// SIGTERM (unix only)
    Terminate,
}

/// Resolves on the first Ctrl+C or SIGTERM.
///
/// Fails only if a signal handler cannot be installed.
pub async fn shutdown_signal() -> io::Result<ShutdownSignal> {
    tokio::select! {
        result = signal::ctrl_c() => result.map(|()| ShutdownSignal::Interrupt),
        result = terminate() => result.map(|()| ShutdownSignal::Terminate),
    }
}

#[cfg(unix)]
async fn terminate() -> io::Result<()> {
    let mut stream = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    stream.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn terminate() -> io::Result<()> {
    std::future::pending().await
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Command;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sigterm_ends_the_wait() {
        let waiter = tokio::spawn(shutdown_signal());
        // Let the task install its handlers before signalling
        tokio::time::sleep(Duration::from_millis(100)).await;

        let status = Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        let received = tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("shutdown signal not observed")
            .unwrap()
            .unwrap();
        assert_eq!(received, ShutdownSignal::Terminate);
    }
}
