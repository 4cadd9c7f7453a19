//! Cache Engine shell
//!
//! Reads commands from stdin and runs them against a cache manager built
//! from the environment.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cache_engine::shell::{dispatch, Command};
use cache_engine::tasks::{shutdown_signal, ShutdownSignal};
use cache_engine::{spawn_sweeper, CacheManager, Config, MetricsRecorder, MetricsSink};

const METRICS_UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Main entry point for the cache shell.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Install the Prometheus metrics recorder
/// 4. Build the cache manager with the configured store
/// 5. Start the background expiry sweeper
/// 6. Serve stdin commands until EOF, Ctrl+C or SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" for this crate, can be overridden with RUST_LOG
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cache_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting cache engine shell");

    let config = Config::from_env();
    info!(
        store = %config.store_kind,
        enabled = config.enabled,
        max_size = config.max_size,
        default_ttl_secs = config.default_ttl.map(|ttl| ttl.as_secs()),
        "Configuration loaded"
    );

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install metrics exporter")?;
    let upkeep = spawn_metrics_upkeep(metrics.clone());

    let recorder: Arc<dyn MetricsSink> = Arc::new(MetricsRecorder::new());
    let manager = Arc::new(
        CacheManager::new(&config)
            .context("failed to build cache manager")?
            .with_metrics(Arc::downgrade(&recorder)),
    );

    let sweeper = config
        .sweep_interval
        .map(|interval| spawn_sweeper(&manager, interval));

    tokio::select! {
        result = serve(&manager, &metrics) => result?,
        signal = shutdown_signal() => match signal? {
            ShutdownSignal::Interrupt => info!("Received Ctrl+C, shutting down"),
            ShutdownSignal::Terminate => info!("Received SIGTERM, shutting down"),
        },
    }

    if let Some(handle) = sweeper {
        handle.abort();
        warn!("Expiry sweeper aborted");
    }
    upkeep.abort();

    info!("Shutdown complete");
    Ok(())
}

/// Drains the exporter's histogram buffers so `METRICS` stays bounded.
fn spawn_metrics_upkeep(handle: PrometheusHandle) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(METRICS_UPKEEP_INTERVAL);
        loop {
            interval.tick().await;
            handle.run_upkeep();
        }
    })
}

/// Runs one command per stdin line until EOF.
async fn serve(manager: &CacheManager, metrics: &PrometheusHandle) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = match Command::parse(&line) {
            Ok(command) => dispatch(manager, Some(metrics), command).await,
            Err(e) => format!("(error) {}", e),
        };
        stdout.write_all(reply.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    Ok(())
}
