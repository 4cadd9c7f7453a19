//! Metrics Module
//!
//! Optional per-operation instrumentation for the manager.

use std::fmt;
use std::time::Duration;

use crate::cache::StoreKind;

// == Operation ==
/// Manager operations that are timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Fetch,
    Set,
    Delete,
    Exists,
    Clear,
    Size,
    GetMulti,
    SetMulti,
    Increment,
    Decrement,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::Fetch => "fetch",
            Operation::Set => "set",
            Operation::Delete => "delete",
            Operation::Exists => "exists",
            Operation::Clear => "clear",
            Operation::Size => "size",
            Operation::GetMulti => "get_multi",
            Operation::SetMulti => "set_multi",
            Operation::Increment => "increment",
            Operation::Decrement => "decrement",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Operation Sample ==
/// One timed store call.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationSample {
    /// Namespaced key, or a summary such as `*` for whole-store calls
    pub key: String,
    pub operation: Operation,
    pub store: StoreKind,
    pub key_size: usize,
    pub value_size: Option<usize>,
    pub ttl: Option<Duration>,
    /// Hit for reads, accepted for writes
    pub success: bool,
    pub duration: Duration,
}

// == Metrics Sink ==
/// Receiver of operation samples.
///
/// The manager only holds a weak handle, so the sink's owner controls its
/// lifetime. Implementations must be cheap; `record` runs on the caller's task.
pub trait MetricsSink: Send + Sync {
    fn record(&self, sample: &OperationSample);
}

// == Metrics Recorder ==
/// Sink forwarding samples to the `metrics` facade.
///
/// Emits `cache_operations_total` and `cache_operation_duration_seconds`
/// labelled by operation, store and outcome, plus `cache_key_bytes` and
/// `cache_value_bytes` size histograms.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsRecorder;

impl MetricsRecorder {
    pub fn new() -> Self {
        Self
    }
}

impl MetricsSink for MetricsRecorder {
    fn record(&self, sample: &OperationSample) {
        let operation = sample.operation.as_str();
        let store = sample.store.as_str();
        let outcome = if sample.success { "ok" } else { "miss" };

        metrics::counter!(
            "cache_operations_total",
            "operation" => operation,
            "store" => store,
            "outcome" => outcome
        )
        .increment(1);
        metrics::histogram!(
            "cache_operation_duration_seconds",
            "operation" => operation,
            "store" => store
        )
        .record(sample.duration.as_secs_f64());
        metrics::histogram!("cache_key_bytes", "operation" => operation)
            .record(sample.key_size as f64);
        if let Some(size) = sample.value_size {
            metrics::histogram!("cache_value_bytes", "operation" => operation).record(size as f64);
        }
    }
}
