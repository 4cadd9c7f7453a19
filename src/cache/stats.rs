//! Cache Statistics Module
//!
//! Tracks memory-store counters and defines the value type of the
//! `stats()` report.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

// == Stat Value ==
/// A single value in a stats report; serializes as a bare JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl StatValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            StatValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StatValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Int(v) => write!(f, "{}", v),
            StatValue::Float(v) => write!(f, "{:.4}", v),
            StatValue::Text(v) => f.write_str(v),
            StatValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

impl From<u64> for StatValue {
    fn from(v: u64) -> Self {
        StatValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<usize> for StatValue {
    fn from(v: usize) -> Self {
        StatValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<i64> for StatValue {
    fn from(v: i64) -> Self {
        StatValue::Int(v)
    }
}

impl From<f64> for StatValue {
    fn from(v: f64) -> Self {
        StatValue::Float(v)
    }
}

impl From<bool> for StatValue {
    fn from(v: bool) -> Self {
        StatValue::Bool(v)
    }
}

impl From<&str> for StatValue {
    fn from(v: &str) -> Self {
        StatValue::Text(v.to_string())
    }
}

impl From<String> for StatValue {
    fn from(v: String) -> Self {
        StatValue::Text(v)
    }
}

/// Stats report keyed by metric name.
pub type StatsMap = BTreeMap<String, StatValue>;

// == Hit Rate ==
/// Calculates hits / (hits + misses), or 0.0 if no reads have been made.
pub fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

// == Cache Stats ==
/// Memory-store counters, mutated under the store lock.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Reads that found a live entry
    pub hits: u64,
    /// Reads that found nothing or an expired entry
    pub misses: u64,
    /// Entries removed by the LRU policy
    pub evictions: u64,
    /// Entries removed because their TTL elapsed
    pub expirations: u64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit_rate(&self) -> f64 {
        hit_rate(self.hits, self.misses)
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    /// Writes the counters into a stats report.
    pub fn fill(&self, report: &mut StatsMap) {
        report.insert("memory_hits".to_string(), self.hits.into());
        report.insert("memory_misses".to_string(), self.misses.into());
        report.insert("evictions".to_string(), self.evictions.into());
        report.insert("expirations".to_string(), self.expirations.into());
    }
}
