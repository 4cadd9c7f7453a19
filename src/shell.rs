//! Command Shell
//!
//! Line-oriented commands for driving a [`CacheManager`] interactively.
//! Replies follow the usual redis-cli conventions: `OK`, `(nil)`,
//! `(integer) n`, and JSON for the report commands.

use std::collections::HashMap;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::cache::CacheManager;
use crate::error::{CacheError, Result};

// == Command ==
/// One parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Get(String),
    Set {
        key: String,
        value: String,
        ttl: Option<Duration>,
    },
    Del(String),
    Exists(String),
    Incr(String, i64),
    Decr(String, i64),
    MGet(Vec<String>),
    MSet(Vec<(String, String)>),
    Clear,
    Size,
    Stats,
    Ping,
    Info,
    Metrics,
}

impl Command {
    /// Parses a single input line. Command names are case-insensitive.
    pub fn parse(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let name = parts
            .next()
            .ok_or_else(|| CacheError::InvalidCommand("empty input".to_string()))?
            .to_ascii_uppercase();
        let args: Vec<&str> = parts.collect();

        let command = match (name.as_str(), args.as_slice()) {
            ("GET", [key]) => Command::Get(key.to_string()),
            ("SET", [key, value]) => Command::Set {
                key: key.to_string(),
                value: value.to_string(),
                ttl: None,
            },
            ("SET", [key, value, ttl]) => Command::Set {
                key: key.to_string(),
                value: value.to_string(),
                ttl: Some(parse_ttl(ttl)?),
            },
            ("DEL", [key]) => Command::Del(key.to_string()),
            ("EXISTS", [key]) => Command::Exists(key.to_string()),
            ("INCR", [key]) => Command::Incr(key.to_string(), 1),
            ("INCR", [key, amount]) => Command::Incr(key.to_string(), parse_amount(amount)?),
            ("DECR", [key]) => Command::Decr(key.to_string(), 1),
            ("DECR", [key, amount]) => Command::Decr(key.to_string(), parse_amount(amount)?),
            ("MGET", keys) if !keys.is_empty() => {
                Command::MGet(keys.iter().map(|k| k.to_string()).collect())
            }
            ("MSET", pairs) if !pairs.is_empty() && pairs.len() % 2 == 0 => Command::MSet(
                pairs
                    .chunks(2)
                    .map(|pair| (pair[0].to_string(), pair[1].to_string()))
                    .collect(),
            ),
            ("CLEAR", []) => Command::Clear,
            ("SIZE", []) => Command::Size,
            ("STATS", []) => Command::Stats,
            ("PING", []) => Command::Ping,
            ("INFO", []) => Command::Info,
            ("METRICS", []) => Command::Metrics,
            _ => {
                return Err(CacheError::InvalidCommand(format!(
                    "unknown command or wrong number of arguments: {}",
                    line.trim()
                )))
            }
        };
        Ok(command)
    }
}

fn parse_ttl(raw: &str) -> Result<Duration> {
    raw.parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| CacheError::InvalidCommand(format!("ttl must be whole seconds: {}", raw)))
}

fn parse_amount(raw: &str) -> Result<i64> {
    raw.parse::<i64>()
        .map_err(|_| CacheError::InvalidCommand(format!("amount must be an integer: {}", raw)))
}

// == Execution ==
/// Runs `command` against `manager` and renders the reply.
pub async fn execute(manager: &CacheManager, command: Command) -> String {
    match command {
        Command::Get(key) => render_value(manager.get(&key).await),
        Command::Set { key, value, ttl } => render_ack(manager.set(&key, &value, ttl).await),
        Command::Del(key) => render_flag(manager.delete(&key).await),
        Command::Exists(key) => render_flag(manager.exists(&key).await),
        Command::Incr(key, amount) => render_counter(manager.increment(&key, amount, None).await),
        Command::Decr(key, amount) => render_counter(manager.decrement(&key, amount, None).await),
        Command::MGet(keys) => {
            let found = manager.get_multi(&keys).await;
            keys.iter()
                .enumerate()
                .map(|(i, key)| {
                    let value = found.get(key).cloned().flatten();
                    format!("{}) {}", i + 1, render_value(value))
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        Command::MSet(pairs) => {
            let values: HashMap<String, String> = pairs.into_iter().collect();
            render_ack(manager.set_multi(&values, None).await)
        }
        Command::Clear => render_ack(manager.clear().await),
        Command::Size => format!("(integer) {}", manager.size().await),
        Command::Stats => render_json(&manager.stats().await),
        Command::Ping => manager.ping().await.unwrap_or_else(|| "(nil)".to_string()),
        Command::Info => match manager.info().await {
            Some(info) => render_json(&info),
            None => "(nil)".to_string(),
        },
        Command::Metrics => "(error) no metrics exporter installed".to_string(),
    }
}

/// Like [`execute`], but answers `METRICS` from a Prometheus exporter.
pub async fn dispatch(
    manager: &CacheManager,
    metrics: Option<&PrometheusHandle>,
    command: Command,
) -> String {
    match (command, metrics) {
        (Command::Metrics, Some(handle)) => handle.render(),
        (command, _) => execute(manager, command).await,
    }
}

fn render_value(value: Option<String>) -> String {
    match value {
        Some(value) => format!("\"{}\"", value),
        None => "(nil)".to_string(),
    }
}

fn render_ack(accepted: bool) -> String {
    let reply = if accepted { "OK" } else { "(error) not stored" };
    reply.to_string()
}

fn render_flag(flag: bool) -> String {
    format!("(integer) {}", u8::from(flag))
}

fn render_counter(value: Option<i64>) -> String {
    match value {
        Some(value) => format!("(integer) {}", value),
        None => "(error) value is not an integer or store unavailable".to_string(),
    }
}

fn render_json<T: serde::Serialize>(report: &T) -> String {
    serde_json::to_string_pretty(report)
        .unwrap_or_else(|e| format!("(error) failed to render report: {}", e))
}
