//! Remote Store Module
//!
//! Redis-backed store over a `deadpool-redis` connection pool.
//!
//! Every remote call is fail-open: pool, transport and protocol errors are
//! logged and turned into the primitive's miss/false/absent value, so an
//! outage looks like an empty cache that silently drops writes.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::redis::{self, IntoConnectionInfo};
use deadpool_redis::{Config as PoolSettings, Connection, Pool, PoolConfig, Runtime};
use tracing::{debug, warn};

use crate::cache::store::{pointwise_get_multi, pointwise_set_multi};
use crate::cache::{StatValue, StatsMap, Store, StoreKind};
use crate::error::Result;

// == Remote Store ==
/// Pooled client for a Redis-protocol server.
pub struct RemoteStore {
    pool: Pool,
    /// Logical database selected by the connection URL
    db: i64,
    default_ttl: Option<Duration>,
}

impl RemoteStore {
    // == Constructor ==
    /// Builds the connection pool. No connection is opened until first use.
    ///
    /// `timeout` bounds pool checkout, connection setup and recycling.
    pub fn connect(
        url: &str,
        pool_size: usize,
        timeout: Duration,
        default_ttl: Option<Duration>,
    ) -> Result<Self> {
        let mut pool_config = PoolConfig::new(pool_size.max(1));
        pool_config.timeouts.wait = Some(timeout);
        pool_config.timeouts.create = Some(timeout);
        pool_config.timeouts.recycle = Some(timeout);

        let mut settings = PoolSettings::from_url(url);
        settings.pool = Some(pool_config);
        let pool = settings.create_pool(Some(Runtime::Tokio1))?;
        let db = url.into_connection_info()?.redis.db;

        debug!(pool_size, db, ?timeout, "remote cache pool created");
        Ok(Self {
            pool,
            db,
            default_ttl,
        })
    }

    /// Logical database index this store reads and writes.
    pub fn db(&self) -> i64 {
        self.db
    }

    // == Diagnostics ==
    /// Round-trips a PING; None if the server is unreachable.
    pub async fn ping(&self) -> Option<String> {
        let result = self.try_ping().await;
        fail_open("ping", "", result, None)
    }

    /// Server INFO as key/value pairs; None if the server is unreachable.
    pub async fn info(&self) -> Option<BTreeMap<String, String>> {
        let result = self.try_info(None).await;
        fail_open("info", "", result.map(|text| Some(parse_info(&text))), None)
    }

    fn effective_ttl(&self, ttl: Option<Duration>) -> Option<Duration> {
        ttl.or(self.default_ttl)
    }

    async fn connection(&self) -> Result<Connection> {
        Ok(self.pool.get().await?)
    }

    // == Raw Calls ==
    async fn try_get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn try_set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.connection().await?;
        match ttl {
            Some(ttl) => {
                let _: () = redis::cmd("PSETEX")
                    .arg(key)
                    .arg(ttl_millis(ttl))
                    .arg(value)
                    .query_async(&mut conn)
                    .await?;
            }
            None => {
                let _: () = redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .query_async(&mut conn)
                    .await?;
            }
        }
        Ok(())
    }

    async fn try_delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let removed: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(removed > 0)
    }

    async fn try_exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let found: i64 = redis::cmd("EXISTS").arg(key).query_async(&mut conn).await?;
        Ok(found > 0)
    }

    async fn try_clear(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await?;
        Ok(())
    }

    async fn try_ping(&self) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(Some(reply))
    }

    async fn try_info(&self, section: Option<&str>) -> Result<String> {
        let mut conn = self.connection().await?;
        let mut cmd = redis::cmd("INFO");
        if let Some(section) = section {
            cmd.arg(section);
        }
        let text: String = cmd.query_async(&mut conn).await?;
        Ok(text)
    }

    /// INCRBY/DECRBY, then PEXPIRE only if this call created the counter.
    async fn try_counter(
        &self,
        command: &str,
        key: &str,
        amount: i64,
        created_value: Option<i64>,
        ttl: Option<Duration>,
    ) -> Result<i64> {
        let mut conn = self.connection().await?;
        let value: i64 = redis::cmd(command)
            .arg(key)
            .arg(amount)
            .query_async(&mut conn)
            .await?;

        if let (Some(ttl), true) = (ttl, created_value == Some(value)) {
            let expiry: redis::RedisResult<()> = redis::cmd("PEXPIRE")
                .arg(key)
                .arg(ttl_millis(ttl))
                .query_async(&mut conn)
                .await;
            return Ok(settle_counter(key, value, expiry.map_err(Into::into)));
        }
        Ok(value)
    }

    async fn try_get_multi(&self, keys: &[String]) -> Result<HashMap<String, Option<String>>> {
        let mut conn = self.connection().await?;
        let values: Vec<Option<String>> = redis::cmd("MGET").arg(keys).query_async(&mut conn).await?;
        Ok(keys.iter().cloned().zip(values).collect())
    }

    async fn try_set_multi(
        &self,
        values: &HashMap<String, String>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let mut conn = self.connection().await?;
        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, value) in values {
            match ttl {
                Some(ttl) => {
                    pipe.cmd("PSETEX").arg(key).arg(ttl_millis(ttl)).arg(value).ignore();
                }
                None => {
                    pipe.cmd("SET").arg(key).arg(value).ignore();
                }
            }
        }
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for RemoteStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Remote
    }

    async fn get(&self, key: &str) -> Option<String> {
        let result = self.try_get(key).await;
        fail_open("get", key, result, None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> bool {
        let result = self.try_set(key, value, self.effective_ttl(ttl)).await;
        fail_open("set", key, result.map(|()| true), false)
    }

    async fn delete(&self, key: &str) -> bool {
        let result = self.try_delete(key).await;
        fail_open("delete", key, result, false)
    }

    async fn exists(&self, key: &str) -> bool {
        let result = self.try_exists(key).await;
        fail_open("exists", key, result, false)
    }

    async fn clear(&self) -> bool {
        let result = self.try_clear().await;
        fail_open("clear", "", result.map(|()| true), false)
    }

    async fn size(&self) -> usize {
        let result = self.try_info(Some("keyspace")).await;
        let db = self.db;
        fail_open("size", "", result.map(|text| parse_keyspace_keys(&text, db)), 0)
    }

    async fn get_multi(&self, keys: &[String]) -> HashMap<String, Option<String>> {
        if keys.is_empty() {
            return HashMap::new();
        }
        match self.try_get_multi(keys).await {
            Ok(found) => found,
            Err(err) => {
                warn!(keys = keys.len(), error = %err, "MGET failed, falling back to single gets");
                pointwise_get_multi(self, keys).await
            }
        }
    }

    async fn set_multi(&self, values: &HashMap<String, String>, ttl: Option<Duration>) -> bool {
        if values.is_empty() {
            return true;
        }
        let ttl = self.effective_ttl(ttl);
        match self.try_set_multi(values, ttl).await {
            Ok(()) => true,
            Err(err) => {
                warn!(keys = values.len(), error = %err, "pipelined set failed, falling back to single sets");
                pointwise_set_multi(self, values, ttl).await
            }
        }
    }

    async fn increment(&self, key: &str, amount: i64, ttl: Option<Duration>) -> Option<i64> {
        let ttl = self.effective_ttl(ttl);
        let result = self.try_counter("INCRBY", key, amount, Some(amount), ttl).await;
        fail_open("increment", key, result.map(Some), None)
    }

    async fn decrement(&self, key: &str, amount: i64, ttl: Option<Duration>) -> Option<i64> {
        let ttl = self.effective_ttl(ttl);
        let result = self
            .try_counter("DECRBY", key, amount, amount.checked_neg(), ttl)
            .await;
        fail_open("decrement", key, result.map(Some), None)
    }

    async fn extras(&self) -> StatsMap {
        let status = self.pool.status();
        let mut report = StatsMap::new();
        report.insert("pool_size".to_string(), StatValue::Int(status.max_size as i64));
        report.insert("pool_open".to_string(), StatValue::Int(status.size as i64));
        report.insert("pool_available".to_string(), StatValue::Int(status.available as i64));
        report.insert("pool_waiting".to_string(), StatValue::Int(status.waiting as i64));
        report
    }

    fn as_remote(&self) -> Option<&RemoteStore> {
        Some(self)
    }
}

// == Helpers ==
fn fail_open<T>(operation: &'static str, key: &str, result: Result<T>, fallback: T) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            warn!(operation, key, error = %err, "remote cache call failed");
            fallback
        }
    }
}

/// Millisecond TTL for PSETEX/PEXPIRE; the server rejects zero.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Counter value to report once INCRBY has been applied.
///
/// A failed PEXPIRE leaves the counter without expiry but does not undo the
/// increment, so the new value is still returned.
fn settle_counter(key: &str, value: i64, expiry: Result<()>) -> i64 {
    if let Err(err) = expiry {
        warn!(key, value, error = %err, "counter updated but PEXPIRE failed");
    }
    value
}

/// Reads `keys=<n>` from the `db{db}:` line of an INFO keyspace section.
///
/// Redis omits empty databases from that section, so a missing line means 0.
pub fn parse_keyspace_keys(info: &str, db: i64) -> usize {
    let prefix = format!("db{}:", db);
    info.lines()
        .find_map(|line| line.trim().strip_prefix(prefix.as_str()))
        .and_then(|fields| {
            fields
                .split(',')
                .find_map(|field| field.trim().strip_prefix("keys="))
        })
        .and_then(|count| count.parse().ok())
        .unwrap_or(0)
}

/// Splits INFO output into `field -> value`, skipping section headers.
pub fn parse_info(info: &str) -> BTreeMap<String, String> {
    info.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .map(|(field, value)| (field.to_string(), value.to_string()))
        .collect()
}
