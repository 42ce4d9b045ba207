//! Redis-based cache facade.

use crate::cache_interface::{CacheInfo, CacheInterface};
use crate::cache_keys;
use crate::config::CacheConfig;
use crate::connection::RedisHandle;
use crate::metrics::CacheMetrics;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use stratus_core::{StratusError, StratusResult};
use stratus_resilience::{with_timeout, CircuitBreaker, CircuitBreakerError, CircuitState, TimeoutConfig};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Short TTL tier (5 minutes).
pub const TTL_SHORT: Duration = Duration::from_secs(5 * 60);
/// Medium TTL tier (30 minutes).
pub const TTL_MEDIUM: Duration = Duration::from_secs(30 * 60);
/// Long TTL tier (2 hours).
pub const TTL_LONG: Duration = Duration::from_secs(2 * 60 * 60);
/// Very long TTL tier (24 hours).
pub const TTL_VERY_LONG: Duration = Duration::from_secs(24 * 60 * 60);
/// Default TTL for cached items.
pub const DEFAULT_TTL: Duration = TTL_SHORT;

/// Keys requested per SCAN round trip.
const SCAN_BATCH: usize = 100;

/// Keys deleted per DEL command during pattern deletes, to keep any
/// single store command bounded.
const DELETE_CHUNK: usize = 512;

struct Inner {
    handle: RedisHandle,
    breaker: CircuitBreaker,
    timeouts: TimeoutConfig,
    invalidations: Semaphore,
}

/// Redis-backed cache facade.
///
/// Every operation runs through one shared circuit breaker and under its
/// own bounded deadline, so a slow or unhealthy store can neither block a
/// caller indefinitely nor serialize timeouts across the application.
/// Cloning is cheap and all clones share breaker and connection state.
#[derive(Clone)]
pub struct RedisCache {
    inner: Arc<Inner>,
}

impl RedisCache {
    /// Create a facade with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Create a facade with custom deadlines and breaker tuning.
    #[must_use]
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                handle: RedisHandle::new(),
                breaker: CircuitBreaker::new("redis-cache", config.breaker),
                timeouts: config.timeouts,
                invalidations: Semaphore::new(config.invalidation_concurrency),
            }),
        }
    }

    /// Connect to the store. Called once at process startup; see
    /// [`RedisHandle::initialize`] for the concurrency contract.
    pub async fn initialize(&self, uri: &str) -> StratusResult<()> {
        self.inner.handle.initialize(uri).await
    }

    /// Release the store connection. Idempotent.
    pub async fn close(&self) -> StratusResult<()> {
        self.inner.handle.close().await
    }

    /// Current circuit breaker state, for operational introspection.
    #[must_use]
    pub fn breaker_state(&self) -> CircuitState {
        self.inner.breaker.state()
    }

    /// Queue best-effort deletion of all keys matching `pattern`.
    ///
    /// Returns immediately; the scan runs on a detached task bounded by
    /// the invalidation semaphore. Failures are logged, never surfaced,
    /// so write paths can request invalidation without paying cache
    /// round-trip latency. The trade-off is a staleness window between
    /// the triggering write and the eventual purge.
    pub fn invalidate_pattern(&self, pattern: impl Into<String>) {
        let cache = self.clone();
        let pattern = pattern.into();
        tokio::spawn(async move {
            let Ok(_permit) = cache.inner.invalidations.acquire().await else {
                return;
            };
            match cache.delete_pattern(&pattern).await {
                Ok(count) => debug!(
                    "Background invalidation removed {} entries matching '{}'",
                    count, pattern
                ),
                Err(e) => warn!("Background invalidation for '{}' failed: {}", pattern, e),
            }
        });
    }

    /// Queue best-effort deletion of the given keys. Fire-and-forget,
    /// like [`RedisCache::invalidate_pattern`].
    pub fn invalidate_keys(&self, keys: Vec<String>) {
        if keys.is_empty() {
            return;
        }
        let cache = self.clone();
        tokio::spawn(async move {
            let Ok(_permit) = cache.inner.invalidations.acquire().await else {
                return;
            };
            for key in &keys {
                if let Err(e) = cache.delete(key).await {
                    warn!("Background invalidation for key '{}' failed: {}", key, e);
                }
            }
        });
    }

    /// Run one store operation under the breaker and a deadline.
    ///
    /// Deadline exhaustion surfaces as `Timeout` and counts as a breaker
    /// failure; a breaker rejection never touches the store.
    async fn execute<T, F, Fut>(&self, deadline: Duration, op: F) -> StratusResult<T>
    where
        F: FnOnce(ConnectionManager) -> Fut,
        Fut: Future<Output = StratusResult<T>>,
    {
        let conn = self.inner.handle.manager().await?;
        match self
            .inner
            .breaker
            .call(|| with_timeout(deadline, || op(conn)))
            .await
        {
            Ok(value) => Ok(value),
            Err(CircuitBreakerError::Open(name)) => {
                debug!("Circuit breaker '{}' rejected cache call", name);
                Err(StratusError::CircuitOpen(name))
            }
            Err(CircuitBreakerError::Failure(e)) => Err(e),
        }
    }
}

impl Default for RedisCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheInterface for RedisCache {
    async fn get_raw(&self, key: &str) -> StratusResult<Option<String>> {
        if key.is_empty() {
            return Err(StratusError::encode("cache key must not be empty"));
        }

        let result = self
            .execute(self.inner.timeouts.point_op, |mut conn| async move {
                conn.get::<_, Option<String>>(key)
                    .await
                    .map_err(|e| StratusError::store(format!("Failed to get key '{}': {}", key, e)))
            })
            .await;

        match &result {
            Ok(Some(_)) => {
                debug!("Cache hit for key '{}'", key);
                CacheMetrics::hit("get");
            }
            Ok(None) => {
                debug!("Cache miss for key '{}'", key);
                CacheMetrics::miss("get");
            }
            Err(StratusError::CircuitOpen(_) | StratusError::NotInitialized) => {}
            Err(_) => CacheMetrics::error("get"),
        }

        result
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> StratusResult<()> {
        if !self.inner.handle.is_initialized().await {
            warn!("Cache not initialized; dropping write for key '{}'", key);
            return Ok(());
        }

        let expiry = expiry_seconds(ttl);
        let result = self
            .execute(self.inner.timeouts.point_op, |mut conn| async move {
                match expiry {
                    None => conn.set::<_, _, ()>(key, value).await,
                    Some(secs) => conn.set_ex::<_, _, ()>(key, value, secs).await,
                }
                .map_err(|e| StratusError::store(format!("Failed to set key '{}': {}", key, e)))
            })
            .await;

        match result {
            Ok(()) => {
                debug!("Cached key '{}' with TTL {:?}", key, ttl);
                CacheMetrics::hit("set");
            }
            Err(StratusError::CircuitOpen(_) | StratusError::NotInitialized) => {
                debug!("Cache unavailable; dropped write for key '{}'", key);
            }
            Err(e) => {
                warn!("Cache write for key '{}' failed: {}", key, e);
                CacheMetrics::error("set");
            }
        }

        // Write-path policy: a degraded cache never fails the caller.
        Ok(())
    }

    async fn delete(&self, key: &str) -> StratusResult<bool> {
        if !self.inner.handle.is_initialized().await {
            warn!("Cache not initialized; skipping delete for key '{}'", key);
            return Ok(false);
        }

        let result = self
            .execute(self.inner.timeouts.point_op, |mut conn| async move {
                conn.del::<_, i64>(key).await.map_err(|e| {
                    StratusError::store(format!("Failed to delete key '{}': {}", key, e))
                })
            })
            .await;

        match result {
            Ok(deleted) => {
                debug!("Deleted key '{}': {}", key, deleted > 0);
                CacheMetrics::hit("delete");
                Ok(deleted > 0)
            }
            Err(StratusError::CircuitOpen(_) | StratusError::NotInitialized) => Ok(false),
            Err(e) => {
                warn!("Cache delete for key '{}' failed: {}", key, e);
                CacheMetrics::error("delete");
                Ok(false)
            }
        }
    }

    async fn delete_pattern(&self, pattern: &str) -> StratusResult<u64> {
        if !self.inner.handle.is_initialized().await {
            warn!(
                "Cache not initialized; skipping pattern delete '{}'",
                pattern
            );
            return Ok(0);
        }

        let result = self
            .execute(self.inner.timeouts.pattern_scan, |mut conn| async move {
                let keys = scan_keys(&mut conn, pattern).await?;
                if keys.is_empty() {
                    return Ok(0);
                }

                let mut deleted = 0u64;
                for chunk in keys.chunks(DELETE_CHUNK) {
                    let removed: i64 = conn.del(chunk).await.map_err(|e| {
                        StratusError::store(format!(
                            "Failed to delete keys matching '{}': {}",
                            pattern, e
                        ))
                    })?;
                    deleted += removed as u64;
                }
                Ok(deleted)
            })
            .await;

        match result {
            Ok(deleted) => {
                debug!("Deleted {} keys matching pattern '{}'", deleted, pattern);
                CacheMetrics::hit("delete_pattern");
                Ok(deleted)
            }
            Err(StratusError::CircuitOpen(_) | StratusError::NotInitialized) => Ok(0),
            Err(e) => {
                warn!("Pattern delete '{}' failed: {}", pattern, e);
                CacheMetrics::error("delete_pattern");
                Ok(0)
            }
        }
    }

    async fn exists(&self, key: &str) -> StratusResult<bool> {
        let result = self
            .execute(self.inner.timeouts.point_op, |mut conn| async move {
                conn.exists::<_, bool>(key).await.map_err(|e| {
                    StratusError::store(format!("Failed to check key '{}': {}", key, e))
                })
            })
            .await;

        match &result {
            Ok(true) => CacheMetrics::hit("exists"),
            Ok(false) => CacheMetrics::miss("exists"),
            Err(StratusError::CircuitOpen(_) | StratusError::NotInitialized) => {}
            Err(_) => CacheMetrics::error("exists"),
        }

        result
    }

    async fn ttl(&self, key: &str) -> StratusResult<Duration> {
        let result = self
            .execute(self.inner.timeouts.point_op, |mut conn| async move {
                conn.ttl::<_, i64>(key).await.map_err(|e| {
                    StratusError::store(format!("Failed to read TTL for key '{}': {}", key, e))
                })
            })
            .await;

        match result {
            // -2: key does not exist, -1: key has no expiry.
            Ok(-2) => {
                CacheMetrics::miss("ttl");
                Err(StratusError::Miss(key.to_string()))
            }
            Ok(secs) if secs < 0 => {
                CacheMetrics::hit("ttl");
                Ok(Duration::ZERO)
            }
            Ok(secs) => {
                CacheMetrics::hit("ttl");
                Ok(Duration::from_secs(secs as u64))
            }
            Err(e) => {
                if !matches!(
                    e,
                    StratusError::CircuitOpen(_) | StratusError::NotInitialized
                ) {
                    CacheMetrics::error("ttl");
                }
                Err(e)
            }
        }
    }

    async fn flush_all(&self) -> StratusResult<()> {
        let result = self
            .execute(self.inner.timeouts.flush, |mut conn| async move {
                redis::cmd("FLUSHALL")
                    .query_async::<String>(&mut conn)
                    .await
                    .map(|_| ())
                    .map_err(|e| StratusError::store(format!("Failed to flush cache: {}", e)))
            })
            .await;

        match result {
            Ok(()) => {
                info!("Flushed all cache entries");
                Ok(())
            }
            Err(e) => {
                // Administrative operation: counts only errors.
                if !matches!(
                    e,
                    StratusError::CircuitOpen(_) | StratusError::NotInitialized
                ) {
                    CacheMetrics::error("flush_all");
                }
                Err(e)
            }
        }
    }

    async fn stats(&self) -> StratusResult<HashMap<String, String>> {
        let result = self
            .execute(self.inner.timeouts.stats, |mut conn| async move {
                redis::cmd("INFO")
                    .query_async::<String>(&mut conn)
                    .await
                    .map_err(|e| StratusError::store(format!("Failed to read store stats: {}", e)))
            })
            .await;

        match result {
            Ok(text) => Ok(parse_info(&text)),
            Err(e) => {
                if !matches!(
                    e,
                    StratusError::CircuitOpen(_) | StratusError::NotInitialized
                ) {
                    CacheMetrics::error("stats");
                }
                Err(e)
            }
        }
    }

    async fn cache_info(&self) -> StratusResult<CacheInfo> {
        let result = self
            .execute(self.inner.timeouts.pattern_scan, |mut conn| async move {
                scan_keys(&mut conn, "*").await
            })
            .await;

        match result {
            Ok(keys) => {
                CacheMetrics::hit("cache_info");
                Ok(summarize_keys(&keys))
            }
            Err(e) => {
                if !matches!(
                    e,
                    StratusError::CircuitOpen(_) | StratusError::NotInitialized
                ) {
                    CacheMetrics::error("cache_info");
                }
                Err(e)
            }
        }
    }

    async fn is_available(&self) -> bool {
        if !self.inner.handle.is_initialized().await {
            return false;
        }

        self.execute(self.inner.timeouts.point_op, |mut conn| async move {
            redis::cmd("PING")
                .query_async::<String>(&mut conn)
                .await
                .map(|_| ())
                .map_err(|e| StratusError::connection(format!("Liveness probe failed: {}", e)))
        })
        .await
        .is_ok()
    }
}

/// Collect every key matching `pattern` via iterative SCAN, so no single
/// command blocks the store the way KEYS would.
async fn scan_keys(conn: &mut ConnectionManager, pattern: &str) -> StratusResult<Vec<String>> {
    let mut keys = Vec::new();
    let mut cursor: u64 = 0;

    loop {
        let (next_cursor, batch): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(SCAN_BATCH)
            .query_async(conn)
            .await
            .map_err(|e| {
                StratusError::store(format!("Failed to scan keys matching '{}': {}", pattern, e))
            })?;

        keys.extend(batch);
        cursor = next_cursor;
        if cursor == 0 {
            break;
        }
    }

    Ok(keys)
}

/// Expiry for a SETEX in whole seconds, or `None` for a zero TTL (store
/// without expiry). SETEX granularity is whole seconds, so a non-zero
/// sub-second TTL rounds up to one second rather than truncating to an
/// immortal key.
fn expiry_seconds(ttl: Duration) -> Option<u64> {
    if ttl.is_zero() {
        None
    } else {
        Some(ttl.as_secs().max(1))
    }
}

/// Parse the store's INFO text format: `key:value` lines, skipping
/// comments and malformed lines.
fn parse_info(text: &str) -> HashMap<String, String> {
    let mut parsed = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            parsed.insert(key.to_string(), value.to_string());
        }
    }
    parsed
}

/// Group keys by domain prefix for keyspace introspection.
fn summarize_keys(keys: &[String]) -> CacheInfo {
    let mut keys_by_prefix: HashMap<String, u64> = HashMap::new();
    for key in keys {
        *keys_by_prefix
            .entry(cache_keys::key_prefix(key).to_string())
            .or_default() += 1;
    }
    CacheInfo {
        total_keys: keys.len() as u64,
        keys_by_prefix,
    }
}
