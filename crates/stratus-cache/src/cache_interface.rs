//! Cache interface trait for abstracted caching operations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use stratus_core::{StratusError, StratusResult};
use tracing::warn;

/// Keyspace summary returned by [`CacheInterface::cache_info`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheInfo {
    /// Total number of keys in the store.
    pub total_keys: u64,
    /// Key counts grouped by the substring before the first `_`.
    pub keys_by_prefix: HashMap<String, u64>,
}

/// Cache interface for storing and retrieving cached data.
///
/// This trait provides an abstraction over caching implementations,
/// allowing for easy swapping between Redis, in-memory, or other cache
/// backends.
///
/// Uses JSON strings for type-erased storage to maintain
/// dyn-compatibility; typed access lives on [`CacheExt`].
#[async_trait]
pub trait CacheInterface: Send + Sync {
    /// Get a raw JSON value from the cache.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    async fn get_raw(&self, key: &str) -> StratusResult<Option<String>>;

    /// Set a raw JSON value in the cache.
    ///
    /// A zero TTL stores the value without expiry. Store-side failures
    /// are logged and swallowed so a degraded cache never fails the
    /// caller's write path.
    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> StratusResult<()>;

    /// Delete a value from the cache.
    ///
    /// Returns `true` if the key existed and was deleted. Store-side
    /// failures are logged and swallowed.
    async fn delete(&self, key: &str) -> StratusResult<bool>;

    /// Delete all keys matching a glob pattern via an iterative scan.
    ///
    /// Returns the number of keys deleted; an empty match is `Ok(0)`,
    /// never an error.
    async fn delete_pattern(&self, pattern: &str) -> StratusResult<u64>;

    /// Check if a key exists in the cache.
    async fn exists(&self, key: &str) -> StratusResult<bool>;

    /// Remaining time-to-live of a key.
    ///
    /// An absent key surfaces [`StratusError::Miss`]; a key without
    /// expiry reports a zero duration.
    async fn ttl(&self, key: &str) -> StratusResult<Duration>;

    /// Remove every entry in the store.
    async fn flush_all(&self) -> StratusResult<()>;

    /// Server-reported statistics, parsed from the store's introspection
    /// text format.
    async fn stats(&self) -> StratusResult<HashMap<String, String>>;

    /// Keyspace summary: total key count plus counts per domain prefix.
    async fn cache_info(&self) -> StratusResult<CacheInfo>;

    /// Cheap liveness probe for health-check endpoints.
    async fn is_available(&self) -> bool;
}

/// Extension trait with typed methods for convenience.
///
/// This trait provides generic get/set methods that work with any
/// serializable type.
#[async_trait]
pub trait CacheExt: CacheInterface {
    /// Get a typed value from the cache.
    ///
    /// Absence surfaces as [`StratusError::Miss`], distinct from genuine
    /// failures so callers can fall through to their primary data source.
    /// A corrupt entry surfaces as [`StratusError::Decode`]; the raw fetch
    /// already accounted for the call, so the typed layer adds no second
    /// counter increment.
    async fn get<T: serde::de::DeserializeOwned + Send>(&self, key: &str) -> StratusResult<T> {
        match self.get_raw(key).await? {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| StratusError::decode(key, e.to_string())),
            None => Err(StratusError::Miss(key.to_string())),
        }
    }

    /// Set a typed value in the cache.
    async fn set<T: serde::Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> StratusResult<()> {
        let json =
            serde_json::to_string(value).map_err(|e| StratusError::encode(e.to_string()))?;
        self.set_raw(key, &json, ttl).await
    }

    /// Get a value, or load and cache it if absent.
    ///
    /// Best-effort read-through: concurrent callers on the same absent key
    /// may each invoke `loader` (no single-flight guarantee). Any read
    /// outcome other than a hit falls through to the loader, so a
    /// degraded cache never fails the read path; a corrupt entry is
    /// repaired by the write-back. Loader failures are surfaced; a failed
    /// write-back is logged and the loaded value still returned.
    async fn get_or_set<T, F, Fut>(&self, key: &str, ttl: Duration, loader: F) -> StratusResult<T>
    where
        T: serde::Serialize + serde::de::DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: std::future::Future<Output = StratusResult<T>> + Send,
    {
        match self.get::<T>(key).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_miss() => {}
            Err(e) => {
                warn!(
                    "Cache read for key '{}' failed, falling back to loader: {}",
                    key, e
                );
            }
        }

        let value = loader().await?;

        if let Err(e) = self.set(key, &value, ttl).await {
            warn!("Failed to write back cache entry '{}': {}", key, e);
        }

        Ok(value)
    }
}

// Blanket implementation for all CacheInterface implementations
impl<T: CacheInterface + ?Sized> CacheExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// In-memory backend for exercising the typed extension layer
    /// without a live store. TTLs are accepted and ignored.
    #[derive(Default)]
    struct MemoryCache {
        entries: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl CacheInterface for MemoryCache {
        async fn get_raw(&self, key: &str) -> StratusResult<Option<String>> {
            Ok(self.entries.lock().await.get(key).cloned())
        }

        async fn set_raw(&self, key: &str, value: &str, _ttl: Duration) -> StratusResult<()> {
            self.entries
                .lock()
                .await
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn delete(&self, key: &str) -> StratusResult<bool> {
            Ok(self.entries.lock().await.remove(key).is_some())
        }

        async fn delete_pattern(&self, pattern: &str) -> StratusResult<u64> {
            let prefix = pattern.trim_end_matches('*');
            let mut entries = self.entries.lock().await;
            let before = entries.len();
            entries.retain(|key, _| !key.starts_with(prefix));
            Ok((before - entries.len()) as u64)
        }

        async fn exists(&self, key: &str) -> StratusResult<bool> {
            Ok(self.entries.lock().await.contains_key(key))
        }

        async fn ttl(&self, key: &str) -> StratusResult<Duration> {
            if self.entries.lock().await.contains_key(key) {
                Ok(Duration::ZERO)
            } else {
                Err(StratusError::Miss(key.to_string()))
            }
        }

        async fn flush_all(&self) -> StratusResult<()> {
            self.entries.lock().await.clear();
            Ok(())
        }

        async fn stats(&self) -> StratusResult<HashMap<String, String>> {
            Ok(HashMap::new())
        }

        async fn cache_info(&self) -> StratusResult<CacheInfo> {
            let entries = self.entries.lock().await;
            Ok(CacheInfo {
                total_keys: entries.len() as u64,
                keys_by_prefix: HashMap::new(),
            })
        }

        async fn is_available(&self) -> bool {
            true
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Place {
        name: String,
    }

    #[tokio::test]
    async fn test_set_then_get_round_trip() {
        let cache = MemoryCache::default();
        let value = Place {
            name: "Harbor".to_string(),
        };
        cache
            .set("place_1", &value, Duration::from_secs(60))
            .await
            .unwrap();

        let fetched: Place = cache.get("place_1").await.unwrap();
        assert_eq!(fetched, value);
    }

    #[tokio::test]
    async fn test_get_absent_key_is_miss() {
        let cache = MemoryCache::default();
        let err = cache.get::<Place>("place_404").await.unwrap_err();

        assert!(err.is_miss());
        assert!(err.to_string().contains("place_404"));
    }

    #[tokio::test]
    async fn test_delete_then_get_is_miss() {
        let cache = MemoryCache::default();
        let value = Place {
            name: "Harbor".to_string(),
        };
        cache
            .set("place_1", &value, Duration::from_secs(60))
            .await
            .unwrap();
        assert!(cache.delete("place_1").await.unwrap());

        let result = cache.get::<Place>("place_1").await;
        assert!(result.unwrap_err().is_miss());
    }

    #[tokio::test]
    async fn test_get_or_set_populates_for_subsequent_get() {
        let cache = MemoryCache::default();
        let loads = AtomicU32::new(0);

        let value: Place = cache
            .get_or_set("place_1", Duration::from_secs(60), || async {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(Place {
                    name: "Harbor".to_string(),
                })
            })
            .await
            .unwrap();
        assert_eq!(value.name, "Harbor");
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        // The loaded value was written back, so the next read hits.
        let cached: Place = cache.get("place_1").await.unwrap();
        assert_eq!(cached, value);

        let again: Place = cache
            .get_or_set("place_1", Duration::from_secs(60), || async {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(Place {
                    name: "Other".to_string(),
                })
            })
            .await
            .unwrap();
        assert_eq!(again.name, "Harbor");
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_get_or_set_bounds_loader_runs() {
        let cache = Arc::new(MemoryCache::default());
        let loads = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let loads = Arc::clone(&loads);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_set("place_1", Duration::from_secs(60), move || async move {
                        loads.fetch_add(1, Ordering::SeqCst);
                        Ok(Place {
                            name: "Harbor".to_string(),
                        })
                    })
                    .await
                    .unwrap()
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().name, "Harbor");
        }

        // Best-effort read-through: racing callers may each run the
        // loader, but never more than once per caller.
        let runs = loads.load(Ordering::SeqCst);
        assert!((1..=8).contains(&runs));
    }

    #[tokio::test]
    async fn test_corrupt_entry_decodes_to_error_without_second_increment() {
        let handle = crate::metrics::install_recorder().expect("recorder installs once");

        let cache = MemoryCache::default();
        cache
            .set_raw("place_1", "not json", Duration::from_secs(60))
            .await
            .unwrap();

        let result = cache.get::<Place>("place_1").await;
        assert!(matches!(result, Err(StratusError::Decode { .. })));

        // The raw fetch accounts for the call; the typed layer must not
        // add an error increment on top of it.
        let rendered = handle.render();
        let typed_layer_error = rendered
            .lines()
            .any(|line| line.contains("cache_errors_total") && line.contains("operation=\"get\""));
        assert!(!typed_layer_error);
    }
}
