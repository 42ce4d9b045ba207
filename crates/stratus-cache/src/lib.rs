//! # Stratus Cache
//!
//! A resilient caching facade over a remote Redis store. Adds what the
//! bare client lacks: per-call deadlines, circuit breaking against an
//! unhealthy store, atomic-enough read-through population, pattern-based
//! bulk invalidation, and hit/miss/error counters for scraping.
//!
//! The facade never fails an application write because the cache is
//! degraded: write-path failures are logged and swallowed, read paths
//! surface typed errors the caller can fall through on.

pub mod cache_interface;
pub mod cache_keys;
pub mod config;
pub mod connection;
pub mod metrics;
pub mod redis_cache;

pub use cache_interface::{CacheExt, CacheInfo, CacheInterface};
pub use config::CacheConfig;
pub use connection::RedisHandle;
pub use metrics::{install_recorder, register_metrics, CacheMetrics};
pub use redis_cache::{
    RedisCache, DEFAULT_TTL, TTL_LONG, TTL_MEDIUM, TTL_SHORT, TTL_VERY_LONG,
};
