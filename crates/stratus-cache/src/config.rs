//! Facade configuration.

use stratus_resilience::{CircuitBreakerConfig, TimeoutConfig};

/// Configuration for a [`crate::RedisCache`].
///
/// The connection URI is deliberately not part of this struct: it is
/// sourced by the embedding host (typically from its environment) and
/// passed to `initialize` at startup.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Per-operation deadlines.
    pub timeouts: TimeoutConfig,
    /// Circuit breaker tuning.
    pub breaker: CircuitBreakerConfig,
    /// Maximum number of background invalidation tasks in flight.
    pub invalidation_concurrency: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            timeouts: TimeoutConfig::default(),
            breaker: CircuitBreakerConfig::default(),
            invalidation_concurrency: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.breaker.failure_threshold, 5);
        assert_eq!(config.breaker.cooldown.as_secs(), 10);
        assert_eq!(config.breaker.half_open_max_calls, 5);
        assert_eq!(config.invalidation_concurrency, 16);
    }
}
