//! Deadline wrapper for async operations.

use std::time::Duration;
use stratus_core::StratusError;

/// Wraps an async operation with a deadline.
///
/// Exceeding the deadline aborts only this call; it surfaces as
/// [`StratusError::Timeout`], which the circuit breaker counts as an
/// ordinary failure.
pub async fn with_timeout<F, Fut, T>(duration: Duration, f: F) -> Result<T, StratusError>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, StratusError>>,
{
    tokio::time::timeout(duration, f())
        .await
        .map_err(|_| StratusError::Timeout(format!("Operation timed out after {:?}", duration)))?
}

/// Per-operation deadlines for the cache facade.
///
/// No single cache call may block its caller beyond these bounds.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Deadline for point operations (get/set/delete/exists/ttl).
    pub point_op: Duration,
    /// Deadline for pattern scans and bulk deletes.
    pub pattern_scan: Duration,
    /// Deadline for a full flush.
    pub flush: Duration,
    /// Deadline for server introspection (stats).
    pub stats: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            point_op: Duration::from_millis(500),
            pattern_scan: Duration::from_secs(2),
            flush: Duration::from_secs(5),
            stats: Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_timeout_success() {
        let result =
            with_timeout(Duration::from_secs(1), || async { Ok::<_, StratusError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_timeout_exceeded() {
        let result = with_timeout(Duration::from_millis(10), || async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, StratusError>(42)
        })
        .await;

        assert!(matches!(result, Err(StratusError::Timeout(_))));
    }

    #[test]
    fn test_default_deadlines() {
        let config = TimeoutConfig::default();
        assert_eq!(config.point_op, Duration::from_millis(500));
        assert_eq!(config.pattern_scan, Duration::from_secs(2));
        assert_eq!(config.flush, Duration::from_secs(5));
        assert_eq!(config.stats, Duration::from_secs(1));
    }
}
