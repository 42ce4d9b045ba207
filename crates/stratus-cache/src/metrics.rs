//! Prometheus counters for cache outcomes.

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use stratus_core::StratusResult;

/// Metric names for the cache layer.
pub mod names {
    /// Total cache hits.
    pub const CACHE_HITS_TOTAL: &str = "cache_hits_total";
    /// Total cache misses.
    pub const CACHE_MISSES_TOTAL: &str = "cache_misses_total";
    /// Total cache operation errors.
    pub const CACHE_ERRORS_TOTAL: &str = "cache_errors_total";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::CACHE_HITS_TOTAL, "Total number of cache hits");
    describe_counter!(names::CACHE_MISSES_TOTAL, "Total number of cache misses");
    describe_counter!(
        names::CACHE_ERRORS_TOTAL,
        "Total number of failed cache operations"
    );
}

/// Install a process-global Prometheus recorder and return the scrape
/// handle.
///
/// Intended to be called once at startup by the embedding host; the
/// returned handle renders the text exposition format on demand.
pub fn install_recorder() -> StratusResult<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;
    register_metrics();
    Ok(handle)
}

/// Cache outcome recorder.
///
/// Counters are monotonic and process-wide; they reset only on process
/// restart.
#[derive(Clone)]
pub struct CacheMetrics;

impl CacheMetrics {
    /// Record a hit (or a successful write, for mutation operations).
    pub fn hit(operation: &'static str) {
        counter!(names::CACHE_HITS_TOTAL, "operation" => operation).increment(1);
    }

    /// Record a miss.
    pub fn miss(operation: &'static str) {
        counter!(names::CACHE_MISSES_TOTAL, "operation" => operation).increment(1);
    }

    /// Record a failed operation.
    pub fn error(operation: &'static str) {
        counter!(names::CACHE_ERRORS_TOTAL, "operation" => operation).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics() {
        // Just verify registration doesn't panic
        register_metrics();
    }

    #[test]
    fn test_recording_without_recorder_is_a_noop() {
        CacheMetrics::hit("get");
        CacheMetrics::miss("get");
        CacheMetrics::error("set");
    }
}
