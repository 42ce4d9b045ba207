//! Unified error types for the caching layer.

use thiserror::Error;

/// Unified error type for all Stratus operations.
///
/// The taxonomy distinguishes expected, recoverable conditions (`Miss`,
/// `CircuitOpen`) from genuine failures. Callers implementing fallback
/// logic can treat everything [`StratusError::is_unavailable`] reports
/// uniformly as "the cache cannot answer right now".
#[derive(Error, Debug)]
pub enum StratusError {
    /// The cache layer was never initialized, or initialization failed.
    #[error("Cache layer not initialized")]
    NotInitialized,

    /// Connecting to (or probing) the remote store failed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Building the store request failed: an unserializable value or an
    /// invalid key. Deterministic caller bugs, reported before any store
    /// round trip.
    #[error("Failed to encode cache request: {0}")]
    Encode(String),

    /// Deserializing a stored value failed.
    #[error("Failed to decode cache value for key '{key}': {message}")]
    Decode { key: String, message: String },

    /// The key is absent or expired. Expected and recoverable; never
    /// logged as a failure by the cache layer itself.
    #[error("Cache miss for key '{0}'")]
    Miss(String),

    /// The circuit breaker rejected the call without contacting the store.
    #[error("Service unavailable: circuit breaker open for {0}")]
    CircuitOpen(String),

    /// The remote store accepted the call but the operation failed.
    #[error("Store operation failed: {0}")]
    Store(String),

    /// The per-call deadline elapsed before the store answered.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Generic error wrapper, used for caller-supplied loader failures.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StratusError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::Connection(_) => "CONNECTION_ERROR",
            Self::Encode(_) => "ENCODE_ERROR",
            Self::Decode { .. } => "DECODE_ERROR",
            Self::Miss(_) => "CACHE_MISS",
            Self::CircuitOpen(_) => "CIRCUIT_BREAKER_OPEN",
            Self::Store(_) => "STORE_OPERATION_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection<T: Into<String>>(message: T) -> Self {
        Self::Connection(message.into())
    }

    /// Creates an encode error.
    #[must_use]
    pub fn encode<T: Into<String>>(message: T) -> Self {
        Self::Encode(message.into())
    }

    /// Creates a decode error for a specific key.
    #[must_use]
    pub fn decode<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Self::Decode {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a store operation error.
    #[must_use]
    pub fn store<T: Into<String>>(message: T) -> Self {
        Self::Store(message.into())
    }

    /// Checks whether this error is a cache miss.
    #[must_use]
    pub const fn is_miss(&self) -> bool {
        matches!(self, Self::Miss(_))
    }

    /// Checks whether this error means the store could not be reached at
    /// all, as opposed to a caller-side problem with the data.
    ///
    /// Breaker rejections are deliberately indistinguishable here from
    /// genuine store failures so that fallback paths handle both the same
    /// way.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::NotInitialized
                | Self::Connection(_)
                | Self::CircuitOpen(_)
                | Self::Store(_)
                | Self::Timeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(StratusError::NotInitialized.error_code(), "NOT_INITIALIZED");
        assert_eq!(StratusError::connection("refused").error_code(), "CONNECTION_ERROR");
        assert_eq!(StratusError::encode("bad value").error_code(), "ENCODE_ERROR");
        assert_eq!(StratusError::decode("k", "truncated").error_code(), "DECODE_ERROR");
        assert_eq!(StratusError::Miss("k".to_string()).error_code(), "CACHE_MISS");
        assert_eq!(
            StratusError::CircuitOpen("cache".to_string()).error_code(),
            "CIRCUIT_BREAKER_OPEN"
        );
        assert_eq!(StratusError::store("WRONGTYPE").error_code(), "STORE_OPERATION_ERROR");
        assert_eq!(StratusError::Timeout("500ms".to_string()).error_code(), "TIMEOUT");
    }

    #[test]
    fn test_is_miss() {
        assert!(StratusError::Miss("user_1".to_string()).is_miss());
        assert!(!StratusError::NotInitialized.is_miss());
        assert!(!StratusError::store("boom").is_miss());
    }

    #[test]
    fn test_unavailable_errors() {
        assert!(StratusError::NotInitialized.is_unavailable());
        assert!(StratusError::connection("refused").is_unavailable());
        assert!(StratusError::CircuitOpen("cache".to_string()).is_unavailable());
        assert!(StratusError::store("boom").is_unavailable());
        assert!(StratusError::Timeout("2s".to_string()).is_unavailable());
    }

    #[test]
    fn test_data_errors_are_not_unavailable() {
        assert!(!StratusError::Miss("k".to_string()).is_unavailable());
        assert!(!StratusError::encode("bad").is_unavailable());
        assert!(!StratusError::decode("k", "bad").is_unavailable());
    }

    #[test]
    fn test_display_contains_context() {
        let err = StratusError::decode("place_42", "expected value at line 1");
        assert!(err.to_string().contains("place_42"));

        let err = StratusError::Miss("place_42".to_string());
        assert!(err.to_string().contains("place_42"));
    }

    #[test]
    fn test_from_anyhow() {
        let err: StratusError = anyhow::anyhow!("loader exploded").into();
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
        assert!(err.to_string().contains("loader exploded"));
    }
}
