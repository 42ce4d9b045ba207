//! Result type aliases for Stratus.

use crate::StratusError;

/// A specialized `Result` type for cache-layer operations.
pub type StratusResult<T> = Result<T, StratusError>;
