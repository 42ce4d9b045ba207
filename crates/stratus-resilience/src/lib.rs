//! # Stratus Resilience
//!
//! Failure-isolation primitives for the Stratus caching layer: a
//! three-state circuit breaker and a per-call deadline wrapper.

pub mod circuit_breaker;
pub mod timeout;

pub use circuit_breaker::*;
pub use timeout::*;
