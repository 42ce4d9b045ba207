//! # Stratus Core
//!
//! Core types, result aliases, and error definitions for the Stratus
//! resilient caching layer. This crate provides the foundational
//! abstractions shared by the resilience and cache crates.

pub mod error;
pub mod result;
pub mod telemetry;

pub use error::*;
pub use result::*;
pub use telemetry::*;
