//! Cache key helpers for the `<domain>_<identifier>` naming convention.

use std::fmt::Display;

/// Compose a cache key from a domain prefix and an identifier.
#[must_use]
pub fn domain_key(prefix: &str, id: impl Display) -> String {
    format!("{}_{}", prefix, id)
}

/// Glob pattern matching every key of a domain.
#[must_use]
pub fn domain_pattern(prefix: &str) -> String {
    format!("{}_*", prefix)
}

/// The domain prefix of a key: the substring before the first `_`, or the
/// whole key when it has none.
#[must_use]
pub fn key_prefix(key: &str) -> &str {
    key.split('_').next().unwrap_or(key)
}
