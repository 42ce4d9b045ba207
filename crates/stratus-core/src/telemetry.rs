//! Tracing bootstrap for binaries embedding the cache layer.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize console tracing with an env-filter.
///
/// Respects `RUST_LOG` when set. Safe to call once per process; later
/// calls are ignored so tests and embedding hosts cannot collide on the
/// global subscriber.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stratus=debug"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init();
}
