//! Remote store connection lifecycle.

use redis::aio::ConnectionManager;
use stratus_core::{StratusError, StratusResult};
use tokio::sync::RwLock;
use tracing::{debug, info};

enum ConnState {
    Uninitialized,
    Ready(ConnectionManager),
    Failed(String),
}

/// Owns the single live connection to the remote store.
///
/// Initialization is exclusive: the first caller performs the
/// connect-and-ping handshake while concurrent callers wait on the same
/// lock and then observe the memoized outcome. A failed handshake is not
/// re-attempted until the handle is explicitly closed.
pub struct RedisHandle {
    state: RwLock<ConnState>,
}

impl RedisHandle {
    /// Creates an uninitialized handle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ConnState::Uninitialized),
        }
    }

    /// Connects to the store at `uri` and probes it with `PING`.
    ///
    /// Safe to call concurrently; only the first invocation performs the
    /// handshake. Later calls return `Ok(())` if it succeeded or the same
    /// [`StratusError::Connection`] if it failed.
    pub async fn initialize(&self, uri: &str) -> StratusResult<()> {
        let mut state = self.state.write().await;
        match &*state {
            ConnState::Ready(_) => Ok(()),
            ConnState::Failed(message) => Err(StratusError::Connection(message.clone())),
            ConnState::Uninitialized => match Self::connect(uri).await {
                Ok(manager) => {
                    *state = ConnState::Ready(manager);
                    info!("Connected to cache store");
                    Ok(())
                }
                Err(message) => {
                    *state = ConnState::Failed(message.clone());
                    Err(StratusError::Connection(message))
                }
            },
        }
    }

    async fn connect(uri: &str) -> Result<ConnectionManager, String> {
        let client =
            redis::Client::open(uri).map_err(|e| format!("Invalid connection URI: {}", e))?;

        let mut manager = client
            .get_connection_manager()
            .await
            .map_err(|e| format!("Failed to connect to cache store: {}", e))?;

        redis::cmd("PING")
            .query_async::<String>(&mut manager)
            .await
            .map_err(|e| format!("Liveness probe failed: {}", e))?;

        Ok(manager)
    }

    /// Returns a clone of the live connection handle.
    ///
    /// The multiplexed manager is cheap to clone and safe for concurrent
    /// use; callers hold it only for the duration of one operation.
    pub async fn manager(&self) -> StratusResult<ConnectionManager> {
        match &*self.state.read().await {
            ConnState::Ready(manager) => Ok(manager.clone()),
            _ => Err(StratusError::NotInitialized),
        }
    }

    /// Whether a successful `initialize` has happened.
    pub async fn is_initialized(&self) -> bool {
        matches!(&*self.state.read().await, ConnState::Ready(_))
    }

    /// Releases the connection handle.
    ///
    /// Idempotent, and a no-op when no handle exists. Also clears a
    /// memoized initialization failure so a later `initialize` may retry.
    pub async fn close(&self) -> StratusResult<()> {
        let mut state = self.state.write().await;
        if matches!(&*state, ConnState::Ready(_)) {
            debug!("Closing cache store connection");
        }
        *state = ConnState::Uninitialized;
        Ok(())
    }
}

impl Default for RedisHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manager_before_initialize() {
        let handle = RedisHandle::new();
        let result = handle.manager().await;
        assert!(matches!(result, Err(StratusError::NotInitialized)));
        assert!(!handle.is_initialized().await);
    }

    #[tokio::test]
    async fn test_initialize_with_malformed_uri() {
        let handle = RedisHandle::new();
        let result = handle.initialize("not a valid uri").await;
        assert!(matches!(result, Err(StratusError::Connection(_))));
        assert!(!handle.is_initialized().await);
    }

    #[tokio::test]
    async fn test_failed_initialize_is_memoized() {
        let handle = RedisHandle::new();
        let first = handle.initialize("not a valid uri").await.unwrap_err();
        let second = handle.initialize("redis://localhost:6379").await.unwrap_err();

        // The second call observes the first outcome without re-attempting
        // the handshake, even with a different URI.
        assert_eq!(first.to_string(), second.to_string());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let handle = RedisHandle::new();
        assert!(handle.close().await.is_ok());
        assert!(handle.close().await.is_ok());
    }

    #[tokio::test]
    async fn test_close_clears_memoized_failure() {
        let handle = RedisHandle::new();
        let _ = handle.initialize("not a valid uri").await;
        handle.close().await.unwrap();

        // After explicit teardown the next initialize retries the
        // handshake; with the same bad URI it fails as a fresh parse
        // error rather than the memoized one.
        let result = handle.initialize("also not a uri").await;
        assert!(matches!(result, Err(StratusError::Connection(_))));
    }
}
