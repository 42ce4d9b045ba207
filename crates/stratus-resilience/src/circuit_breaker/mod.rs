//! Circuit breaker implementation.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::{Duration, Instant};
use stratus_core::StratusError;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    /// Circuit is closed - requests are allowed.
    Closed = 0,
    /// Circuit is open - requests are rejected.
    Open = 1,
    /// Circuit is half-open - a limited number of probes are allowed.
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Open,
            2 => Self::HalfOpen,
            _ => Self::Closed,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// The circuit opens once consecutive failures *exceed* this count.
    pub failure_threshold: u64,
    /// Duration to wait in open state before allowing probes.
    pub cooldown: Duration,
    /// Maximum number of probe calls admitted while half-open.
    pub half_open_max_calls: u64,
    /// Rolling window after which the closed-state failure count resets.
    pub interval: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(10),
            half_open_max_calls: 5,
            interval: Duration::from_secs(30),
        }
    }
}

/// Circuit breaker guarding calls to an unreliable downstream dependency.
///
/// One instance is shared across all operations hitting the same
/// dependency. The breaker owns no data from the protected calls; it only
/// tracks call-admission state.
pub struct CircuitBreaker {
    name: String,
    state: AtomicU8,
    failure_count: AtomicU64,
    half_open_calls: AtomicU64,
    opened_at: RwLock<Option<Instant>>,
    window_start: RwLock<Instant>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    /// Creates a new circuit breaker.
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            state: AtomicU8::new(CircuitState::Closed as u8),
            failure_count: AtomicU64::new(0),
            half_open_calls: AtomicU64::new(0),
            opened_at: RwLock::new(None),
            window_start: RwLock::new(Instant::now()),
            config,
        }
    }

    /// Creates a new circuit breaker with default configuration.
    pub fn with_defaults(name: impl Into<String>) -> Self {
        Self::new(name, CircuitBreakerConfig::default())
    }

    /// Returns the current state of the circuit breaker.
    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::SeqCst))
    }

    /// Returns the name of the circuit breaker.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Executes an operation with circuit breaker protection.
    ///
    /// Rejected calls return [`CircuitBreakerError::Open`] without the
    /// operation ever running.
    pub async fn call<F, Fut, T, E>(&self, f: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        if !self.allow_request().await {
            return Err(CircuitBreakerError::Open(self.name.clone()));
        }

        match f().await {
            Ok(result) => {
                self.record_success().await;
                Ok(result)
            }
            Err(e) => {
                self.record_failure().await;
                Err(CircuitBreakerError::Failure(e))
            }
        }
    }

    /// Checks if a request should be admitted.
    async fn allow_request(&self) -> bool {
        match self.state() {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let opened_at = self.opened_at.read().await;
                match *opened_at {
                    Some(time) if time.elapsed() >= self.config.cooldown => {
                        // Only one caller performs the transition; the probe
                        // counter is reset exactly once per open period.
                        if self
                            .state
                            .compare_exchange(
                                CircuitState::Open as u8,
                                CircuitState::HalfOpen as u8,
                                Ordering::SeqCst,
                                Ordering::SeqCst,
                            )
                            .is_ok()
                        {
                            self.half_open_calls.store(0, Ordering::SeqCst);
                            debug!("Circuit breaker '{}' transitioning to half-open", self.name);
                        }
                        // The transition-triggering call counts as a probe.
                        self.admit_probe()
                    }
                    _ => false,
                }
            }
            CircuitState::HalfOpen => self.admit_probe(),
        }
    }

    fn admit_probe(&self) -> bool {
        let probes = self.half_open_calls.fetch_add(1, Ordering::SeqCst);
        probes < self.config.half_open_max_calls
    }

    /// Records a successful call.
    async fn record_success(&self) {
        match self.state() {
            CircuitState::Closed => {
                // Consecutive-failure semantics: any success resets.
                self.failure_count.store(0, Ordering::SeqCst);
            }
            CircuitState::HalfOpen => {
                // A single successful probe closes the circuit.
                self.state.store(CircuitState::Closed as u8, Ordering::SeqCst);
                self.failure_count.store(0, Ordering::SeqCst);
                self.half_open_calls.store(0, Ordering::SeqCst);
                *self.opened_at.write().await = None;
                debug!("Circuit breaker '{}' closed after successful probe", self.name);
            }
            CircuitState::Open => {}
        }
    }

    /// Records a failed call.
    async fn record_failure(&self) {
        match self.state() {
            CircuitState::Closed => {
                self.roll_window().await;

                let failures = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
                if failures > self.config.failure_threshold {
                    self.state.store(CircuitState::Open as u8, Ordering::SeqCst);
                    *self.opened_at.write().await = Some(Instant::now());
                    warn!(
                        "Circuit breaker '{}' opened after {} consecutive failures",
                        self.name, failures
                    );
                }
            }
            CircuitState::HalfOpen => {
                // Any probe failure reopens the circuit and restarts the
                // cooldown.
                self.state.store(CircuitState::Open as u8, Ordering::SeqCst);
                *self.opened_at.write().await = Some(Instant::now());
                warn!(
                    "Circuit breaker '{}' reopened after failure in half-open state",
                    self.name
                );
            }
            CircuitState::Open => {
                *self.opened_at.write().await = Some(Instant::now());
            }
        }
    }

    /// Resets the closed-state failure count once the rolling interval has
    /// passed without the circuit tripping.
    async fn roll_window(&self) {
        let mut window_start = self.window_start.write().await;
        if window_start.elapsed() >= self.config.interval {
            self.failure_count.store(0, Ordering::SeqCst);
            *window_start = Instant::now();
        }
    }

    /// Manually resets the circuit breaker to closed state.
    pub async fn reset(&self) {
        self.state.store(CircuitState::Closed as u8, Ordering::SeqCst);
        self.failure_count.store(0, Ordering::SeqCst);
        self.half_open_calls.store(0, Ordering::SeqCst);
        *self.opened_at.write().await = None;
        *self.window_start.write().await = Instant::now();
        debug!("Circuit breaker '{}' manually reset", self.name);
    }
}

/// Error type for circuit breaker operations.
#[derive(Debug)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open, the request was rejected without running.
    Open(String),
    /// The underlying operation ran and failed.
    Failure(E),
}

impl<E: std::fmt::Display> std::fmt::Display for CircuitBreakerError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open(name) => write!(f, "Circuit breaker '{}' is open", name),
            Self::Failure(e) => write!(f, "Operation failed: {}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for CircuitBreakerError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Open(_) => None,
            Self::Failure(e) => Some(e),
        }
    }
}

impl From<CircuitBreakerError<StratusError>> for StratusError {
    fn from(err: CircuitBreakerError<StratusError>) -> Self {
        match err {
            CircuitBreakerError::Open(name) => StratusError::CircuitOpen(name),
            CircuitBreakerError::Failure(e) => e,
        }
    }
}
