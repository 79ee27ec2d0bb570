//! Per-store circuit breaker
//!
//! Tracks consecutive failures for one store and short-circuits calls to
//! it while open, converting a slow-failing backend into a fast-failing
//! one. Only infrastructure errors count against the breaker; a corrupt
//! payload is the entry's problem, not the store's.

use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use strata_cache_core::{CacheError, Result};

/// Circuit breaker tuning knobs
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive failures required to open the breaker
    pub failure_threshold: u32,
    /// How long the breaker stays open before the next probe
    pub open_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    failures: u32,
    last_failure: Option<Instant>,
    open_until: Option<Instant>,
}

/// Point-in-time view of a breaker, for diagnostics and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSnapshot {
    /// Current consecutive-failure count
    pub failures: u32,
    /// When the most recent counted failure happened
    pub last_failure: Option<Instant>,
    /// Whether the breaker is currently rejecting calls
    pub open: bool,
}

/// Per-store failure isolation state machine
///
/// Cloning creates a new handle to the SAME breaker state.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    store: String,
    config: BreakerConfig,
    inner: Arc<RwLock<BreakerInner>>,
}

impl CircuitBreaker {
    /// Create a breaker guarding the named store
    pub fn new(store: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            store: store.into(),
            config,
            inner: Arc::new(RwLock::new(BreakerInner {
                failures: 0,
                last_failure: None,
                open_until: None,
            })),
        }
    }

    /// Name of the store this breaker guards
    pub fn store(&self) -> &str {
        &self.store
    }

    /// Current state, for diagnostics and tests
    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.inner.read();
        BreakerSnapshot {
            failures: inner.failures,
            last_failure: inner.last_failure,
            open: inner
                .open_until
                .is_some_and(|until| Instant::now() < until),
        }
    }

    /// Run an operation through the breaker
    ///
    /// While open and within the cooldown the operation is never invoked
    /// and the call fails with [`CacheError::CircuitOpen`]. Once the
    /// cooldown has elapsed the breaker optimistically resets to closed
    /// (failure counter zeroed) and the operation runs as a probe.
    pub async fn call<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        {
            let mut inner = self.inner.write();
            if let Some(until) = inner.open_until {
                if Instant::now() < until {
                    return Err(CacheError::CircuitOpen {
                        store: self.store.clone(),
                    });
                }
                inner.open_until = None;
                inner.failures = 0;
                debug!(
                    target: "strata_cache",
                    store = %self.store,
                    "circuit breaker cooldown elapsed, probing store"
                );
            }
        }

        match op().await {
            Ok(value) => {
                self.inner.write().failures = 0;
                Ok(value)
            }
            Err(err) => {
                if err.is_infrastructure() {
                    let mut inner = self.inner.write();
                    let now = Instant::now();
                    inner.failures += 1;
                    inner.last_failure = Some(now);
                    if inner.failures >= self.config.failure_threshold {
                        inner.open_until = Some(now + self.config.open_timeout);
                        warn!(
                            target: "strata_cache",
                            store = %self.store,
                            failures = inner.failures,
                            cooldown_ms = self.config.open_timeout.as_millis() as u64,
                            "circuit breaker opened"
                        );
                    }
                }
                Err(err)
            }
        }
    }
}
