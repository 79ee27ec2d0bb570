//! A single store in the ordered chain

use std::future::Future;
use std::sync::Arc;

use strata_cache_core::{CacheStore, Result};

use super::circuit_breaker::{BreakerConfig, CircuitBreaker};

/// One store in the layered chain: a name for logs, a priority for
/// ordering (lower = faster/closer), and an optional circuit breaker.
///
/// Cloning is cheap; the store and breaker state are shared.
#[derive(Clone)]
pub struct Tier {
    name: String,
    priority: u32,
    store: Arc<dyn CacheStore>,
    breaker: Option<CircuitBreaker>,
}

impl Tier {
    /// Create a tier without failure tracking
    pub fn new(name: impl Into<String>, priority: u32, store: impl CacheStore) -> Self {
        Self {
            name: name.into(),
            priority,
            store: Arc::new(store),
            breaker: None,
        }
    }

    /// Create a tier from an already-shared store handle
    pub fn from_arc(name: impl Into<String>, priority: u32, store: Arc<dyn CacheStore>) -> Self {
        Self {
            name: name.into(),
            priority,
            store,
            breaker: None,
        }
    }

    /// Guard this tier with a circuit breaker
    pub fn with_breaker(mut self, config: BreakerConfig) -> Self {
        self.breaker = Some(CircuitBreaker::new(self.name.clone(), config));
        self
    }

    /// Tier name, used in logs and error aggregation
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordering priority (lower = consulted first)
    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// The underlying store
    pub fn store(&self) -> &dyn CacheStore {
        self.store.as_ref()
    }

    /// The breaker guarding this tier, if any
    pub fn breaker(&self) -> Option<&CircuitBreaker> {
        self.breaker.as_ref()
    }

    /// Run a store operation, routed through the breaker when configured
    pub async fn execute<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match &self.breaker {
            Some(breaker) => breaker.call(op).await,
            None => op().await,
        }
    }
}

impl std::fmt::Debug for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tier")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("breaker", &self.breaker.is_some())
            .finish()
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use strata_cache_core::CacheOptions;

    #[tokio::test]
    async fn test_execute_without_breaker() {
        let tier = Tier::new("memory", 0, MemoryStore::with_defaults());
        let options = CacheOptions::default();

        tier.execute(|| tier.store().set("k", b"v".to_vec(), &options))
            .await
            .unwrap();

        let entry = tier.execute(|| tier.store().get("k")).await.unwrap();
        assert_eq!(entry.unwrap().value, b"v".to_vec());
    }

    #[tokio::test]
    async fn test_breaker_is_labeled_with_tier_name() {
        let tier = Tier::new("redis", 1, MemoryStore::with_defaults())
            .with_breaker(BreakerConfig::default());
        assert_eq!(tier.breaker().unwrap().store(), "redis");
    }
}
