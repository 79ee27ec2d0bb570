//! Glob-pattern bulk invalidation

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use strata_cache_core::InvalidationOptions;
use strata_cache_storage::{LayeredCache, Tier};

/// Invalidates every entry whose key matches a glob pattern
///
/// Tiers with native pattern support are asked directly; the rest fall
/// back to key enumeration followed by individual deletion.
#[derive(Clone)]
pub struct PatternInvalidator {
    layered: Arc<LayeredCache>,
}

impl PatternInvalidator {
    /// Create an invalidator over the given tier chain
    pub fn new(layered: Arc<LayeredCache>) -> Self {
        Self { layered }
    }

    /// Invalidate all keys matching `pattern` on every tier
    ///
    /// Returns the summed per-tier deletion count. With
    /// `options.background` the work is dispatched without waiting and 0
    /// is returned; completion is observable only in logs.
    pub async fn invalidate(&self, pattern: &str, options: InvalidationOptions) -> u64 {
        if options.background {
            let this = self.clone();
            let pattern = pattern.to_string();
            tokio::spawn(async move {
                let count = this.run(&pattern).await;
                debug!(
                    target: "strata_cache",
                    pattern = %pattern,
                    count,
                    "background pattern invalidation finished"
                );
            });
            return 0;
        }

        self.run(pattern).await
    }

    async fn run(&self, pattern: &str) -> u64 {
        let counts = join_all(
            self.layered
                .tiers()
                .iter()
                .map(|tier| Self::run_tier(tier, pattern)),
        )
        .await;

        counts.into_iter().sum()
    }

    async fn run_tier(tier: &Tier, pattern: &str) -> u64 {
        if let Some(native) = tier.store().as_pattern() {
            return match tier.execute(|| native.invalidate_pattern(pattern)).await {
                Ok(count) => count,
                Err(err) => {
                    warn!(
                        target: "strata_cache",
                        store = tier.name(),
                        pattern = %pattern,
                        error = %err,
                        "pattern invalidation failed on tier"
                    );
                    0
                }
            };
        }

        // Fallback: enumerate matching keys, then delete them one by one
        let keys = match tier.execute(|| tier.store().keys(Some(pattern))).await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(
                    target: "strata_cache",
                    store = tier.name(),
                    pattern = %pattern,
                    error = %err,
                    "key enumeration failed on tier"
                );
                return 0;
            }
        };
        if keys.is_empty() {
            return 0;
        }

        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        match tier.execute(|| tier.store().delete_many(&refs)).await {
            Ok(count) => count,
            Err(err) => {
                warn!(
                    target: "strata_cache",
                    store = tier.name(),
                    pattern = %pattern,
                    error = %err,
                    "pattern fallback deletion failed on tier"
                );
                0
            }
        }
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use super::*;
    use strata_cache_core::{CacheOptions, CacheStore};
    use strata_cache_storage::MemoryStore;

    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::with_defaults();
        let options = CacheOptions::default();
        store.set("user:1", b"a".to_vec(), &options).await.unwrap();
        store.set("user:2", b"b".to_vec(), &options).await.unwrap();
        store.set("post:1", b"c".to_vec(), &options).await.unwrap();
        store
    }

    fn invalidator_over(store: MemoryStore) -> PatternInvalidator {
        let layered = LayeredCache::builder()
            .tier(Tier::new("memory", 0, store))
            .build();
        PatternInvalidator::new(Arc::new(layered))
    }

    #[tokio::test]
    async fn test_invalidates_exactly_the_matching_keys() {
        let store = seeded_store().await;
        let invalidator = invalidator_over(store.clone());

        let count = invalidator
            .invalidate("user:*", InvalidationOptions::new())
            .await;

        assert_eq!(count, 2);
        assert!(!store.exists("user:1").await.unwrap());
        assert!(!store.exists("user:2").await.unwrap());
        assert!(store.exists("post:1").await.unwrap());
    }

    #[tokio::test]
    async fn test_question_mark_semantics() {
        let store = MemoryStore::with_defaults();
        let options = CacheOptions::default();
        store.set("abc", b"1".to_vec(), &options).await.unwrap();
        store.set("ac", b"2".to_vec(), &options).await.unwrap();
        store.set("abbc", b"3".to_vec(), &options).await.unwrap();

        let invalidator = invalidator_over(store.clone());
        let count = invalidator
            .invalidate("a?c", InvalidationOptions::new())
            .await;

        assert_eq!(count, 1);
        assert!(!store.exists("abc").await.unwrap());
        assert!(store.exists("ac").await.unwrap());
        assert!(store.exists("abbc").await.unwrap());
    }

    #[tokio::test]
    async fn test_zero_matches_is_zero() {
        let invalidator = invalidator_over(seeded_store().await);
        assert_eq!(
            invalidator
                .invalidate("session:*", InvalidationOptions::new())
                .await,
            0
        );
    }
}
