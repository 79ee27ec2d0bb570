//! Layered access strategy
//!
//! Orders stores from fastest/smallest to slowest/largest and implements
//! read-through with promotion, write/delete fan-out, and multi-key
//! aggregation. One broken tier never fails the overall call: reads
//! treat a failing tier as a miss, and writes succeed as long as at
//! least one tier accepted the value.

use futures::future::join_all;
use tracing::{debug, warn};

use strata_cache_core::{CacheEntry, CacheError, CacheOptions, CacheStats, Result};

use super::tier::Tier;

/// Builder for [`LayeredCache`]
#[derive(Default)]
pub struct LayeredCacheBuilder {
    tiers: Vec<Tier>,
}

impl LayeredCacheBuilder {
    /// Add a tier to the chain
    pub fn tier(mut self, tier: Tier) -> Self {
        self.tiers.push(tier);
        self
    }

    /// Finalize the chain
    ///
    /// Tiers are ordered ascending by priority; ties keep insertion
    /// order. The ordering is fixed for the lifetime of the cache.
    pub fn build(mut self) -> LayeredCache {
        self.tiers.sort_by_key(Tier::priority);
        LayeredCache { tiers: self.tiers }
    }
}

/// An ordered chain of heterogeneous stores
pub struct LayeredCache {
    tiers: Vec<Tier>,
}

impl LayeredCache {
    /// Start building a chain
    pub fn builder() -> LayeredCacheBuilder {
        LayeredCacheBuilder::default()
    }

    /// The ordered tier list
    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Get a value, trying tiers in order
    ///
    /// A hit at a slower tier is promoted to every faster tier by a
    /// fire-and-forget background write; the read returns as soon as the
    /// hitting tier answered. A failing tier is treated as a miss and
    /// the next tier is tried. Returns the entry and the name of the
    /// tier that served it.
    pub async fn get(&self, key: &str) -> Option<(CacheEntry<Vec<u8>>, &str)> {
        for (idx, tier) in self.tiers.iter().enumerate() {
            match tier.execute(|| tier.store().get(key)).await {
                Ok(Some(entry)) => {
                    if idx > 0 {
                        self.spawn_promotion(vec![(key.to_string(), entry.clone())], idx);
                    }
                    return Some((entry, tier.name()));
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(
                        target: "strata_cache",
                        store = tier.name(),
                        key = %key,
                        error = %err,
                        "tier read failed, trying next tier"
                    );
                }
            }
        }
        None
    }

    /// Write a value to every tier concurrently
    ///
    /// Per-tier failures are logged; the call fails only when every tier
    /// rejected the write.
    pub async fn set(&self, key: &str, value: Vec<u8>, options: &CacheOptions) -> Result<()> {
        let outcomes = join_all(self.tiers.iter().map(|tier| {
            let value = value.clone();
            async move {
                tier.execute(|| tier.store().set(key, value, options))
                    .await
                    .map_err(|err| (tier.name().to_string(), err))
            }
        }))
        .await;

        self.join_write_outcomes(outcomes, key, "tier write failed")
    }

    /// Write several pairs to every tier concurrently, same failure
    /// policy as [`set`](Self::set)
    pub async fn set_many(&self, pairs: &[(&str, Vec<u8>)], options: &CacheOptions) -> Result<()> {
        let outcomes = join_all(self.tiers.iter().map(|tier| async move {
            tier.execute(|| tier.store().set_many(pairs, options))
                .await
                .map_err(|err| (tier.name().to_string(), err))
        }))
        .await;

        self.join_write_outcomes(outcomes, "<batch>", "tier batch write failed")
    }

    fn join_write_outcomes(
        &self,
        outcomes: Vec<std::result::Result<(), (String, CacheError)>>,
        key: &str,
        message: &'static str,
    ) -> Result<()> {
        let failures: Vec<(String, String)> = outcomes
            .into_iter()
            .filter_map(|outcome| outcome.err())
            .map(|(store, err)| {
                warn!(
                    target: "strata_cache",
                    store = %store,
                    key = %key,
                    error = %err,
                    "{message}"
                );
                (store, err.to_string())
            })
            .collect();

        if !self.tiers.is_empty() && failures.len() == self.tiers.len() {
            return Err(CacheError::AllStoresFailed { failures });
        }
        Ok(())
    }

    /// Delete a key from every tier concurrently
    ///
    /// Returns `true` if at least one tier reported a deletion; never
    /// raises.
    pub async fn delete(&self, key: &str) -> bool {
        let outcomes = join_all(self.tiers.iter().map(|tier| async move {
            match tier.execute(|| tier.store().delete(key)).await {
                Ok(deleted) => deleted,
                Err(err) => {
                    warn!(
                        target: "strata_cache",
                        store = tier.name(),
                        key = %key,
                        error = %err,
                        "tier delete failed"
                    );
                    false
                }
            }
        }))
        .await;

        outcomes.into_iter().any(|deleted| deleted)
    }

    /// Get several keys, resolving each at the fastest tier that holds it
    ///
    /// Keys not resolved by a tier fall through to the next one; hits at
    /// slower tiers are promoted exactly as in [`get`](Self::get). The
    /// result preserves input ordering, with `None` for unresolved keys.
    pub async fn get_many(&self, keys: &[&str]) -> Vec<Option<CacheEntry<Vec<u8>>>> {
        let mut results: Vec<Option<CacheEntry<Vec<u8>>>> = vec![None; keys.len()];
        let mut pending: Vec<usize> = (0..keys.len()).collect();

        for (idx, tier) in self.tiers.iter().enumerate() {
            if pending.is_empty() {
                break;
            }

            let subset: Vec<&str> = pending.iter().map(|&slot| keys[slot]).collect();
            match tier.execute(|| tier.store().get_many(&subset)).await {
                Ok(found) => {
                    let mut still_pending = Vec::new();
                    let mut promotions = Vec::new();

                    for (&slot, entry) in pending.iter().zip(found) {
                        match entry {
                            Some(entry) => {
                                if idx > 0 {
                                    promotions.push((keys[slot].to_string(), entry.clone()));
                                }
                                results[slot] = Some(entry);
                            }
                            None => still_pending.push(slot),
                        }
                    }

                    pending = still_pending;
                    self.spawn_promotion(promotions, idx);
                }
                Err(err) => {
                    warn!(
                        target: "strata_cache",
                        store = tier.name(),
                        keys = subset.len(),
                        error = %err,
                        "tier multi-read failed, trying next tier"
                    );
                }
            }
        }

        results
    }

    /// Check whether any tier holds the key; errors are treated as "no"
    pub async fn exists(&self, key: &str) -> bool {
        for tier in &self.tiers {
            match tier.execute(|| tier.store().exists(key)).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(err) => {
                    warn!(
                        target: "strata_cache",
                        store = tier.name(),
                        key = %key,
                        error = %err,
                        "tier exists check failed"
                    );
                }
            }
        }
        false
    }

    /// Clear every tier concurrently, best-effort
    pub async fn clear(&self) {
        join_all(self.tiers.iter().map(|tier| async move {
            if let Err(err) = tier.execute(|| tier.store().clear()).await {
                warn!(
                    target: "strata_cache",
                    store = tier.name(),
                    error = %err,
                    "tier clear failed"
                );
            }
        }))
        .await;
    }

    /// Close every tier concurrently, best-effort
    pub async fn close(&self) {
        join_all(self.tiers.iter().map(|tier| async move {
            if let Err(err) = tier.execute(|| tier.store().close()).await {
                warn!(
                    target: "strata_cache",
                    store = tier.name(),
                    error = %err,
                    "tier close failed"
                );
            }
        }))
        .await;
    }

    /// Per-tier statistics; tiers that fail to report are skipped
    pub async fn tier_stats(&self) -> Vec<(String, CacheStats)> {
        let mut all = Vec::with_capacity(self.tiers.len());
        for tier in &self.tiers {
            match tier.execute(|| tier.store().stats()).await {
                Ok(stats) => all.push((tier.name().to_string(), stats)),
                Err(err) => {
                    warn!(
                        target: "strata_cache",
                        store = tier.name(),
                        error = %err,
                        "tier stats unavailable"
                    );
                }
            }
        }
        all
    }

    /// Aggregate statistics across all reporting tiers
    pub async fn stats(&self) -> CacheStats {
        let mut merged = CacheStats::default();
        for (_, stats) in self.tier_stats().await {
            merged.merge(&stats);
        }
        merged
    }

    /// Replicate entries found at tier `found_at` into every faster tier.
    ///
    /// Fire-and-forget: the spawned task is never joined and its
    /// failures are only logged.
    fn spawn_promotion(&self, writes: Vec<(String, CacheEntry<Vec<u8>>)>, found_at: usize) {
        if found_at == 0 || writes.is_empty() {
            return;
        }

        let upper: Vec<Tier> = self.tiers[..found_at].to_vec();
        tokio::spawn(async move {
            for (key, entry) in &writes {
                let options = CacheOptions::for_promotion(entry);
                for tier in &upper {
                    let outcome = tier
                        .execute(|| tier.store().set(key, entry.value.clone(), &options))
                        .await;
                    if let Err(err) = outcome {
                        debug!(
                            target: "strata_cache",
                            store = tier.name(),
                            key = %key,
                            error = %err,
                            "promotion write failed"
                        );
                    }
                }
            }
        });
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use super::*;
    use crate::layered::{BreakerConfig, Tier};
    use crate::memory::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use strata_cache_core::CacheStore;

    /// Store double whose every operation fails with a backend error
    #[derive(Clone, Default)]
    struct FailingStore {
        calls: Arc<AtomicU32>,
    }

    impl FailingStore {
        fn fail<T>(&self) -> Result<T> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::Backend("store down".to_string()))
        }
    }

    #[async_trait]
    impl CacheStore for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<CacheEntry<Vec<u8>>>> {
            self.fail()
        }
        async fn set(&self, _key: &str, _value: Vec<u8>, _options: &CacheOptions) -> Result<()> {
            self.fail()
        }
        async fn delete(&self, _key: &str) -> Result<bool> {
            self.fail()
        }
        async fn exists(&self, _key: &str) -> Result<bool> {
            self.fail()
        }
        async fn get_many(&self, _keys: &[&str]) -> Result<Vec<Option<CacheEntry<Vec<u8>>>>> {
            self.fail()
        }
        async fn set_many(&self, _entries: &[(&str, Vec<u8>)], _opts: &CacheOptions) -> Result<()> {
            self.fail()
        }
        async fn delete_many(&self, _keys: &[&str]) -> Result<u64> {
            self.fail()
        }
        async fn keys(&self, _pattern: Option<&str>) -> Result<Vec<String>> {
            self.fail()
        }
        async fn clear(&self) -> Result<()> {
            self.fail()
        }
        async fn stats(&self) -> Result<CacheStats> {
            self.fail()
        }
        async fn len(&self) -> Result<usize> {
            self.fail()
        }
    }

    fn two_memory_tiers() -> (MemoryStore, MemoryStore, LayeredCache) {
        let fast = MemoryStore::with_defaults();
        let slow = MemoryStore::with_defaults();
        let layered = LayeredCache::builder()
            .tier(Tier::new("fast", 0, fast.clone()))
            .tier(Tier::new("slow", 1, slow.clone()))
            .build();
        (fast, slow, layered)
    }

    #[tokio::test]
    async fn test_tier_ordering_is_stable() {
        let layered = LayeredCache::builder()
            .tier(Tier::new("b", 1, MemoryStore::with_defaults()))
            .tier(Tier::new("a", 0, MemoryStore::with_defaults()))
            .tier(Tier::new("c", 1, MemoryStore::with_defaults()))
            .build();

        let names: Vec<&str> = layered.tiers().iter().map(Tier::name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_get_promotes_to_faster_tiers() {
        let (fast, slow, layered) = two_memory_tiers();

        slow.set("key", b"val".to_vec(), &CacheOptions::default())
            .await
            .unwrap();
        assert!(!fast.exists("key").await.unwrap());

        let (entry, tier) = layered.get("key").await.unwrap();
        assert_eq!(entry.value, b"val".to_vec());
        assert_eq!(tier, "slow");

        // Promotion is fire-and-forget; give it a moment to settle
        tokio::time::sleep(Duration::from_millis(50)).await;
        let promoted = fast.get("key").await.unwrap();
        assert_eq!(promoted.unwrap().value, b"val".to_vec());
    }

    #[tokio::test]
    async fn test_get_skips_failing_tier() {
        let failing = FailingStore::default();
        let slow = MemoryStore::with_defaults();
        let layered = LayeredCache::builder()
            .tier(Tier::new("broken", 0, failing))
            .tier(Tier::new("slow", 1, slow.clone()))
            .build();

        slow.set("key", b"val".to_vec(), &CacheOptions::default())
            .await
            .unwrap();

        let (entry, tier) = layered.get("key").await.unwrap();
        assert_eq!(entry.value, b"val".to_vec());
        assert_eq!(tier, "slow");
    }

    #[tokio::test]
    async fn test_get_all_miss_is_none() {
        let (_, _, layered) = two_memory_tiers();
        assert!(layered.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_set_partial_failure_is_success() {
        let good = MemoryStore::with_defaults();
        let layered = LayeredCache::builder()
            .tier(Tier::new("broken", 0, FailingStore::default()))
            .tier(Tier::new("good", 1, good.clone()))
            .build();

        layered
            .set("key", b"val".to_vec(), &CacheOptions::default())
            .await
            .unwrap();
        assert!(good.exists("key").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_all_fail_raises_aggregate() {
        let layered = LayeredCache::builder()
            .tier(Tier::new("first", 0, FailingStore::default()))
            .tier(Tier::new("second", 1, FailingStore::default()))
            .build();

        let err = layered
            .set("key", b"val".to_vec(), &CacheOptions::default())
            .await
            .unwrap_err();

        match err {
            CacheError::AllStoresFailed { failures } => {
                let stores: Vec<&str> = failures.iter().map(|(s, _)| s.as_str()).collect();
                assert!(stores.contains(&"first"));
                assert!(stores.contains(&"second"));
            }
            other => panic!("expected AllStoresFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_true_if_any_tier_deleted() {
        let (fast, slow, layered) = two_memory_tiers();

        slow.set("key", b"val".to_vec(), &CacheOptions::default())
            .await
            .unwrap();
        assert!(!fast.exists("key").await.unwrap());

        assert!(layered.delete("key").await);
        assert!(!layered.delete("key").await);
    }

    #[tokio::test]
    async fn test_delete_never_raises() {
        let layered = LayeredCache::builder()
            .tier(Tier::new("broken", 0, FailingStore::default()))
            .build();
        assert!(!layered.delete("key").await);
    }

    #[tokio::test]
    async fn test_get_many_preserves_order_and_falls_through() {
        let (fast, slow, layered) = two_memory_tiers();
        let options = CacheOptions::default();

        fast.set("a", b"fast-a".to_vec(), &options).await.unwrap();
        slow.set("b", b"slow-b".to_vec(), &options).await.unwrap();

        let results = layered.get_many(&["a", "b", "missing"]).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().value, b"fast-a".to_vec());
        assert_eq!(results[1].as_ref().unwrap().value, b"slow-b".to_vec());
        assert!(results[2].is_none());

        // "b" was found at the slow tier and gets promoted
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(fast.exists("b").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_many_fans_out() {
        let (fast, slow, layered) = two_memory_tiers();

        layered
            .set_many(
                &[("a", b"1".to_vec()), ("b", b"2".to_vec())],
                &CacheOptions::default(),
            )
            .await
            .unwrap();

        assert!(fast.exists("a").await.unwrap());
        assert!(slow.exists("b").await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_is_best_effort() {
        let good = MemoryStore::with_defaults();
        let layered = LayeredCache::builder()
            .tier(Tier::new("broken", 0, FailingStore::default()))
            .tier(Tier::new("good", 1, good.clone()))
            .build();

        good.set("key", b"val".to_vec(), &CacheOptions::default())
            .await
            .unwrap();
        layered.clear().await;
        assert_eq!(good.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_breaker_stops_calls_to_failing_tier() {
        let failing = FailingStore::default();
        let calls = failing.calls.clone();
        let slow = MemoryStore::with_defaults();
        let layered = LayeredCache::builder()
            .tier(
                Tier::new("flaky", 0, failing).with_breaker(BreakerConfig {
                    failure_threshold: 1,
                    open_timeout: Duration::from_secs(60),
                }),
            )
            .tier(Tier::new("slow", 1, slow.clone()))
            .build();

        slow.set("key", b"val".to_vec(), &CacheOptions::default())
            .await
            .unwrap();

        // Trip the breaker deterministically through the tier itself
        let flaky = &layered.tiers()[0];
        assert!(flaky.execute(|| flaky.store().get("key")).await.is_err());
        assert!(flaky.breaker().unwrap().snapshot().open);
        let before = calls.load(Ordering::SeqCst);

        // Breaker open: the flaky store is never invoked (not even by
        // the promotion write), reads still succeed from the healthy tier
        assert!(layered.get("key").await.is_some());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(calls.load(Ordering::SeqCst), before);
    }

    #[tokio::test]
    async fn test_stats_aggregation() {
        let (fast, _, layered) = two_memory_tiers();
        fast.set("key", b"val".to_vec(), &CacheOptions::default())
            .await
            .unwrap();

        let per_tier = layered.tier_stats().await;
        assert_eq!(per_tier.len(), 2);
        assert_eq!(per_tier[0].0, "fast");

        let merged = layered.stats().await;
        assert_eq!(merged.writes, 1);
    }
}
