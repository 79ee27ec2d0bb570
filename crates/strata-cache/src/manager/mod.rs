//! High-level cache manager
//!
//! Thin coordinator over the layered engine and the three invalidators.
//! Every public call is validated before any I/O and wrapped with
//! started/succeeded/failed instrumentation hooks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Serialize, de::DeserializeOwned};

use strata_cache_core::{
    CacheError, CacheKey, CacheMetrics, CacheOperation, CacheOptions, CacheResult, CacheStats,
    Compressor, InvalidationKind, InvalidationOptions, JsonSerializer, NoopCompressor,
    NoopMetrics, Result, Serializer,
};
use strata_cache_core::CacheEntry;
use strata_cache_storage::LayeredCache;

use crate::invalidate::{DependencyInvalidator, PatternInvalidator, TagInvalidator};

/// Configuration for CacheManager
#[derive(Debug, Clone)]
pub struct CacheManagerConfig {
    /// Default TTL for entries without explicit TTL
    pub default_ttl: Option<Duration>,
    /// Namespace prefix for all keys
    pub namespace: Option<String>,
    /// TTL jitter percentage (0.0 - 1.0) to de-synchronize expiry
    pub ttl_jitter: f64,
}

impl Default for CacheManagerConfig {
    fn default() -> Self {
        Self {
            default_ttl: Some(Duration::from_secs(300)),
            namespace: None,
            ttl_jitter: 0.1, // 10% jitter
        }
    }
}

impl CacheManagerConfig {
    /// Create config with specific default TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            default_ttl: Some(ttl),
            ..Default::default()
        }
    }

    /// Create config with namespace
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Default::default()
        }
    }

    /// Disable TTL jitter
    pub fn no_jitter(mut self) -> Self {
        self.ttl_jitter = 0.0;
        self
    }
}

/// High-level cache manager with pluggable serialization, metrics and
/// compression
///
/// Generic over:
/// - `S`: The serializer (JSON, MessagePack, Bincode)
/// - `M`: The metrics collector
/// - `C`: The compressor
pub struct CacheManager<S = JsonSerializer, M = NoopMetrics, C = NoopCompressor>
where
    S: Serializer,
    M: CacheMetrics,
    C: Compressor,
{
    layered: Arc<LayeredCache>,
    serializer: Arc<S>,
    metrics: Arc<M>,
    compressor: Arc<C>,
    config: CacheManagerConfig,
    tags: TagInvalidator,
    patterns: PatternInvalidator,
    dependencies: DependencyInvalidator,
}

impl CacheManager<JsonSerializer, NoopMetrics, NoopCompressor> {
    /// Create a new CacheManager with default JSON serializer, no
    /// metrics and no compression
    pub fn new(layered: LayeredCache) -> Self {
        Self::with_config(layered, CacheManagerConfig::default())
    }

    /// Create with custom config
    pub fn with_config(layered: LayeredCache, config: CacheManagerConfig) -> Self {
        Self::with_components(layered, JsonSerializer, NoopMetrics, NoopCompressor, config)
    }
}

impl<S, M, C> CacheManager<S, M, C>
where
    S: Serializer,
    M: CacheMetrics,
    C: Compressor,
{
    /// Create a CacheManager with custom serializer, metrics and compressor
    pub fn with_components(
        layered: LayeredCache,
        serializer: S,
        metrics: M,
        compressor: C,
        config: CacheManagerConfig,
    ) -> Self {
        let layered = Arc::new(layered);
        Self {
            tags: TagInvalidator::new(layered.clone()),
            patterns: PatternInvalidator::new(layered.clone()),
            dependencies: DependencyInvalidator::new(layered.clone()),
            layered,
            serializer: Arc::new(serializer),
            metrics: Arc::new(metrics),
            compressor: Arc::new(compressor),
            config,
        }
    }

    /// The underlying tier chain
    pub fn layered(&self) -> &LayeredCache {
        &self.layered
    }

    /// Get the full key with namespace prefix
    fn full_key(&self, key: &str) -> String {
        match &self.config.namespace {
            Some(ns) => format!("{ns}:{key}"),
            None => key.to_string(),
        }
    }

    /// Apply TTL jitter to de-synchronize mass expiry
    fn apply_ttl_jitter(&self, ttl: Duration) -> Duration {
        if self.config.ttl_jitter > 0.0 {
            let jitter_range = (ttl.as_secs_f64() * self.config.ttl_jitter) as u64;
            if jitter_range > 0 {
                let jitter = rand::random::<u64>() % jitter_range;
                return ttl + Duration::from_secs(jitter);
            }
        }
        ttl
    }

    fn validate_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(CacheError::Validation("cache key must not be empty".into()));
        }
        Ok(())
    }

    fn validate_label(what: &str, value: &str) -> Result<()> {
        if value.is_empty() {
            return Err(CacheError::Validation(format!("{what} must not be empty")));
        }
        Ok(())
    }

    /// Record success/failure and duration for a finished operation
    fn observe<T>(&self, operation: CacheOperation, start: Instant, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.metrics.operation_succeeded(operation, start.elapsed()),
            Err(err) => self.metrics.operation_failed(operation, start.elapsed(), err),
        }
        result
    }

    /// Get a typed value from the cache
    pub async fn get<T>(&self, key: impl CacheKey) -> Result<CacheResult<T>>
    where
        T: DeserializeOwned,
    {
        self.metrics.operation_started(CacheOperation::Get);
        let start = Instant::now();
        let result = self.get_inner(key).await;
        self.observe(CacheOperation::Get, start, result)
    }

    async fn get_inner<T>(&self, key: impl CacheKey) -> Result<CacheResult<T>>
    where
        T: DeserializeOwned,
    {
        let raw_key = key.full_key();
        Self::validate_key(&raw_key)?;
        let full_key = self.full_key(&raw_key);

        match self.layered.get(&full_key).await {
            Some((entry, tier)) => {
                self.metrics.record_hit(&full_key, tier);
                Ok(CacheResult::Hit(self.decode_entry(entry)?))
            }
            None => {
                self.metrics.record_miss(&full_key);
                Ok(CacheResult::Miss)
            }
        }
    }

    /// Get the raw stored bytes for a key (decompressed, not deserialized)
    pub async fn get_bytes(&self, key: impl CacheKey) -> Result<CacheResult<Vec<u8>>> {
        self.metrics.operation_started(CacheOperation::Get);
        let start = Instant::now();

        let result = async {
            let raw_key = key.full_key();
            Self::validate_key(&raw_key)?;
            let full_key = self.full_key(&raw_key);

            match self.layered.get(&full_key).await {
                Some((entry, tier)) => {
                    self.metrics.record_hit(&full_key, tier);
                    Ok(CacheResult::Hit(self.decompress_entry(entry)?))
                }
                None => {
                    self.metrics.record_miss(&full_key);
                    Ok(CacheResult::Miss)
                }
            }
        }
        .await;

        self.observe(CacheOperation::Get, start, result)
    }

    /// Set a typed value in the cache
    pub async fn set<T>(
        &self,
        key: impl CacheKey,
        value: &T,
        options: impl Into<CacheOptions>,
    ) -> Result<()>
    where
        T: Serialize,
    {
        self.metrics.operation_started(CacheOperation::Set);
        let start = Instant::now();

        let result = async {
            let raw_key = key.full_key();
            Self::validate_key(&raw_key)?;
            let full_key = self.full_key(&raw_key);

            let serialize_start = Instant::now();
            let serialized = self.serializer.serialize(value)?;
            self.metrics
                .operation_succeeded(CacheOperation::Serialize, serialize_start.elapsed());

            self.write_bytes(&full_key, serialized, options.into()).await
        }
        .await;

        self.observe(CacheOperation::Set, start, result)
    }

    /// Set raw bytes under a key, bypassing serialization
    pub async fn set_bytes(
        &self,
        key: impl CacheKey,
        bytes: Vec<u8>,
        options: impl Into<CacheOptions>,
    ) -> Result<()> {
        self.metrics.operation_started(CacheOperation::Set);
        let start = Instant::now();

        let result = async {
            let raw_key = key.full_key();
            Self::validate_key(&raw_key)?;
            let full_key = self.full_key(&raw_key);
            self.write_bytes(&full_key, bytes, options.into()).await
        }
        .await;

        self.observe(CacheOperation::Set, start, result)
    }

    /// Shared write path: default TTL, jitter, optional compression,
    /// fan-out through the layered engine
    async fn write_bytes(
        &self,
        full_key: &str,
        mut bytes: Vec<u8>,
        mut options: CacheOptions,
    ) -> Result<()> {
        if options.ttl.is_none() {
            options.ttl = self.config.default_ttl;
        }
        if let Some(ttl) = options.ttl {
            options.ttl = Some(self.apply_ttl_jitter(ttl));
        }

        if options.compress {
            if self.compressor.should_compress(&bytes) {
                let start = Instant::now();
                bytes = self.compressor.compress(&bytes)?;
                self.metrics
                    .operation_succeeded(CacheOperation::Compress, start.elapsed());
            } else {
                // Keep the stored flag truthful for payloads below the threshold
                options.compress = false;
            }
        }

        self.layered.set(full_key, bytes, &options).await
    }

    /// Get several typed values; result order matches the input keys
    pub async fn get_many<T>(&self, keys: &[&str]) -> Result<Vec<CacheResult<T>>>
    where
        T: DeserializeOwned,
    {
        self.metrics.operation_started(CacheOperation::GetMany);
        let start = Instant::now();

        let result = async {
            for key in keys {
                Self::validate_key(key)?;
            }
            let full_keys: Vec<String> = keys.iter().map(|k| self.full_key(k)).collect();
            let refs: Vec<&str> = full_keys.iter().map(String::as_str).collect();

            let entries = self.layered.get_many(&refs).await;
            entries
                .into_iter()
                .map(|entry| match entry {
                    Some(entry) => Ok(CacheResult::Hit(self.decode_entry(entry)?)),
                    None => Ok(CacheResult::Miss),
                })
                .collect()
        }
        .await;

        self.observe(CacheOperation::GetMany, start, result)
    }

    /// Set several typed values sharing one set of options
    ///
    /// The compression threshold is not consulted here: with `compress`
    /// set, every payload in the batch is compressed.
    pub async fn set_many<T>(
        &self,
        pairs: &[(&str, T)],
        options: impl Into<CacheOptions>,
    ) -> Result<()>
    where
        T: Serialize,
    {
        self.metrics.operation_started(CacheOperation::SetMany);
        let start = Instant::now();
        let mut options = options.into();

        let result = async {
            if options.ttl.is_none() {
                options.ttl = self.config.default_ttl;
            }
            if let Some(ttl) = options.ttl {
                options.ttl = Some(self.apply_ttl_jitter(ttl));
            }

            let mut full_keys = Vec::with_capacity(pairs.len());
            let mut payloads = Vec::with_capacity(pairs.len());
            for (key, value) in pairs {
                Self::validate_key(key)?;
                full_keys.push(self.full_key(key));

                let mut bytes = self.serializer.serialize(value)?;
                if options.compress {
                    bytes = self.compressor.compress(&bytes)?;
                }
                payloads.push(bytes);
            }

            let batch: Vec<(&str, Vec<u8>)> = full_keys
                .iter()
                .map(String::as_str)
                .zip(payloads)
                .collect();
            self.layered.set_many(&batch, &options).await
        }
        .await;

        self.observe(CacheOperation::SetMany, start, result)
    }

    /// Delete a key from every tier
    ///
    /// Returns `true` if at least one tier reported a deletion.
    pub async fn delete(&self, key: impl CacheKey) -> Result<bool> {
        self.metrics.operation_started(CacheOperation::Delete);
        let start = Instant::now();

        let result = async {
            let raw_key = key.full_key();
            Self::validate_key(&raw_key)?;
            let full_key = self.full_key(&raw_key);
            Ok(self.layered.delete(&full_key).await)
        }
        .await;

        self.observe(CacheOperation::Delete, start, result)
    }

    /// Check if a key exists in any tier
    pub async fn exists(&self, key: impl CacheKey) -> Result<bool> {
        self.metrics.operation_started(CacheOperation::Exists);
        let start = Instant::now();

        let result = async {
            let raw_key = key.full_key();
            Self::validate_key(&raw_key)?;
            let full_key = self.full_key(&raw_key);
            Ok(self.layered.exists(&full_key).await)
        }
        .await;

        self.observe(CacheOperation::Exists, start, result)
    }

    /// Clear every tier, best-effort
    pub async fn clear(&self) -> Result<()> {
        self.metrics.operation_started(CacheOperation::Clear);
        let start = Instant::now();
        self.layered.clear().await;
        self.observe(CacheOperation::Clear, start, Ok(()))
    }

    /// Close every tier, best-effort
    pub async fn close(&self) -> Result<()> {
        self.metrics.operation_started(CacheOperation::Close);
        let start = Instant::now();
        self.layered.close().await;
        self.observe(CacheOperation::Close, start, Ok(()))
    }

    /// Aggregate statistics across all tiers
    pub async fn stats(&self) -> Result<CacheStats> {
        Ok(self.layered.stats().await)
    }

    /// Per-tier statistics
    pub async fn tier_stats(&self) -> Result<Vec<(String, CacheStats)>> {
        Ok(self.layered.tier_stats().await)
    }

    /// Invalidate every entry carrying `tag`
    pub async fn invalidate_tag(&self, tag: &str, options: InvalidationOptions) -> Result<u64> {
        self.metrics.operation_started(CacheOperation::InvalidateTag);
        let start = Instant::now();

        let result = async {
            Self::validate_label("tag", tag)?;
            let count = self.tags.invalidate(tag, options).await;
            self.metrics.record_invalidation(InvalidationKind::Tag, count);
            Ok(count)
        }
        .await;

        self.observe(CacheOperation::InvalidateTag, start, result)
    }

    /// Invalidate every entry whose key matches the glob `pattern`
    pub async fn invalidate_pattern(
        &self,
        pattern: &str,
        options: InvalidationOptions,
    ) -> Result<u64> {
        self.metrics
            .operation_started(CacheOperation::InvalidatePattern);
        let start = Instant::now();

        let result = async {
            Self::validate_label("pattern", pattern)?;
            let count = self.patterns.invalidate(pattern, options).await;
            self.metrics
                .record_invalidation(InvalidationKind::Pattern, count);
            Ok(count)
        }
        .await;

        self.observe(CacheOperation::InvalidatePattern, start, result)
    }

    /// Invalidate every entry depending on `dependency`
    pub async fn invalidate_dependency(
        &self,
        dependency: &str,
        options: InvalidationOptions,
    ) -> Result<u64> {
        self.metrics
            .operation_started(CacheOperation::InvalidateDependency);
        let start = Instant::now();

        let result = async {
            Self::validate_label("dependency", dependency)?;
            let count = self.dependencies.invalidate(dependency, options).await;
            self.metrics
                .record_invalidation(InvalidationKind::Dependency, count);
            Ok(count)
        }
        .await;

        self.observe(CacheOperation::InvalidateDependency, start, result)
    }

    /// Invalidate a batch of dependencies sharing one visited set
    pub async fn invalidate_dependencies(
        &self,
        dependencies: &[&str],
        options: InvalidationOptions,
    ) -> Result<u64> {
        self.metrics
            .operation_started(CacheOperation::InvalidateDependency);
        let start = Instant::now();

        let result = async {
            for dependency in dependencies {
                Self::validate_label("dependency", dependency)?;
            }
            let count = self.dependencies.invalidate_many(dependencies, options).await;
            self.metrics
                .record_invalidation(InvalidationKind::Dependency, count);
            Ok(count)
        }
        .await;

        self.observe(CacheOperation::InvalidateDependency, start, result)
    }

    /// Undo compression on a fetched entry
    fn decompress_entry(&self, mut entry: CacheEntry<Vec<u8>>) -> Result<CacheEntry<Vec<u8>>> {
        if !entry.compressed {
            return Ok(entry);
        }
        let start = Instant::now();
        entry.value = self.compressor.decompress(&entry.value)?;
        entry.compressed = false;
        self.metrics
            .operation_succeeded(CacheOperation::Decompress, start.elapsed());
        Ok(entry)
    }

    /// Decompress and deserialize a fetched entry
    fn decode_entry<T>(&self, entry: CacheEntry<Vec<u8>>) -> Result<CacheEntry<T>>
    where
        T: DeserializeOwned,
    {
        let entry = self.decompress_entry(entry)?;

        let start = Instant::now();
        let value: T = self.serializer.deserialize(&entry.value)?;
        self.metrics
            .operation_succeeded(CacheOperation::Deserialize, start.elapsed());

        Ok(entry.map(|_| value))
    }
}

impl<S, M, C> Clone for CacheManager<S, M, C>
where
    S: Serializer,
    M: CacheMetrics,
    C: Compressor,
{
    fn clone(&self) -> Self {
        Self {
            layered: self.layered.clone(),
            serializer: self.serializer.clone(),
            metrics: self.metrics.clone(),
            compressor: self.compressor.clone(),
            config: self.config.clone(),
            tags: self.tags.clone(),
            patterns: self.patterns.clone(),
            dependencies: self.dependencies.clone(),
        }
    }
}

#[cfg(all(test, feature = "memory", feature = "json"))]
mod tests {
    use super::*;
    use strata_cache_core::CacheOpts;
    use strata_cache_storage::{MemoryStore, Tier};

    fn single_tier_manager() -> CacheManager {
        let layered = LayeredCache::builder()
            .tier(Tier::new("memory", 0, MemoryStore::with_defaults()))
            .build();
        CacheManager::with_config(
            layered,
            CacheManagerConfig::default().no_jitter(),
        )
    }

    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct TestData {
        id: u64,
        name: String,
    }

    #[tokio::test]
    async fn test_typed_roundtrip() {
        let cache = single_tier_manager();
        let data = TestData {
            id: 1,
            name: "test".to_string(),
        };

        cache.set("test_key", &data, CacheOpts::new()).await.unwrap();

        match cache.get::<TestData>("test_key").await.unwrap() {
            CacheResult::Hit(entry) => assert_eq!(entry.value, data),
            CacheResult::Miss => panic!("expected cache hit"),
        }
    }

    #[tokio::test]
    async fn test_miss() {
        let cache = single_tier_manager();
        assert!(cache.get::<i32>("nonexistent").await.unwrap().is_miss());
    }

    #[tokio::test]
    async fn test_empty_key_is_rejected_before_io() {
        let cache = single_tier_manager();

        let err = cache.get::<i32>("").await.unwrap_err();
        assert!(matches!(err, CacheError::Validation(_)));

        let err = cache.set("", &1i32, CacheOpts::new()).await.unwrap_err();
        assert!(matches!(err, CacheError::Validation(_)));

        let err = cache
            .invalidate_tag("", InvalidationOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Validation(_)));
    }

    #[tokio::test]
    async fn test_namespace_prefixing() {
        let layered = LayeredCache::builder()
            .tier(Tier::new("memory", 0, MemoryStore::with_defaults()))
            .build();
        let cache = CacheManager::with_config(
            layered,
            CacheManagerConfig::with_namespace("myapp").no_jitter(),
        );

        cache.set("key", &42i32, CacheOpts::new()).await.unwrap();
        assert!(cache.exists("key").await.unwrap());
        assert_eq!(cache.get::<i32>("key").await.unwrap().value(), Some(42));
    }

    #[tokio::test]
    async fn test_default_ttl_applies() {
        let layered = LayeredCache::builder()
            .tier(Tier::new("memory", 0, MemoryStore::with_defaults()))
            .build();
        let cache = CacheManager::with_config(
            layered,
            CacheManagerConfig::with_ttl(Duration::from_secs(60)).no_jitter(),
        );

        cache.set("key", &42i32, CacheOpts::new()).await.unwrap();

        let entry = cache.get::<i32>("key").await.unwrap().entry().unwrap();
        assert_eq!(entry.ttl, Some(Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn test_explicit_ttl_wins() {
        let cache = single_tier_manager();
        cache
            .set("key", &42i32, CacheOpts::new().ttl_secs(120))
            .await
            .unwrap();

        let entry = cache.get::<i32>("key").await.unwrap().entry().unwrap();
        assert_eq!(entry.ttl, Some(Duration::from_secs(120)));
    }

    #[tokio::test]
    async fn test_delete_and_exists() {
        let cache = single_tier_manager();
        cache.set("key", &42i32, CacheOpts::new()).await.unwrap();
        assert!(cache.exists("key").await.unwrap());

        assert!(cache.delete("key").await.unwrap());
        assert!(!cache.exists("key").await.unwrap());
        assert!(!cache.delete("key").await.unwrap());
    }

    #[tokio::test]
    async fn test_raw_bytes_roundtrip() {
        let cache = single_tier_manager();
        cache
            .set_bytes("blob", vec![1, 2, 3], CacheOpts::new())
            .await
            .unwrap();

        match cache.get_bytes("blob").await.unwrap() {
            CacheResult::Hit(entry) => assert_eq!(entry.value, vec![1, 2, 3]),
            CacheResult::Miss => panic!("expected hit"),
        }
    }

    #[tokio::test]
    async fn test_noop_compressor_clears_flag() {
        let cache = single_tier_manager();
        cache
            .set("key", &"x".repeat(1024), CacheOpts::new().compress())
            .await
            .unwrap();

        // NoopCompressor never volunteers, so the stored entry must not
        // claim to be compressed
        let entry = cache.get::<String>("key").await.unwrap().entry().unwrap();
        assert!(!entry.compressed);
    }

    #[tokio::test]
    async fn test_get_many_and_set_many() {
        let cache = single_tier_manager();
        cache
            .set_many(&[("a", 1i32), ("b", 2i32)], CacheOpts::new())
            .await
            .unwrap();

        let results = cache.get_many::<i32>(&["a", "missing", "b"]).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].clone().value(), Some(1));
        assert!(results[1].is_miss());
        assert_eq!(results[2].clone().value(), Some(2));
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = single_tier_manager();
        cache.set("key", &42i32, CacheOpts::new()).await.unwrap();
        cache.clear().await.unwrap();
        assert!(!cache.exists("key").await.unwrap());
    }

    #[tokio::test]
    async fn test_stats_aggregation() {
        let cache = single_tier_manager();
        cache.set("key", &42i32, CacheOpts::new()).await.unwrap();

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.writes, 1);

        let per_tier = cache.tier_stats().await.unwrap();
        assert_eq!(per_tier.len(), 1);
        assert_eq!(per_tier[0].0, "memory");
    }
}
