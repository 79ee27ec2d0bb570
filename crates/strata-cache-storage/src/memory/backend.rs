//! In-memory store backend using DashMap

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use strata_cache_core::{
    CacheEntry, CacheOptions, CacheStats, CacheStore, DependencyStore, GlobMatcher, PatternStore,
    Result, TaggableStore,
};

use super::expiry::ExpiryIndex;

/// Configuration for the memory store
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Maximum number of entries (0 = unlimited); the least recently
    /// accessed entries are evicted once the limit is reached
    pub max_entries: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
        }
    }
}

impl MemoryConfig {
    /// Create config with specific capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            max_entries: capacity,
        }
    }

    /// Create config with unlimited capacity
    pub fn unlimited() -> Self {
        Self { max_entries: 0 }
    }
}

/// Internal statistics tracking
#[derive(Debug, Default)]
struct MemoryStatsInner {
    hits: u64,
    misses: u64,
    writes: u64,
    deletes: u64,
    evictions: u64,
}

/// Label -> keys index used for both tags and dependencies
type KeyIndex = DashMap<String, HashSet<String>>;

/// In-process LRU store
///
/// Uses `DashMap` for concurrent access; tag and dependency indexes are
/// maintained alongside the data map and pruned as entries disappear.
/// Cloning creates a new handle to the SAME underlying store.
#[derive(Clone)]
pub struct MemoryStore {
    /// Main data store
    data: Arc<DashMap<String, CacheEntry<Vec<u8>>>>,
    /// Tag -> keys index
    tag_index: Arc<KeyIndex>,
    /// Dependency -> keys index
    dep_index: Arc<KeyIndex>,
    /// TTL expiration index
    expiry: Arc<Mutex<ExpiryIndex>>,
    /// Statistics
    stats: Arc<RwLock<MemoryStatsInner>>,
    /// Configuration
    config: MemoryConfig,
}

impl MemoryStore {
    /// Create a new memory store
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            data: Arc::new(DashMap::new()),
            tag_index: Arc::new(DashMap::new()),
            dep_index: Arc::new(DashMap::new()),
            expiry: Arc::new(Mutex::new(ExpiryIndex::new())),
            stats: Arc::new(RwLock::new(MemoryStatsInner::default())),
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults() -> Self {
        Self::new(MemoryConfig::default())
    }

    /// Remove `key` from an index bucket, dropping the bucket once empty
    fn detach_from(index: &KeyIndex, label: &str, key: &str) {
        if let Some(mut keys) = index.get_mut(label) {
            keys.remove(key);
        }
        index.remove_if(label, |_, keys| keys.is_empty());
    }

    /// Remove an entry's index memberships
    fn detach_indexes(&self, key: &str, entry: &CacheEntry<Vec<u8>>) {
        for tag in &entry.tags {
            Self::detach_from(&self.tag_index, tag, key);
        }
        for dep in &entry.dependencies {
            Self::detach_from(&self.dep_index, dep, key);
        }
    }

    /// Remove an entry and clean up every index referencing it
    fn remove_entry(&self, key: &str) -> bool {
        match self.data.remove(key) {
            Some((_, entry)) => {
                self.expiry.lock().cancel(key);
                self.detach_indexes(key, &entry);
                true
            }
            None => false,
        }
    }

    /// Evict least-recently-accessed entries until there is room for one more
    fn evict_lru(&self) {
        if self.config.max_entries == 0 || self.data.len() < self.config.max_entries {
            return;
        }

        let overshoot = self.data.len() - self.config.max_entries + 1;
        let mut candidates: Vec<(SystemTime, String)> = self
            .data
            .iter()
            .map(|entry| (entry.last_accessed, entry.key().clone()))
            .collect();
        candidates.sort_by_key(|(accessed, _)| *accessed);

        for (_, key) in candidates.into_iter().take(overshoot) {
            if self.remove_entry(&key) {
                self.stats.write().evictions += 1;
            }
        }
    }

    /// Drop entries whose TTL deadline has passed; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let due = self.expiry.lock().drain_due(Instant::now());
        let mut count = 0;

        for key in due {
            let expired = self
                .data
                .get(&key)
                .map(|entry| entry.is_expired())
                .unwrap_or(false);
            if expired && self.remove_entry(&key) {
                self.stats.write().evictions += 1;
                count += 1;
            }
        }

        count
    }

    /// Get approximate memory usage
    pub fn memory_usage(&self) -> usize {
        self.data
            .iter()
            .map(|entry| entry.size + entry.key().len())
            .sum()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry<Vec<u8>>>> {
        match self.data.get_mut(key) {
            Some(mut entry) => {
                if entry.is_expired() {
                    drop(entry);
                    self.remove_entry(key);
                    self.stats.write().misses += 1;
                    return Ok(None);
                }

                entry.last_accessed = SystemTime::now();
                entry.access_count += 1;

                self.stats.write().hits += 1;
                Ok(Some(entry.clone()))
            }
            None => {
                self.stats.write().misses += 1;
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, options: &CacheOptions) -> Result<()> {
        self.purge_expired();
        self.evict_lru();

        let size = value.len();
        let now = SystemTime::now();

        let entry = CacheEntry {
            value,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            ttl: options.ttl,
            tags: options.tags.clone(),
            dependencies: options.dependencies.clone(),
            compressed: options.compress,
            size,
        };

        if let Some(ttl) = options.ttl {
            self.expiry.lock().schedule(key, ttl);
        } else {
            self.expiry.lock().cancel(key);
        }

        // An overwrite must not leave the old entry's index memberships behind
        if let Some(old) = self.data.insert(key.to_string(), entry) {
            self.detach_indexes(key, &old);
        }

        for tag in &options.tags {
            self.tag_index
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
        }
        for dep in &options.dependencies {
            self.dep_index
                .entry(dep.clone())
                .or_default()
                .insert(key.to_string());
        }

        self.stats.write().writes += 1;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        if self.remove_entry(key) {
            self.stats.write().deletes += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        match self.data.get(key) {
            Some(entry) => Ok(!entry.is_expired()),
            None => Ok(false),
        }
    }

    async fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<CacheEntry<Vec<u8>>>>> {
        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            results.push(self.get(key).await?);
        }
        Ok(results)
    }

    async fn set_many(&self, entries: &[(&str, Vec<u8>)], options: &CacheOptions) -> Result<()> {
        for (key, value) in entries {
            self.set(key, value.clone(), options).await?;
        }
        Ok(())
    }

    async fn delete_many(&self, keys: &[&str]) -> Result<u64> {
        let mut count = 0;
        for key in keys {
            if self.delete(key).await? {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn keys(&self, pattern: Option<&str>) -> Result<Vec<String>> {
        let matcher = match pattern {
            Some(p) => Some(GlobMatcher::new(p)?),
            None => None,
        };

        Ok(self
            .data
            .iter()
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.key().clone())
            .filter(|key| matcher.as_ref().is_none_or(|m| m.matches(key)))
            .collect())
    }

    async fn clear(&self) -> Result<()> {
        self.data.clear();
        self.tag_index.clear();
        self.dep_index.clear();
        self.expiry.lock().clear();
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats> {
        let stats = self.stats.read();
        Ok(CacheStats {
            hits: stats.hits,
            misses: stats.misses,
            writes: stats.writes,
            deletes: stats.deletes,
            evictions: stats.evictions,
            size: self.data.len(),
            memory_bytes: self.memory_usage(),
        })
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.data.len())
    }

    fn as_taggable(&self) -> Option<&dyn TaggableStore> {
        Some(self)
    }

    fn as_pattern(&self) -> Option<&dyn PatternStore> {
        Some(self)
    }

    fn as_dependency(&self) -> Option<&dyn DependencyStore> {
        Some(self)
    }
}

#[async_trait]
impl TaggableStore for MemoryStore {
    async fn keys_by_tag(&self, tag: &str) -> Result<Vec<String>> {
        match self.tag_index.get(tag) {
            Some(keys) => Ok(keys.iter().cloned().collect()),
            None => Ok(Vec::new()),
        }
    }

    async fn invalidate_tag(&self, tag: &str) -> Result<u64> {
        match self.tag_index.remove(tag) {
            Some((_, keys)) => {
                let mut count = 0;
                for key in keys {
                    // The key may have been evicted since it was indexed
                    if self.remove_entry(&key) {
                        self.stats.write().deletes += 1;
                        count += 1;
                    }
                }
                Ok(count)
            }
            None => Ok(0),
        }
    }
}

#[async_trait]
impl PatternStore for MemoryStore {
    async fn invalidate_pattern(&self, pattern: &str) -> Result<u64> {
        let matcher = GlobMatcher::new(pattern)?;

        let matched: Vec<String> = self
            .data
            .iter()
            .filter(|entry| matcher.matches(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();

        let mut count = 0;
        for key in matched {
            if self.remove_entry(&key) {
                self.stats.write().deletes += 1;
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl DependencyStore for MemoryStore {
    async fn keys_by_dependency(&self, dependency: &str) -> Result<Vec<String>> {
        match self.dep_index.get(dependency) {
            Some(keys) => Ok(keys.iter().cloned().collect()),
            None => Ok(Vec::new()),
        }
    }

    async fn invalidate_dependency(&self, dependency: &str) -> Result<u64> {
        match self.dep_index.remove(dependency) {
            Some((_, keys)) => {
                let mut count = 0;
                for key in keys {
                    if self.remove_entry(&key) {
                        self.stats.write().deletes += 1;
                        count += 1;
                    }
                }
                Ok(count)
            }
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use strata_cache_core::CacheOpts;

    #[tokio::test]
    async fn test_basic_get_set() {
        let store = MemoryStore::with_defaults();

        let options = CacheOpts::new().ttl_secs(60).build();
        store.set("key1", b"value1".to_vec(), &options).await.unwrap();

        let result = store.get("key1").await.unwrap();
        assert!(result.is_some());
        assert_eq!(result.unwrap().value, b"value1".to_vec());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::with_defaults();
        let options = CacheOptions::default();

        store.set("key1", b"value1".to_vec(), &options).await.unwrap();
        assert!(store.exists("key1").await.unwrap());

        assert!(store.delete("key1").await.unwrap());
        assert!(!store.exists("key1").await.unwrap());
        assert!(!store.delete("key1").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let store = MemoryStore::with_defaults();
        let options = CacheOpts::new().ttl(Duration::from_millis(10)).build();

        store.set("key1", b"value1".to_vec(), &options).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(store.get("key1").await.unwrap().is_none());
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let store = MemoryStore::new(MemoryConfig::with_capacity(2));
        let options = CacheOptions::default();

        store.set("a", b"1".to_vec(), &options).await.unwrap();
        store.set("b", b"2".to_vec(), &options).await.unwrap();

        // Touch "a" so "b" becomes the least recently accessed
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.get("a").await.unwrap();

        store.set("c", b"3".to_vec(), &options).await.unwrap();

        assert!(store.exists("a").await.unwrap());
        assert!(!store.exists("b").await.unwrap());
        assert!(store.exists("c").await.unwrap());
    }

    #[tokio::test]
    async fn test_keys_with_pattern() {
        let store = MemoryStore::with_defaults();
        let options = CacheOptions::default();

        store.set("user:1", b"a".to_vec(), &options).await.unwrap();
        store.set("user:2", b"b".to_vec(), &options).await.unwrap();
        store.set("post:1", b"c".to_vec(), &options).await.unwrap();

        let mut keys = store.keys(Some("user:*")).await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["user:1".to_string(), "user:2".to_string()]);

        assert_eq!(store.keys(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_tag_invalidation_and_index_pruning() {
        let store = MemoryStore::with_defaults();

        let tagged = CacheOpts::new().tag("user").build();
        store.set("user:1", b"a".to_vec(), &tagged).await.unwrap();
        store.set("user:2", b"b".to_vec(), &tagged).await.unwrap();
        store
            .set("post:1", b"c".to_vec(), &CacheOpts::new().tag("post").build())
            .await
            .unwrap();

        assert_eq!(store.invalidate_tag("user").await.unwrap(), 2);
        assert!(!store.exists("user:1").await.unwrap());
        assert!(store.exists("post:1").await.unwrap());

        // Index bucket is gone entirely
        assert!(store.keys_by_tag("user").await.unwrap().is_empty());
        assert_eq!(store.invalidate_tag("user").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_overwrite_detaches_old_tags() {
        let store = MemoryStore::with_defaults();

        store
            .set("k", b"a".to_vec(), &CacheOpts::new().tag("old").build())
            .await
            .unwrap();
        store
            .set("k", b"b".to_vec(), &CacheOpts::new().tag("new").build())
            .await
            .unwrap();

        assert!(store.keys_by_tag("old").await.unwrap().is_empty());
        assert_eq!(store.keys_by_tag("new").await.unwrap(), vec!["k".to_string()]);
    }

    #[tokio::test]
    async fn test_dependency_index() {
        let store = MemoryStore::with_defaults();

        store
            .set(
                "order:1",
                b"a".to_vec(),
                &CacheOpts::new().depends_on(["customer:7"]).build(),
            )
            .await
            .unwrap();

        assert_eq!(
            store.keys_by_dependency("customer:7").await.unwrap(),
            vec!["order:1".to_string()]
        );
        assert_eq!(store.invalidate_dependency("customer:7").await.unwrap(), 1);
        assert!(!store.exists("order:1").await.unwrap());
        assert!(store.keys_by_dependency("customer:7").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pattern_invalidation() {
        let store = MemoryStore::with_defaults();
        let options = CacheOptions::default();

        store.set("user:1", b"a".to_vec(), &options).await.unwrap();
        store.set("user:2", b"b".to_vec(), &options).await.unwrap();
        store.set("post:1", b"c".to_vec(), &options).await.unwrap();

        assert_eq!(store.invalidate_pattern("user:*").await.unwrap(), 2);
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = MemoryStore::with_defaults();
        let options = CacheOpts::new().tag("t").build();

        store.set("key1", b"a".to_vec(), &options).await.unwrap();
        store.set("key2", b"b".to_vec(), &options).await.unwrap();
        store.clear().await.unwrap();

        assert_eq!(store.len().await.unwrap(), 0);
        assert!(store.keys_by_tag("t").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stats() {
        let store = MemoryStore::with_defaults();
        let options = CacheOptions::default();

        store.set("key1", b"value1".to_vec(), &options).await.unwrap();
        store.get("key1").await.unwrap();
        store.get("nonexistent").await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.size, 1);
    }

    #[tokio::test]
    async fn test_get_many_preserves_order() {
        let store = MemoryStore::with_defaults();
        let options = CacheOptions::default();

        store.set("key1", b"v1".to_vec(), &options).await.unwrap();
        store.set("key3", b"v3".to_vec(), &options).await.unwrap();

        let results = store.get_many(&["key1", "key2", "key3"]).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_some());
        assert!(results[1].is_none());
        assert!(results[2].is_some());
    }

    #[tokio::test]
    async fn test_capability_accessors() {
        let store = MemoryStore::with_defaults();
        assert!(store.as_taggable().is_some());
        assert!(store.as_pattern().is_some());
        assert!(store.as_dependency().is_some());
    }
}
