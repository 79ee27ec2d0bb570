//! Redis store backend
//!
//! Entries are stored as JSON-encoded [`CacheEntry`] wrappers so tags,
//! dependencies and the compression flag survive the round trip. Tag and
//! dependency membership lives in Redis sets; deletions remove the key
//! from its owning sets, and Redis drops a set once its last member is
//! gone, which keeps the index invariant (no bucket without live keys).

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use bb8_redis::RedisConnectionManager;
use parking_lot::RwLock as SyncRwLock;
use redis::{AsyncCommands, Value};
use std::sync::Arc;
use std::time::SystemTime;

use strata_cache_core::{
    CacheEntry, CacheError, CacheOptions, CacheStats, CacheStore, DependencyStore, PatternStore,
    Result, TaggableStore,
};

use super::config::RedisConfig;

/// Redis store implementation
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool<RedisConnectionManager>,
    config: RedisConfig,
    stats: Arc<SyncRwLock<CacheStats>>,
}

impl RedisStore {
    /// Create a new Redis store
    pub async fn new(config: RedisConfig) -> Result<Self> {
        let manager = RedisConnectionManager::new(config.url.as_str())
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        Ok(Self {
            pool,
            config,
            stats: Arc::new(SyncRwLock::new(CacheStats::default())),
        })
    }

    fn prefixed_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{prefix}:{key}"),
            None => key.to_string(),
        }
    }

    fn strip_prefix<'a>(&self, key: &'a str) -> &'a str {
        match &self.config.key_prefix {
            Some(prefix) => key
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix(':'))
                .unwrap_or(key),
            None => key,
        }
    }

    fn tag_key(&self, tag: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{prefix}:__tags__:{tag}"),
            None => format!("__tags__:{tag}"),
        }
    }

    fn dep_key(&self, dep: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{prefix}:__deps__:{dep}"),
            None => format!("__deps__:{dep}"),
        }
    }

    /// Translate a spec glob to a Redis MATCH pattern: only `*` and `?`
    /// stay active, square brackets and backslashes are escaped so Redis
    /// does not treat them as character classes.
    fn redis_glob(pattern: &str) -> String {
        let mut out = String::with_capacity(pattern.len() + 4);
        for ch in pattern.chars() {
            match ch {
                '[' | ']' | '\\' => {
                    out.push('\\');
                    out.push(ch);
                }
                ch => out.push(ch),
            }
        }
        out
    }

    async fn get_connection(&self) -> Result<PooledConnection<'_, RedisConnectionManager>> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))
    }

    fn encode_entry(value: Vec<u8>, options: &CacheOptions) -> Result<Vec<u8>> {
        let now = SystemTime::now();
        let size = value.len();
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
        serde_json::to_vec(&entry).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn decode_entry(data: &[u8]) -> Result<CacheEntry<Vec<u8>>> {
        serde_json::from_slice(data).map_err(|e| CacheError::Deserialization(e.to_string()))
    }

    /// Queue SET (with TTL) plus tag/dependency set membership for one entry
    fn queue_write(&self, pipe: &mut redis::Pipeline, key: &str, serialized: &[u8], options: &CacheOptions) {
        let prefixed = self.prefixed_key(key);
        if let Some(ttl) = options.ttl {
            pipe.set_ex(&prefixed, serialized, ttl.as_secs().max(1));
        } else {
            pipe.set(&prefixed, serialized);
        }
        for tag in &options.tags {
            pipe.sadd(self.tag_key(tag), key);
        }
        for dep in &options.dependencies {
            pipe.sadd(self.dep_key(dep), key);
        }
    }

    /// Delete the given (unprefixed) keys and detach them from their
    /// tag/dependency sets. Returns how many keys held an entry.
    async fn purge_keys(
        &self,
        conn: &mut PooledConnection<'_, RedisConnectionManager>,
        keys: &[String],
    ) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }

        let prefixed: Vec<String> = keys.iter().map(|k| self.prefixed_key(k)).collect();
        let raw: Vec<Option<Vec<u8>>> = if prefixed.len() == 1 {
            let one: Option<Vec<u8>> = conn
                .get(&prefixed[0])
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;
            vec![one]
        } else {
            conn.mget(&prefixed)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?
        };

        let mut pipe = redis::pipe();
        pipe.atomic();
        let mut count = 0u64;

        for ((key, prefixed_key), data) in keys.iter().zip(&prefixed).zip(raw) {
            let Some(data) = data else { continue };
            count += 1;
            pipe.del(prefixed_key);
            // A corrupt entry still gets deleted; it just cannot be
            // detached from sets it may belong to
            if let Ok(entry) = Self::decode_entry(&data) {
                for tag in &entry.tags {
                    pipe.srem(self.tag_key(tag), key);
                }
                for dep in &entry.dependencies {
                    pipe.srem(self.dep_key(dep), key);
                }
            }
        }

        if count > 0 {
            pipe.query_async::<Vec<Value>>(&mut **conn)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;
            self.stats.write().deletes += count;
        }
        Ok(count)
    }

    /// Cursored SCAN returning prefixed keys matching a MATCH pattern
    async fn scan_keys(
        &self,
        conn: &mut PooledConnection<'_, RedisConnectionManager>,
        match_pattern: &str,
    ) -> Result<Vec<String>> {
        let mut cursor = 0u64;
        let mut found = Vec::new();

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .cursor_arg(cursor)
                .arg("MATCH")
                .arg(match_pattern)
                .arg("COUNT")
                .arg(1000)
                .query_async(&mut **conn)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;

            found.extend(keys);
            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        Ok(found)
    }

    /// MATCH pattern covering this store's data keys (not the index sets)
    fn data_match_pattern(&self, pattern: Option<&str>) -> String {
        let glob = pattern.map(Self::redis_glob).unwrap_or_else(|| "*".to_string());
        match &self.config.key_prefix {
            Some(prefix) => format!("{prefix}:{glob}"),
            None => glob,
        }
    }

    fn is_index_key(&self, prefixed: &str) -> bool {
        let rest = self.strip_prefix(prefixed);
        rest.starts_with("__tags__:") || rest.starts_with("__deps__:")
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry<Vec<u8>>>> {
        let mut conn = self.get_connection().await?;
        let prefixed = self.prefixed_key(key);

        let bytes: Option<Vec<u8>> = conn
            .get(&prefixed)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        match bytes {
            Some(data) => {
                let entry = Self::decode_entry(&data)?;
                self.stats.write().hits += 1;
                Ok(Some(entry))
            }
            None => {
                self.stats.write().misses += 1;
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, options: &CacheOptions) -> Result<()> {
        let serialized = Self::encode_entry(value, options)?;
        let mut conn = self.get_connection().await?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        self.queue_write(&mut pipe, key, &serialized, options);

        pipe.query_async::<Vec<Value>>(&mut *conn)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        self.stats.write().writes += 1;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let count = self.purge_keys(&mut conn, &[key.to_string()]).await?;
        Ok(count > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let prefixed = self.prefixed_key(key);

        conn.exists(&prefixed)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<CacheEntry<Vec<u8>>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.get_connection().await?;

        let prefixed: Vec<String> = keys.iter().map(|k| self.prefixed_key(k)).collect();
        let raw: Vec<Option<Vec<u8>>> = if prefixed.len() == 1 {
            let one: Option<Vec<u8>> = conn
                .get(&prefixed[0])
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;
            vec![one]
        } else {
            conn.mget(&prefixed)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?
        };

        let mut results = Vec::with_capacity(raw.len());
        let mut hits = 0u64;
        let mut misses = 0u64;

        for data in raw {
            match data {
                Some(data) => {
                    results.push(Some(Self::decode_entry(&data)?));
                    hits += 1;
                }
                None => {
                    results.push(None);
                    misses += 1;
                }
            }
        }

        let mut stats = self.stats.write();
        stats.hits += hits;
        stats.misses += misses;
        drop(stats);

        Ok(results)
    }

    async fn set_many(&self, entries: &[(&str, Vec<u8>)], options: &CacheOptions) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut conn = self.get_connection().await?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, value) in entries {
            let serialized = Self::encode_entry(value.clone(), options)?;
            self.queue_write(&mut pipe, key, &serialized, options);
        }

        pipe.query_async::<Vec<Value>>(&mut *conn)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        self.stats.write().writes += entries.len() as u64;
        Ok(())
    }

    async fn delete_many(&self, keys: &[&str]) -> Result<u64> {
        let mut conn = self.get_connection().await?;
        let owned: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        self.purge_keys(&mut conn, &owned).await
    }

    async fn keys(&self, pattern: Option<&str>) -> Result<Vec<String>> {
        let mut conn = self.get_connection().await?;
        let match_pattern = self.data_match_pattern(pattern);

        let found = self.scan_keys(&mut conn, &match_pattern).await?;
        Ok(found
            .iter()
            .filter(|k| !self.is_index_key(k))
            .map(|k| self.strip_prefix(k).to_string())
            .collect())
    }

    async fn clear(&self) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let match_pattern = self.data_match_pattern(None);

        let mut cursor = 0u64;
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .cursor_arg(cursor)
                .arg("MATCH")
                .arg(&match_pattern)
                .arg("COUNT")
                .arg(1000)
                .query_async(&mut *conn)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;

            if !keys.is_empty() {
                let _: usize = conn
                    .unlink(&keys)
                    .await
                    .map_err(|e| CacheError::Backend(e.to_string()))?;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats> {
        let mut stats = self.stats.read().clone();
        stats.size = self.len().await?;
        Ok(stats)
    }

    async fn len(&self) -> Result<usize> {
        let mut conn = self.get_connection().await?;

        if self.config.key_prefix.is_some() {
            let match_pattern = self.data_match_pattern(None);
            let found = self.scan_keys(&mut conn, &match_pattern).await?;
            Ok(found.iter().filter(|k| !self.is_index_key(k)).count())
        } else {
            let size: usize = redis::cmd("DBSIZE")
                .query_async(&mut *conn)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;
            Ok(size)
        }
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
impl TaggableStore for RedisStore {
    async fn keys_by_tag(&self, tag: &str) -> Result<Vec<String>> {
        let mut conn = self.get_connection().await?;

        conn.smembers(self.tag_key(tag))
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn invalidate_tag(&self, tag: &str) -> Result<u64> {
        let mut conn = self.get_connection().await?;

        let keys: Vec<String> = conn
            .smembers(self.tag_key(tag))
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        if keys.is_empty() {
            return Ok(0);
        }

        let count = self.purge_keys(&mut conn, &keys).await?;

        // Members that vanished without cleanup (e.g. TTL expiry) may
        // leave the set behind; drop it explicitly
        let _: i64 = conn
            .del(self.tag_key(tag))
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        Ok(count)
    }
}

#[async_trait]
impl PatternStore for RedisStore {
    async fn invalidate_pattern(&self, pattern: &str) -> Result<u64> {
        let mut conn = self.get_connection().await?;
        let match_pattern = self.data_match_pattern(Some(pattern));

        let found = self.scan_keys(&mut conn, &match_pattern).await?;
        let keys: Vec<String> = found
            .iter()
            .filter(|k| !self.is_index_key(k))
            .map(|k| self.strip_prefix(k).to_string())
            .collect();

        self.purge_keys(&mut conn, &keys).await
    }
}

#[async_trait]
impl DependencyStore for RedisStore {
    async fn keys_by_dependency(&self, dependency: &str) -> Result<Vec<String>> {
        let mut conn = self.get_connection().await?;

        conn.smembers(self.dep_key(dependency))
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn invalidate_dependency(&self, dependency: &str) -> Result<u64> {
        let mut conn = self.get_connection().await?;

        let keys: Vec<String> = conn
            .smembers(self.dep_key(dependency))
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        if keys.is_empty() {
            return Ok(0);
        }

        let count = self.purge_keys(&mut conn, &keys).await?;

        let _: i64 = conn
            .del(self.dep_key(dependency))
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        Ok(count)
    }
}
