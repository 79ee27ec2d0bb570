//! Store trait and optional invalidation capabilities

use async_trait::async_trait;

use crate::{CacheEntry, CacheError, CacheOptions, CacheStats};

/// Core trait for all cache store backends
///
/// The orchestration layer treats stores polymorphically through this
/// trait. A store that natively supports tag, pattern or dependency
/// invalidation additionally implements the matching capability trait and
/// returns itself from the corresponding `as_*` accessor; the accessors
/// default to `None`, which the invalidators treat as "no native support".
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Get a value from the store
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry<Vec<u8>>>, CacheError>;

    /// Set a value in the store
    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        options: &CacheOptions,
    ) -> Result<(), CacheError>;

    /// Delete a key from the store
    ///
    /// Returns `true` if the key existed and was deleted.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Check if a key exists in the store
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// Get multiple keys at once
    ///
    /// Returns a vector of results in the same order as the input keys.
    async fn get_many(
        &self,
        keys: &[&str],
    ) -> Result<Vec<Option<CacheEntry<Vec<u8>>>>, CacheError>;

    /// Set multiple entries at once, sharing one set of options
    async fn set_many(
        &self,
        entries: &[(&str, Vec<u8>)],
        options: &CacheOptions,
    ) -> Result<(), CacheError>;

    /// Delete multiple keys
    ///
    /// Returns the number of keys that were deleted.
    async fn delete_many(&self, keys: &[&str]) -> Result<u64, CacheError>;

    /// List keys, optionally filtered by a glob pattern
    async fn keys(&self, pattern: Option<&str>) -> Result<Vec<String>, CacheError>;

    /// Clear all entries from the store
    async fn clear(&self) -> Result<(), CacheError>;

    /// Get store statistics
    async fn stats(&self) -> Result<CacheStats, CacheError>;

    /// Get the number of entries in the store
    async fn len(&self) -> Result<usize, CacheError>;

    /// Check if the store is empty
    async fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len().await? == 0)
    }

    /// Release backend resources; further calls may fail
    async fn close(&self) -> Result<(), CacheError> {
        Ok(())
    }

    /// Native tag invalidation, if this store supports it
    fn as_taggable(&self) -> Option<&dyn TaggableStore> {
        None
    }

    /// Native pattern invalidation, if this store supports it
    fn as_pattern(&self) -> Option<&dyn PatternStore> {
        None
    }

    /// Native dependency invalidation, if this store supports it
    fn as_dependency(&self) -> Option<&dyn DependencyStore> {
        None
    }
}

/// Capability trait for stores with a native tag index
#[async_trait]
pub trait TaggableStore: Send + Sync {
    /// Get all keys carrying a tag
    async fn keys_by_tag(&self, tag: &str) -> Result<Vec<String>, CacheError>;

    /// Delete all entries carrying a tag
    ///
    /// Returns the number of entries deleted.
    async fn invalidate_tag(&self, tag: &str) -> Result<u64, CacheError>;
}

/// Capability trait for stores with native pattern invalidation
#[async_trait]
pub trait PatternStore: Send + Sync {
    /// Delete all entries whose key matches the glob pattern
    ///
    /// Returns the number of entries deleted.
    async fn invalidate_pattern(&self, pattern: &str) -> Result<u64, CacheError>;
}

/// Capability trait for stores with a native dependency index
#[async_trait]
pub trait DependencyStore: Send + Sync {
    /// Get all keys depending on an identifier
    async fn keys_by_dependency(&self, dependency: &str) -> Result<Vec<String>, CacheError>;

    /// Delete all entries depending on an identifier
    ///
    /// Returns the number of entries deleted.
    async fn invalidate_dependency(&self, dependency: &str) -> Result<u64, CacheError>;
}
