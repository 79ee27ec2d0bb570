//! Cache entry type

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// A cached entry with full metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The cached value
    pub value: T,
    /// When the entry was created
    pub created_at: SystemTime,
    /// When the entry was last accessed
    pub last_accessed: SystemTime,
    /// Number of times accessed
    pub access_count: u64,
    /// Time-to-live
    pub ttl: Option<Duration>,
    /// Tags for bulk invalidation
    pub tags: Vec<String>,
    /// Dependency identifiers for cascading invalidation
    pub dependencies: Vec<String>,
    /// Whether the stored bytes are compressed
    pub compressed: bool,
    /// Size in bytes
    pub size: usize,
}

impl<T> CacheEntry<T> {
    /// Create a new cache entry
    pub fn new(value: T, size: usize) -> Self {
        let now = SystemTime::now();
        Self {
            value,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            ttl: None,
            tags: Vec::new(),
            dependencies: Vec::new(),
            compressed: false,
            size,
        }
    }

    /// Create entry with TTL
    pub fn with_ttl(value: T, size: usize, ttl: Duration) -> Self {
        let mut entry = Self::new(value, size);
        entry.ttl = Some(ttl);
        entry
    }

    /// Check if the entry has expired
    pub fn is_expired(&self) -> bool {
        if let Some(ttl) = self.ttl {
            if let Ok(elapsed) = self.created_at.elapsed() {
                return elapsed > ttl;
            }
        }
        false
    }

    /// Get remaining TTL
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.ttl.and_then(|ttl| {
            self.created_at
                .elapsed()
                .ok()
                .and_then(|elapsed| ttl.checked_sub(elapsed))
        })
    }

    /// Get age of the entry
    pub fn age(&self) -> Duration {
        self.created_at.elapsed().unwrap_or_default()
    }

    /// Replace the value, keeping all metadata
    pub fn map<U, F>(self, f: F) -> CacheEntry<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheEntry {
            value: f(self.value),
            created_at: self.created_at,
            last_accessed: self.last_accessed,
            access_count: self.access_count,
            ttl: self.ttl,
            tags: self.tags,
            dependencies: self.dependencies,
            compressed: self.compressed,
            size: self.size,
        }
    }
}
