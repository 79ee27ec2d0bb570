//! Cache options and builders

use std::time::Duration;

use crate::CacheEntry;

/// Configuration options for a cache entry
#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    /// Time-to-live
    pub ttl: Option<Duration>,
    /// Tags for bulk invalidation
    pub tags: Vec<String>,
    /// Dependency identifiers for cascading invalidation
    pub dependencies: Vec<String>,
    /// Store the value compressed
    pub compress: bool,
}

impl CacheOptions {
    /// Reconstruct options from an existing entry, for promotion writes
    /// that replicate the entry into faster tiers.
    pub fn for_promotion(entry: &CacheEntry<Vec<u8>>) -> Self {
        Self {
            ttl: entry.ttl,
            tags: entry.tags.clone(),
            dependencies: entry.dependencies.clone(),
            compress: entry.compressed,
        }
    }
}

/// Builder for CacheOptions with fluent API
#[derive(Debug, Clone, Default)]
pub struct CacheOpts(CacheOptions);

impl CacheOpts {
    /// Create new options builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set TTL
    pub fn ttl(mut self, duration: Duration) -> Self {
        self.0.ttl = Some(duration);
        self
    }

    /// Set TTL in seconds
    pub fn ttl_secs(self, seconds: u64) -> Self {
        self.ttl(Duration::from_secs(seconds))
    }

    /// Set TTL in minutes
    pub fn ttl_mins(self, minutes: u64) -> Self {
        self.ttl(Duration::from_secs(minutes * 60))
    }

    /// Add multiple tags
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Add a single tag
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.0.tags.push(tag.into());
        self
    }

    /// Add dependency identifiers
    pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .dependencies
            .extend(dependencies.into_iter().map(Into::into));
        self
    }

    /// Store the value compressed
    pub fn compress(mut self) -> Self {
        self.0.compress = true;
        self
    }

    /// Build the options
    pub fn build(self) -> CacheOptions {
        self.0
    }
}

impl From<CacheOpts> for CacheOptions {
    fn from(opts: CacheOpts) -> Self {
        opts.0
    }
}

impl From<Duration> for CacheOptions {
    fn from(ttl: Duration) -> Self {
        CacheOptions {
            ttl: Some(ttl),
            ..Default::default()
        }
    }
}

/// Options for bulk invalidation calls
///
/// `background` dispatches the invalidation without waiting; the call
/// returns 0 immediately and completion is observable only through logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvalidationOptions {
    /// Recursively invalidate co-occurring dependencies
    pub cascade: bool,
    /// Dispatch without waiting; the caller receives 0
    pub background: bool,
}

impl InvalidationOptions {
    /// Create default options (synchronous, no cascade)
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable cascading invalidation
    pub fn cascade(mut self) -> Self {
        self.cascade = true;
        self
    }

    /// Dispatch in the background
    pub fn background(mut self) -> Self {
        self.background = true;
        self
    }
}
