//! strata-cache: Multi-tier cache orchestration for Rust
//!
//! # Features
//!
//! - **Layered tiers** (in-process LRU + networked stores) with
//!   read-through promotion and write fan-out
//! - **Tag, pattern and dependency invalidation**, including cycle-safe
//!   cascading across the dependency graph
//! - **Per-tier circuit breakers** isolating backend failures
//! - **Pluggable serialization** (JSON, MessagePack, Bincode) and
//!   compression
//! - **Metrics hooks** for timing and hit/miss instrumentation
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use strata_cache::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let layered = LayeredCache::builder()
//!         .tier(Tier::new("memory", 0, MemoryStore::with_defaults()))
//!         .build();
//!     let cache = CacheManager::new(layered);
//!
//!     cache.set("key", &42i32, CacheOpts::new().ttl_secs(60)).await?;
//!
//!     match cache.get::<i32>("key").await? {
//!         CacheResult::Hit(entry) => println!("Got: {}", entry.value),
//!         CacheResult::Miss => println!("Cache miss"),
//!     }
//!
//!     Ok(())
//! }
//! ```

mod invalidate;
mod manager;

// Re-export core
pub use strata_cache_core::*;

// Re-export the layered engine and storage backends
pub use strata_cache_storage::{
    BreakerConfig, BreakerSnapshot, CircuitBreaker, LayeredCache, LayeredCacheBuilder, Tier,
};

#[cfg(feature = "memory")]
pub use strata_cache_storage::{MemoryConfig, MemoryStore};

#[cfg(feature = "redis")]
pub use strata_cache_storage::{RedisConfig, RedisStore};

// Export invalidators and manager
pub use invalidate::{DependencyInvalidator, PatternInvalidator, TagInvalidator};
pub use manager::{CacheManager, CacheManagerConfig};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BreakerConfig, CacheError, CacheKey, CacheManager, CacheManagerConfig, CacheOpts,
        CacheResult, CacheStore, InvalidationOptions, LayeredCache, Result, Serializer, Tier,
    };

    #[cfg(feature = "json")]
    pub use crate::JsonSerializer;

    #[cfg(feature = "memory")]
    pub use crate::{MemoryConfig, MemoryStore};

    #[cfg(feature = "redis")]
    pub use crate::{RedisConfig, RedisStore};

    #[cfg(feature = "msgpack")]
    pub use crate::MsgPackSerializer;

    #[cfg(feature = "bincode")]
    pub use crate::BincodeSerializer;
}
