//! strata-cache-storage: Store backends and layered engine for strata-cache

pub mod layered;

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "redis")]
pub mod redis;

pub use layered::{
    BreakerConfig, BreakerSnapshot, CircuitBreaker, LayeredCache, LayeredCacheBuilder, Tier,
};

#[cfg(feature = "memory")]
pub use memory::{MemoryConfig, MemoryStore};

#[cfg(feature = "redis")]
pub use redis::{RedisConfig, RedisStore};
