//! Layered engine: ordered tier chain with per-tier failure isolation

mod circuit_breaker;
mod strategy;
mod tier;

pub use circuit_breaker::{BreakerConfig, BreakerSnapshot, CircuitBreaker};
pub use strategy::{LayeredCache, LayeredCacheBuilder};
pub use tier::Tier;
