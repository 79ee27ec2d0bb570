//! Core traits for cache operations

mod key;
mod metrics;
mod serializer;
mod store;

pub use key::{CacheKey, CompositeKey};
pub use metrics::{
    CacheMetrics, CacheOperation, InvalidationKind, NoopMetrics, TracingMetrics,
};
pub use serializer::Serializer;
pub use store::{CacheStore, DependencyStore, PatternStore, TaggableStore};

#[cfg(feature = "json")]
pub use serializer::JsonSerializer;

#[cfg(feature = "msgpack")]
pub use serializer::MsgPackSerializer;

#[cfg(feature = "bincode")]
pub use serializer::BincodeSerializer;

#[cfg(feature = "metrics")]
pub use metrics::MetricsCrateAdapter;
