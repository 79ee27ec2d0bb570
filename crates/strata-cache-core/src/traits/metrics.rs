//! Instrumentation hooks for cache observability
//!
//! Every public manager call is wrapped with started/succeeded/failed
//! hooks. Aggregation and reporting live behind this trait; the cache
//! itself only emits.

use std::time::Duration;

use tracing::{debug, trace};

use crate::CacheError;

/// Cache operation for instrumentation labeling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOperation {
    Get,
    GetMany,
    Set,
    SetMany,
    Delete,
    Exists,
    Clear,
    Close,
    InvalidateTag,
    InvalidatePattern,
    InvalidateDependency,
    Serialize,
    Deserialize,
    Compress,
    Decompress,
}

impl CacheOperation {
    /// Get operation as string label
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOperation::Get => "get",
            CacheOperation::GetMany => "get_many",
            CacheOperation::Set => "set",
            CacheOperation::SetMany => "set_many",
            CacheOperation::Delete => "delete",
            CacheOperation::Exists => "exists",
            CacheOperation::Clear => "clear",
            CacheOperation::Close => "close",
            CacheOperation::InvalidateTag => "invalidate_tag",
            CacheOperation::InvalidatePattern => "invalidate_pattern",
            CacheOperation::InvalidateDependency => "invalidate_dependency",
            CacheOperation::Serialize => "serialize",
            CacheOperation::Deserialize => "deserialize",
            CacheOperation::Compress => "compress",
            CacheOperation::Decompress => "decompress",
        }
    }
}

/// Which invalidation subsystem produced a count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidationKind {
    Tag,
    Pattern,
    Dependency,
}

impl InvalidationKind {
    /// Get kind as string label
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidationKind::Tag => "tag",
            InvalidationKind::Pattern => "pattern",
            InvalidationKind::Dependency => "dependency",
        }
    }
}

/// Trait for cache metrics/observability
///
/// Implement this to integrate with your metrics system (Prometheus,
/// StatsD, etc.).
pub trait CacheMetrics: Send + Sync + 'static {
    /// An operation is about to run
    fn operation_started(&self, operation: CacheOperation);

    /// An operation completed successfully
    fn operation_succeeded(&self, operation: CacheOperation, duration: Duration);

    /// An operation failed
    fn operation_failed(&self, operation: CacheOperation, duration: Duration, error: &CacheError);

    /// Record a cache hit at a named tier
    fn record_hit(&self, key: &str, tier: &str);

    /// Record a cache miss across all tiers
    fn record_miss(&self, key: &str);

    /// Record a completed bulk invalidation
    fn record_invalidation(&self, kind: InvalidationKind, count: u64);
}

/// No-op metrics implementation (default)
///
/// Zero overhead when metrics are not needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl CacheMetrics for NoopMetrics {
    #[inline]
    fn operation_started(&self, _operation: CacheOperation) {}

    #[inline]
    fn operation_succeeded(&self, _operation: CacheOperation, _duration: Duration) {}

    #[inline]
    fn operation_failed(
        &self,
        _operation: CacheOperation,
        _duration: Duration,
        _error: &CacheError,
    ) {
    }

    #[inline]
    fn record_hit(&self, _key: &str, _tier: &str) {}

    #[inline]
    fn record_miss(&self, _key: &str) {}

    #[inline]
    fn record_invalidation(&self, _kind: InvalidationKind, _count: u64) {}
}

/// Metrics adapter that logs events via `tracing`
#[derive(Debug, Clone, Default)]
pub struct TracingMetrics {
    service_name: Option<String>,
}

impl TracingMetrics {
    /// Create new tracing metrics adapter
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with service name prefix
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }
}

impl CacheMetrics for TracingMetrics {
    fn operation_started(&self, operation: CacheOperation) {
        trace!(
            target: "strata_cache",
            event = "started",
            operation = operation.as_str(),
            service = ?self.service_name,
            "cache operation started"
        );
    }

    fn operation_succeeded(&self, operation: CacheOperation, duration: Duration) {
        trace!(
            target: "strata_cache",
            event = "succeeded",
            operation = operation.as_str(),
            duration_us = duration.as_micros() as u64,
            service = ?self.service_name,
            "cache operation succeeded"
        );
    }

    fn operation_failed(&self, operation: CacheOperation, duration: Duration, error: &CacheError) {
        debug!(
            target: "strata_cache",
            event = "failed",
            operation = operation.as_str(),
            duration_us = duration.as_micros() as u64,
            error = %error,
            service = ?self.service_name,
            "cache operation failed"
        );
    }

    fn record_hit(&self, key: &str, tier: &str) {
        debug!(
            target: "strata_cache",
            event = "hit",
            key = %key,
            tier = %tier,
            service = ?self.service_name,
            "cache hit"
        );
    }

    fn record_miss(&self, key: &str) {
        debug!(
            target: "strata_cache",
            event = "miss",
            key = %key,
            service = ?self.service_name,
            "cache miss"
        );
    }

    fn record_invalidation(&self, kind: InvalidationKind, count: u64) {
        debug!(
            target: "strata_cache",
            event = "invalidation",
            kind = kind.as_str(),
            count,
            service = ?self.service_name,
            "cache invalidation"
        );
    }
}

/// Metrics adapter using the `metrics` crate
///
/// Integrates with Prometheus, StatsD, and other exporters via the
/// `metrics` ecosystem.
///
/// # Example
/// ```ignore
/// use strata_cache_core::MetricsCrateAdapter;
///
/// // Set up a metrics recorder (e.g., prometheus_exporter)
/// // metrics::set_global_recorder(recorder);
///
/// let metrics = MetricsCrateAdapter::new("strata_cache");
/// // Emits: strata_cache_operations_total, strata_cache_hits_total, etc.
/// ```
#[cfg(feature = "metrics")]
#[derive(Debug, Clone)]
pub struct MetricsCrateAdapter {
    prefix: String,
}

#[cfg(feature = "metrics")]
impl MetricsCrateAdapter {
    /// Create a new adapter with the given metric name prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn metric_name(&self, name: &str) -> String {
        format!("{}_{}", self.prefix, name)
    }
}

#[cfg(feature = "metrics")]
impl CacheMetrics for MetricsCrateAdapter {
    fn operation_started(&self, operation: CacheOperation) {
        metrics::counter!(
            self.metric_name("operations_total"),
            "operation" => operation.as_str()
        )
        .increment(1);
    }

    fn operation_succeeded(&self, operation: CacheOperation, duration: Duration) {
        metrics::histogram!(
            self.metric_name("operation_duration_seconds"),
            "operation" => operation.as_str(),
            "status" => "ok"
        )
        .record(duration.as_secs_f64());
    }

    fn operation_failed(&self, operation: CacheOperation, duration: Duration, _error: &CacheError) {
        metrics::counter!(
            self.metric_name("operation_failures_total"),
            "operation" => operation.as_str()
        )
        .increment(1);
        metrics::histogram!(
            self.metric_name("operation_duration_seconds"),
            "operation" => operation.as_str(),
            "status" => "error"
        )
        .record(duration.as_secs_f64());
    }

    fn record_hit(&self, _key: &str, tier: &str) {
        metrics::counter!(
            self.metric_name("hits_total"),
            "tier" => tier.to_string()
        )
        .increment(1);
    }

    fn record_miss(&self, _key: &str) {
        metrics::counter!(self.metric_name("misses_total")).increment(1);
    }

    fn record_invalidation(&self, kind: InvalidationKind, count: u64) {
        metrics::counter!(
            self.metric_name("invalidated_total"),
            "kind" => kind.as_str()
        )
        .increment(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_as_str() {
        assert_eq!(CacheOperation::Get.as_str(), "get");
        assert_eq!(CacheOperation::InvalidateTag.as_str(), "invalidate_tag");
    }

    #[test]
    fn test_invalidation_kind_as_str() {
        assert_eq!(InvalidationKind::Tag.as_str(), "tag");
        assert_eq!(InvalidationKind::Dependency.as_str(), "dependency");
    }

    #[test]
    fn test_noop_metrics() {
        let metrics = NoopMetrics;
        // Just verify these don't panic
        metrics.operation_started(CacheOperation::Get);
        metrics.operation_succeeded(CacheOperation::Get, Duration::from_millis(1));
        metrics.operation_failed(
            CacheOperation::Set,
            Duration::from_millis(1),
            &CacheError::Timeout,
        );
        metrics.record_hit("key", "memory");
        metrics.record_miss("key");
    }
}
