//! Error types for cache operations

use thiserror::Error;

/// Main error type for all cache operations
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Caller supplied an invalid key, tag, pattern or dependency
    #[error("validation error: {0}")]
    Validation(String),

    /// Serialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Compression failed
    #[error("compression error: {0}")]
    Compression(String),

    /// Decompression failed
    #[error("decompression error: {0}")]
    Decompression(String),

    /// Backend connection failed
    #[error("connection error: {0}")]
    Connection(String),

    /// Backend operation failed
    #[error("backend error: {0}")]
    Backend(String),

    /// Operation timed out
    #[error("operation timed out")]
    Timeout,

    /// A store's circuit breaker is open; the call was never attempted
    #[error("circuit open for store: {store}")]
    CircuitOpen {
        /// Name of the store whose breaker rejected the call
        store: String,
    },

    /// Every store in the chain failed a fan-out write
    #[error("all stores failed: {}", format_failures(.failures))]
    AllStoresFailed {
        /// Per-store (name, error message) pairs
        failures: Vec<(String, String)>,
    },

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

fn format_failures(failures: &[(String, String)]) -> String {
    failures
        .iter()
        .map(|(store, err)| format!("{store}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl CacheError {
    /// Whether this error indicates an infrastructure failure that should
    /// count against a store's circuit breaker. Decode errors are the
    /// payload's fault, not the store's.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            CacheError::Connection(_)
                | CacheError::Backend(_)
                | CacheError::Timeout
                | CacheError::Internal(_)
        )
    }
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
