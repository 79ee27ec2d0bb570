//! strata-cache-core: Core traits and types for the strata-cache library
//!
//! This crate provides the foundational types and traits used throughout
//! the strata-cache ecosystem.

mod compression;
mod error;
mod pattern;
mod traits;
mod types;

pub use compression::{Compressor, NoopCompressor, DEFAULT_COMPRESSION_LEVEL, MIN_COMPRESSION_SIZE};
pub use error::{CacheError, Result};
pub use pattern::GlobMatcher;
pub use traits::*;
pub use types::*;

#[cfg(feature = "compression")]
pub use compression::ZstdCompressor;
