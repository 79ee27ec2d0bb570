//! Compression support for cached values

use crate::CacheError;

/// Default zstd compression level
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Values smaller than this are stored uncompressed; the frame overhead
/// outweighs any savings below it.
pub const MIN_COMPRESSION_SIZE: usize = 256;

/// Trait for compression implementations
pub trait Compressor: Send + Sync + Clone + 'static {
    /// Name of the compressor (for debugging/metrics)
    fn name(&self) -> &str;

    /// Compress data
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CacheError>;

    /// Decompress data
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CacheError>;

    /// Whether a payload is worth compressing
    fn should_compress(&self, data: &[u8]) -> bool {
        data.len() >= MIN_COMPRESSION_SIZE
    }
}

/// No-op compressor (compression disabled)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCompressor;

impl Compressor for NoopCompressor {
    fn name(&self) -> &str {
        "none"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CacheError> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CacheError> {
        Ok(data.to_vec())
    }

    fn should_compress(&self, _data: &[u8]) -> bool {
        false
    }
}

/// Zstd compressor
#[cfg(feature = "compression")]
#[derive(Debug, Clone)]
pub struct ZstdCompressor {
    level: i32,
    min_size: usize,
}

#[cfg(feature = "compression")]
impl Default for ZstdCompressor {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }
}

#[cfg(feature = "compression")]
impl ZstdCompressor {
    /// Create a zstd compressor with the given level (clamped to 1-22)
    pub fn new(level: i32) -> Self {
        Self {
            level: level.clamp(1, 22),
            min_size: MIN_COMPRESSION_SIZE,
        }
    }

    /// Set the minimum payload size for compression
    pub fn with_min_size(mut self, size: usize) -> Self {
        self.min_size = size;
        self
    }

    /// Get the compression level
    pub fn level(&self) -> i32 {
        self.level
    }
}

#[cfg(feature = "compression")]
impl Compressor for ZstdCompressor {
    fn name(&self) -> &str {
        "zstd"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CacheError> {
        zstd::encode_all(data, self.level).map_err(|e| CacheError::Compression(e.to_string()))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CacheError> {
        zstd::decode_all(data).map_err(|e| CacheError::Decompression(e.to_string()))
    }

    fn should_compress(&self, data: &[u8]) -> bool {
        data.len() >= self.min_size
    }
}
