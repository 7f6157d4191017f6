//! Handler for ZSTD compressed data

use crate::error::{RasterError, RasterResult};
use crate::tiff::constants::compression;
use super::handler::CompressionHandler;
use log::{debug, warn};

/// ZSTD compression handler (compression code 14)
pub struct ZstdHandler {
    /// Compression level (1-22, default 3)
    compression_level: i32,
}

impl ZstdHandler {
    pub fn new() -> Self {
        ZstdHandler {
            compression_level: 3
        }
    }

    /// Create a new ZSTD handler with specified compression level
    pub fn with_level(level: i32) -> Self {
        ZstdHandler {
            compression_level: level.clamp(1, 22)
        }
    }
}

impl Default for ZstdHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionHandler for ZstdHandler {
    fn decompress(&self, data: &[u8]) -> RasterResult<Vec<u8>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }

        zstd::decode_all(data).map_err(|e| {
            warn!("ZSTD decompression error: {}", e);
            RasterError::Generic(format!("ZSTD decompression error: {}", e))
        })
    }

    fn compress(&self, data: &[u8]) -> RasterResult<Vec<u8>> {
        debug!("ZSTD compressing {} bytes with level {}", data.len(), self.compression_level);
        if data.is_empty() {
            return Ok(Vec::new());
        }

        zstd::encode_all(data, self.compression_level)
            .map_err(|e| RasterError::Generic(format!("ZSTD compression error: {}", e)))
    }

    fn name(&self) -> &'static str {
        "ZSTD"
    }

    fn code(&self) -> u16 {
        compression::ZSTD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zstd_levels_decode_identically() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i / 100) as u8).collect();
        for handler in [ZstdHandler::new(), ZstdHandler::with_level(40)] {
            let compressed = handler.compress(&data).unwrap();
            assert_eq!(handler.decompress(&compressed).unwrap(), data);
        }
        assert_eq!(ZstdHandler::with_level(40).compression_level, 22);
    }
}
