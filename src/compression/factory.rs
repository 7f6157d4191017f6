//! Factory for creating compression handlers

use crate::error::{RasterError, RasterResult};
use crate::tiff::constants::compression;
use super::handler::CompressionHandler;
use super::uncompressed::UncompressedHandler;
use super::deflate::AdobeDeflateHandler;
use super::lzw::LzwHandler;
use super::packbits::PackBitsHandler;
use super::zstd::ZstdHandler;

/// Factory for creating compression handlers
pub struct CompressionFactory;

impl CompressionFactory {
    /// Create a handler for the value of a TIFF Compression tag
    pub fn create_handler(code: u16) -> RasterResult<Box<dyn CompressionHandler>> {
        match code {
            compression::NONE => Ok(Box::new(UncompressedHandler)),
            compression::LZW => Ok(Box::new(LzwHandler)),
            compression::DEFLATE | compression::DEFLATE_OLD => Ok(Box::new(AdobeDeflateHandler)),
            compression::ZSTD => Ok(Box::new(ZstdHandler::new())),
            compression::PACKBITS => Ok(Box::new(PackBitsHandler)),
            _ => Err(RasterError::UnsupportedCompression(code))
        }
    }

    /// Get a handler able to write patches, by configuration name
    pub fn get_handler_by_name(name: &str) -> RasterResult<Box<dyn CompressionHandler>> {
        match name.trim().to_lowercase().as_str() {
            "uncompressed" | "none" => Ok(Box::new(UncompressedHandler)),
            "deflate" | "zip" | "adobe deflate" => Ok(Box::new(AdobeDeflateHandler)),
            "zstd" => Ok(Box::new(ZstdHandler::new())),
            "packbits" => Ok(Box::new(PackBitsHandler)),
            _ => Err(RasterError::config(format!("Unknown or read-only compression type: {}", name)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handlers_by_code() {
        for code in [1u16, 5, 8, 14, 32773, 32946] {
            assert!(CompressionFactory::create_handler(code).is_ok(), "code {}", code);
        }
        assert!(matches!(
            CompressionFactory::create_handler(7),
            Err(RasterError::UnsupportedCompression(7))
        ));
    }

    #[test]
    fn test_handlers_by_name() {
        assert_eq!(CompressionFactory::get_handler_by_name("Deflate").unwrap().code(), 8);
        assert_eq!(CompressionFactory::get_handler_by_name("none").unwrap().code(), 1);
        assert!(CompressionFactory::get_handler_by_name("lzw").is_err());
    }
}
