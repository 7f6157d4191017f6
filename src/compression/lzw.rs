//! Handler for TIFF LZW compressed data
//!
//! Codes are packed most-significant bit first with the early code-width
//! switch every TIFF writer since revision 6.0 uses. Only decoding is supported.

use weezl::{decode::Decoder, BitOrder};

use crate::error::{RasterError, RasterResult};
use crate::tiff::constants::compression;
use super::handler::CompressionHandler;

/// LZW compression handler (compression code 5)
pub struct LzwHandler;

impl CompressionHandler for LzwHandler {
    fn decompress(&self, data: &[u8]) -> RasterResult<Vec<u8>> {
        let mut decoder = Decoder::with_tiff_size_switch(BitOrder::Msb, 8);
        decoder.decode(data)
            .map_err(|e| RasterError::Generic(format!("LZW decode failure: {}", e)))
    }

    fn compress(&self, _data: &[u8]) -> RasterResult<Vec<u8>> {
        Err(RasterError::UnsupportedCompression(compression::LZW))
    }

    fn name(&self) -> &'static str {
        "LZW"
    }

    fn code(&self) -> u16 {
        compression::LZW
    }
}
