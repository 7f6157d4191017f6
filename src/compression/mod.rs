//! Compression handling for TIFF files
//!
//! One strategy per TIFF compression scheme, selected by tag value when
//! reading and by name when writing patches.

mod handler;
mod uncompressed;
mod deflate;
mod factory;
mod lzw;
mod packbits;
mod zstd;

pub use handler::CompressionHandler;
pub use uncompressed::UncompressedHandler;
pub use deflate::AdobeDeflateHandler;
pub use factory::CompressionFactory;
pub use lzw::LzwHandler;
pub use packbits::PackBitsHandler;
pub use zstd::ZstdHandler;
