//! TIFF file format handling
//!
//! Reading of TIFF and BigTIFF structure, pixel decoding, GeoTIFF
//! georeferencing, and writing of single-strip GeoTIFF patches.

pub mod builder;
pub(crate) mod constants;
pub mod decoder;
pub mod geo_keys;
pub mod ifd;
pub mod reader;
mod tests;
pub(crate) mod types;
pub mod writer;

pub use builder::TiffBuilder;
pub use decoder::{ChunkDecoder, ImageLayout};
pub use geo_keys::{GeoKeyEntry, GeoKeyParser, Georeference};
pub use ifd::{IFD, IFDEntry};
pub use reader::TiffReader;
pub use types::TIFF;
pub use writer::TiffWriter;
