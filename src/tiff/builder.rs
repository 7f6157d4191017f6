//! TIFF file construction utilities
//!
//! Collects the tags and pixel data of a single-image TIFF. Tag values are
//! stored in little-endian order: values of up to four bytes go into the IFD
//! entry itself, larger ones become external data placed after the IFD.

use std::collections::BTreeMap;
use std::path::Path;
use log::trace;

use crate::error::RasterResult;
use crate::raster::PassthroughTag;
use crate::tiff::constants::{field_types, tags};
use crate::tiff::ifd::{IFD, IFDEntry};
use crate::tiff::writer::TiffWriter;

/// Builder for creating single-strip TIFF files
pub struct TiffBuilder {
    pub ifd: IFD,
    external_data: BTreeMap<u16, Vec<u8>>,
    image_data: Vec<u8>,
}

impl Default for TiffBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TiffBuilder {
    pub fn new() -> Self {
        TiffBuilder {
            ifd: IFD::new(0, 0),
            external_data: BTreeMap::new(),
            image_data: Vec::new(),
        }
    }

    /// Adds a tag from its little-endian value bytes, replacing an earlier one
    pub fn add_tag(&mut self, tag: u16, field_type: u16, count: u64, data: Vec<u8>) {
        let mut entry = IFDEntry::new(tag, field_type, count, 0);

        if data.len() <= 4 {
            entry.inline_bytes = [0u8; 8];
            entry.inline_bytes[..data.len()].copy_from_slice(&data);
            let mut value = [0u8; 8];
            value[..data.len()].copy_from_slice(&data);
            entry.value_offset = u64::from_le_bytes(value);
            self.external_data.remove(&tag);
        } else {
            trace!("Tag {} ({}) stored externally: {} bytes", tag, tags::name(tag), data.len());
            self.external_data.insert(tag, data);
        }

        self.ifd.add_entry(entry);
    }

    pub fn add_short(&mut self, tag: u16, value: u16) {
        self.add_shorts(tag, &[value]);
    }

    pub fn add_shorts(&mut self, tag: u16, values: &[u16]) {
        let data = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.add_tag(tag, field_types::SHORT, values.len() as u64, data);
    }

    pub fn add_long(&mut self, tag: u16, value: u32) {
        self.add_tag(tag, field_types::LONG, 1, value.to_le_bytes().to_vec());
    }

    pub fn add_doubles(&mut self, tag: u16, values: &[f64]) {
        let data = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.add_tag(tag, field_types::DOUBLE, values.len() as u64, data);
    }

    /// Adds a NUL-terminated ASCII tag
    pub fn add_ascii(&mut self, tag: u16, text: &str) {
        let mut data = text.as_bytes().to_vec();
        data.push(0);
        let count = data.len() as u64;
        self.add_tag(tag, field_types::ASCII, count, data);
    }

    /// Copies a tag read from another file
    pub fn add_passthrough(&mut self, tag: &PassthroughTag) {
        self.add_tag(tag.tag, tag.field_type, tag.count, tag.data.clone());
    }

    /// Stores all pixel data in one strip
    ///
    /// StripOffsets is resolved when the file is written.
    pub fn set_single_strip(&mut self, rows: u32, strip_data: Vec<u8>) {
        self.add_long(tags::ROWS_PER_STRIP, rows);
        self.add_long(tags::STRIP_BYTE_COUNTS, strip_data.len() as u32);
        self.add_long(tags::STRIP_OFFSETS, 0);
        self.image_data = strip_data;
    }

    pub fn has_tag(&self, tag: u16) -> bool {
        self.ifd.has_tag(tag)
    }

    /// Write the TIFF file to disk
    pub fn write(&self, output_path: impl AsRef<Path>) -> RasterResult<()> {
        TiffWriter::write(&self.ifd, &self.external_data, &self.image_data, output_path.as_ref())
    }

    /// Encodes the TIFF file into memory
    pub fn to_bytes(&self) -> RasterResult<Vec<u8>> {
        TiffWriter::encode(&self.ifd, &self.external_data, &self.image_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_values_stay_inline() {
        let mut builder = TiffBuilder::new();
        builder.add_shorts(tags::BITS_PER_SAMPLE, &[8, 16]);
        builder.add_doubles(tags::MODEL_PIXEL_SCALE_TAG, &[1.0, 1.0, 0.0]);

        let bits = builder.ifd.get_entry(tags::BITS_PER_SAMPLE).unwrap();
        assert_eq!(bits.inline_bytes[..4], [8, 0, 16, 0]);
        assert!(!builder.external_data.contains_key(&tags::BITS_PER_SAMPLE));
        assert_eq!(builder.external_data[&tags::MODEL_PIXEL_SCALE_TAG].len(), 24);
    }

    #[test]
    fn test_replacing_external_with_inline() {
        let mut builder = TiffBuilder::new();
        builder.add_ascii(tags::GDAL_NODATA, "-9999");
        assert!(builder.external_data.contains_key(&tags::GDAL_NODATA));

        builder.add_ascii(tags::GDAL_NODATA, "0");
        assert!(!builder.external_data.contains_key(&tags::GDAL_NODATA));
        assert_eq!(builder.ifd.get_entry(tags::GDAL_NODATA).unwrap().count, 2);
    }
}
