//! TIFF writing
//!
//! Lays a single IFD out as a little-endian classic TIFF: header, IFD,
//! external tag data, then image data. Every block starts on a 4-byte
//! boundary and all offsets are computed before anything is written.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use log::debug;

use crate::error::{RasterError, RasterResult};
use crate::tiff::constants::{header, tags};
use crate::tiff::ifd::{IFD, IFDEntry};

const HEADER_SIZE: u64 = 8;

/// Handles writing TIFF files to disk
pub struct TiffWriter;

impl TiffWriter {
    /// Write a complete TIFF file to disk
    pub fn write(
        ifd: &IFD,
        external_data: &BTreeMap<u16, Vec<u8>>,
        image_data: &[u8],
        output_path: &Path,
    ) -> RasterResult<()> {
        debug!("Writing TIFF to {}", output_path.display());

        let file = File::create(output_path).map_err(|e| RasterError::io(output_path, "create", e))?;
        let mut writer = BufWriter::with_capacity(1024 * 1024, file);
        Self::write_to(&mut writer, ifd, external_data, image_data)
            .and_then(|_| writer.flush().map_err(RasterError::from))
            .map_err(|e| match e {
                RasterError::Stream(source) => RasterError::io(output_path, "write", source),
                other => other,
            })
    }

    /// Encodes a complete TIFF file into memory
    pub fn encode(ifd: &IFD, external_data: &BTreeMap<u16, Vec<u8>>, image_data: &[u8]) -> RasterResult<Vec<u8>> {
        let mut buffer = Vec::new();
        Self::write_to(&mut buffer, ifd, external_data, image_data)?;
        Ok(buffer)
    }

    fn write_to(
        writer: &mut impl Write,
        ifd: &IFD,
        external_data: &BTreeMap<u16, Vec<u8>>,
        image_data: &[u8],
    ) -> RasterResult<()> {
        let entries = ifd.sorted_entries();
        if entries.len() > u16::MAX as usize {
            return Err(RasterError::Generic(format!("Too many tags: {}", entries.len())));
        }

        let (data_offsets, image_offset, total_size) =
            Self::calculate_offsets(entries.len(), external_data, image_data.len());
        if total_size > u32::MAX as u64 {
            return Err(RasterError::Generic(format!(
                "Output of {} bytes exceeds the classic TIFF limit", total_size
            )));
        }

        Self::write_header(writer, HEADER_SIZE as u32)?;
        let mut position = HEADER_SIZE;

        Self::write_ifd(writer, &entries, &data_offsets, image_offset)?;
        position += Self::ifd_size(entries.len());

        for (tag, data) in external_data {
            position = Self::pad_to(writer, position, data_offsets[tag])?;
            writer.write_all(data)?;
            position += data.len() as u64;
        }

        position = Self::pad_to(writer, position, image_offset)?;
        writer.write_all(image_data)?;
        debug!("Wrote {} bytes ({} tags)", position + image_data.len() as u64, entries.len());

        Ok(())
    }

    /// Offsets of each external tag block and of the image data, plus the file size
    fn calculate_offsets(
        entry_count: usize,
        external_data: &BTreeMap<u16, Vec<u8>>,
        image_size: usize,
    ) -> (HashMap<u16, u64>, u64, u64) {
        let mut current_offset = HEADER_SIZE + Self::ifd_size(entry_count);
        let mut data_offsets = HashMap::with_capacity(external_data.len());

        for (tag, data) in external_data {
            current_offset = align_to_4_bytes(current_offset);
            data_offsets.insert(*tag, current_offset);
            current_offset += data.len() as u64;
        }

        let image_offset = align_to_4_bytes(current_offset);
        (data_offsets, image_offset, image_offset + image_size as u64)
    }

    /// Entry count, 12 bytes per entry, next-IFD offset
    fn ifd_size(entry_count: usize) -> u64 {
        2 + 12 * entry_count as u64 + 4
    }

    fn write_header(writer: &mut impl Write, first_ifd_offset: u32) -> RasterResult<()> {
        writer.write_all(&header::LITTLE_ENDIAN_MARKER)?;
        writer.write_all(&header::TIFF_VERSION.to_le_bytes())?;
        writer.write_all(&first_ifd_offset.to_le_bytes())?;
        Ok(())
    }

    fn write_ifd(
        writer: &mut impl Write,
        entries: &[IFDEntry],
        data_offsets: &HashMap<u16, u64>,
        image_offset: u64,
    ) -> RasterResult<()> {
        writer.write_all(&(entries.len() as u16).to_le_bytes())?;

        for entry in entries {
            writer.write_all(&entry.tag.to_le_bytes())?;
            writer.write_all(&entry.field_type.to_le_bytes())?;
            writer.write_all(&(entry.count as u32).to_le_bytes())?;

            if entry.tag == tags::STRIP_OFFSETS {
                writer.write_all(&(image_offset as u32).to_le_bytes())?;
            } else if let Some(offset) = data_offsets.get(&entry.tag) {
                writer.write_all(&(*offset as u32).to_le_bytes())?;
            } else {
                writer.write_all(&entry.inline_bytes[..4])?;
            }
        }

        // No further IFDs
        writer.write_all(&0u32.to_le_bytes())?;
        Ok(())
    }

    fn pad_to(writer: &mut impl Write, position: u64, target: u64) -> RasterResult<u64> {
        let padding = target.saturating_sub(position) as usize;
        writer.write_all(&vec![0u8; padding])?;
        Ok(position + padding as u64)
    }
}

fn align_to_4_bytes(offset: u64) -> u64 {
    (offset + 3) & !3
}
