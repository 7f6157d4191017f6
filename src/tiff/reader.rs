//! TIFF file reader implementation
//!
//! Reads the header and IFD chain of TIFF/BigTIFF files and decodes tag
//! values in the byte order the file was written in.

use log::{debug, warn};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{RasterError, RasterResult};
use crate::io::{ByteOrder, ByteOrderHandler, SeekableReader};
use crate::tiff::constants::{field_types, header};
use crate::tiff::ifd::{IFD, IFDEntry};
use crate::tiff::types::TIFF;

/// Reader for TIFF and BigTIFF files
pub struct TiffReader {
    /// Current byte order handler, set once the header has been read
    byte_order_handler: Option<Box<dyn ByteOrderHandler>>,
    /// Current file path
    current_file: Option<PathBuf>,
    /// Whether currently reading BigTIFF format
    is_big_tiff: bool,
}

impl Default for TiffReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TiffReader {
    pub fn new() -> Self {
        TiffReader {
            byte_order_handler: None,
            current_file: None,
            is_big_tiff: false,
        }
    }

    /// Opens the current file for reading
    ///
    /// The returned handle is owned by the caller and closed when dropped.
    pub fn create_reader(&self) -> RasterResult<BufReader<File>> {
        let path = self.current_file.as_ref()
            .ok_or_else(|| RasterError::Generic("No file path specified".to_string()))?;
        let file = File::open(path).map_err(|e| RasterError::io(path, "open", e))?;
        Ok(BufReader::with_capacity(1024 * 1024, file))
    }

    fn handler(&self) -> RasterResult<&dyn ByteOrderHandler> {
        self.byte_order_handler.as_deref()
            .ok_or_else(|| RasterError::Generic("Byte order not yet determined".to_string()))
    }

    /// Loads the TIFF structure from the given path
    pub fn load(&mut self, filepath: impl AsRef<Path>) -> RasterResult<TIFF> {
        let path = filepath.as_ref();
        debug!("Loading TIFF file: {}", path.display());
        self.current_file = Some(path.to_path_buf());

        let mut reader = self.create_reader()?;
        self.read(&mut reader)
    }

    /// Reads the header and every IFD from the given reader
    pub fn read(&mut self, reader: &mut dyn SeekableReader) -> RasterResult<TIFF> {
        reader.seek(SeekFrom::Start(0))?;

        let byte_order = ByteOrder::detect(reader)?;
        debug!("Detected byte order: {}", byte_order.name());
        self.byte_order_handler = Some(byte_order.create_handler());

        let handler = self.handler()?;
        let version = handler.read_u16(reader)?;
        let is_big_tiff = match version {
            header::TIFF_VERSION => false,
            header::BIG_TIFF_VERSION => {
                let offset_size = handler.read_u16(reader)?;
                let reserved = handler.read_u16(reader)?;
                if offset_size != 8 || reserved != 0 {
                    return Err(RasterError::InvalidHeader);
                }
                true
            }
            other => return Err(RasterError::UnsupportedVersion(other)),
        };
        self.is_big_tiff = is_big_tiff;

        let first_ifd_offset = self.read_offset(reader)?;
        debug!("First IFD offset: {}", first_ifd_offset);

        let file_size = reader.seek(SeekFrom::End(0))?;
        if first_ifd_offset < 8 || first_ifd_offset >= file_size {
            return Err(RasterError::InvalidHeader);
        }

        let mut tiff = TIFF::new(is_big_tiff, byte_order);
        tiff.ifds = self.read_ifd_chain(reader, first_ifd_offset, file_size)?;

        if tiff.ifds.is_empty() {
            return Err(RasterError::InvalidHeader);
        }

        debug!("Read {} IFDs", tiff.ifds.len());
        Ok(tiff)
    }

    fn read_offset(&self, reader: &mut dyn SeekableReader) -> RasterResult<u64> {
        let handler = self.handler()?;
        if self.is_big_tiff {
            Ok(handler.read_u64(reader)?)
        } else {
            Ok(handler.read_u32(reader)? as u64)
        }
    }

    /// Reads a chain of IFDs starting from the given offset
    fn read_ifd_chain(&self, reader: &mut dyn SeekableReader, first_ifd_offset: u64, file_size: u64) -> RasterResult<Vec<IFD>> {
        let mut ifds = Vec::new();
        let mut ifd_offset = first_ifd_offset;

        while ifd_offset != 0 && ifds.len() < header::MAX_IFDS {
            if ifd_offset >= file_size {
                warn!("IFD offset {} exceeds file size {}, stopping IFD chain", ifd_offset, file_size);
                break;
            }

            let ifd = match self.read_ifd(reader, ifd_offset, ifds.len()) {
                Ok(ifd) => ifd,
                Err(e) if ifds.is_empty() => return Err(e),
                Err(e) => {
                    warn!("Error reading IFD {}: {}", ifds.len(), e);
                    break;
                }
            };

            // The reader now sits right after the last entry
            let next_ifd_offset = match self.read_offset(reader) {
                Ok(offset) => offset,
                Err(e) => {
                    warn!("Error reading next IFD offset: {}", e);
                    ifds.push(ifd);
                    break;
                }
            };

            ifds.push(ifd);

            if next_ifd_offset != 0 && (next_ifd_offset >= file_size || next_ifd_offset < 8) {
                warn!("Invalid next IFD offset: {}, stopping IFD chain", next_ifd_offset);
                break;
            }
            ifd_offset = next_ifd_offset;
        }

        Ok(ifds)
    }

    /// Reads one IFD located at `offset`
    pub fn read_ifd(&self, reader: &mut dyn SeekableReader, offset: u64, number: usize) -> RasterResult<IFD> {
        reader.seek(SeekFrom::Start(offset))?;

        let handler = self.handler()?;
        let entry_count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u16(reader)? as u64
        };
        debug!("IFD #{} at {} has {} entries", number, offset, entry_count);

        let mut ifd = IFD::new(number, offset);
        for _ in 0..entry_count {
            let entry = self.read_ifd_entry(reader)?;
            ifd.add_entry(entry);
        }

        Ok(ifd)
    }

    /// Reads a single IFD entry, decoding inline values in file byte order
    fn read_ifd_entry(&self, reader: &mut dyn SeekableReader) -> RasterResult<IFDEntry> {
        let handler = self.handler()?;

        let tag = handler.read_u16(reader)?;
        let field_type = handler.read_u16(reader)?;
        let count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u32(reader)? as u64
        };

        let field_width = if self.is_big_tiff { 8 } else { 4 };
        let mut inline_bytes = [0u8; 8];
        reader.read_exact(&mut inline_bytes[..field_width])?;

        let mut entry = IFDEntry {
            tag,
            field_type,
            count,
            value_offset: 0,
            inline_bytes,
        };

        entry.value_offset = if entry.is_value_inline(self.is_big_tiff) {
            let mut cursor = std::io::Cursor::new(&inline_bytes[..field_width]);
            match field_types::size_of(field_type) {
                Some(1) => inline_bytes[0] as u64,
                Some(2) => handler.read_u16(&mut cursor)? as u64,
                Some(4) => handler.read_u32(&mut cursor)? as u64,
                _ => handler.read_u64(&mut cursor)?,
            }
        } else {
            let mut cursor = std::io::Cursor::new(&inline_bytes[..field_width]);
            if self.is_big_tiff {
                handler.read_u64(&mut cursor)?
            } else {
                handler.read_u32(&mut cursor)? as u64
            }
        };

        Ok(entry)
    }

    /// Returns the raw bytes of a tag's value array, still in file byte order
    fn read_raw_value(&self, reader: &mut dyn SeekableReader, entry: &IFDEntry) -> RasterResult<Vec<u8>> {
        let size = entry.data_size();
        if entry.is_value_inline(self.is_big_tiff) {
            return Ok(entry.inline_bytes[..size].to_vec());
        }

        reader.seek(SeekFrom::Start(entry.value_offset))?;
        let mut data = vec![0u8; size];
        reader.read_exact(&mut data)?;
        Ok(data)
    }

    /// Reads an integer-typed tag's values as u64
    pub fn read_tag_values(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> RasterResult<Vec<u64>> {
        let entry = ifd.get_entry(tag).ok_or(RasterError::TagNotFound(tag))?;
        let raw = self.read_raw_value(reader, entry)?;
        let handler = self.handler()?;

        let mut cursor = std::io::Cursor::new(raw.as_slice());
        let mut values = Vec::with_capacity(entry.count as usize);
        for _ in 0..entry.count {
            let value = match entry.field_type {
                field_types::BYTE | field_types::SBYTE | field_types::UNDEFINED => {
                    let mut byte = [0u8; 1];
                    cursor.read_exact(&mut byte)?;
                    byte[0] as u64
                }
                field_types::SHORT | field_types::SSHORT => handler.read_u16(&mut cursor)? as u64,
                field_types::LONG | field_types::SLONG => handler.read_u32(&mut cursor)? as u64,
                field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => handler.read_u64(&mut cursor)?,
                other => return Err(RasterError::UnsupportedFieldType(other)),
            };
            values.push(value);
        }

        Ok(values)
    }

    /// Reads a DOUBLE-typed tag's values
    pub fn read_tag_doubles(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> RasterResult<Vec<f64>> {
        let entry = ifd.get_entry(tag).ok_or(RasterError::TagNotFound(tag))?;
        if entry.field_type != field_types::DOUBLE {
            return Err(RasterError::UnsupportedFieldType(entry.field_type));
        }

        let raw = self.read_raw_value(reader, entry)?;
        let handler = self.handler()?;
        let mut cursor = std::io::Cursor::new(raw.as_slice());
        let mut values = Vec::with_capacity(entry.count as usize);
        for _ in 0..entry.count {
            values.push(handler.read_f64(&mut cursor)?);
        }
        Ok(values)
    }

    /// Reads an ASCII tag, trimming the trailing NUL terminator(s)
    pub fn read_tag_ascii(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> RasterResult<String> {
        let entry = ifd.get_entry(tag).ok_or(RasterError::TagNotFound(tag))?;
        let mut raw = self.read_raw_value(reader, entry)?;
        while raw.last() == Some(&0) {
            raw.pop();
        }
        String::from_utf8(raw).map_err(|e| RasterError::Generic(format!("Invalid UTF-8 string: {}", e)))
    }

    /// Reads a tag's value array converted to little-endian byte order
    ///
    /// Used to carry tags unchanged into files written by this crate.
    pub fn read_tag_le_bytes(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> RasterResult<Vec<u8>> {
        let entry = ifd.get_entry(tag).ok_or(RasterError::TagNotFound(tag))?;
        let mut raw = self.read_raw_value(reader, entry)?;
        self.handler()?.to_little_endian(&mut raw, field_types::swap_unit(entry.field_type));
        Ok(raw)
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.current_file.as_deref()
    }

    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }

    pub fn byte_order_handler(&self) -> Option<&dyn ByteOrderHandler> {
        self.byte_order_handler.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiff::constants::tags;
    use crate::tiff::tests::test_utils;

    #[test]
    fn test_read_classic_tiff() {
        let mut cursor = test_utils::create_test_tiff_buffer();
        let mut reader = TiffReader::new();
        let tiff = reader.read(&mut cursor).unwrap();

        assert!(!tiff.is_big_tiff);
        assert_eq!(tiff.byte_order, ByteOrder::LittleEndian);
        assert_eq!(tiff.ifds.len(), 1);
        assert_eq!(tiff.ifds[0].get_dimensions(), Some((800, 600)));
    }

    #[test]
    fn test_read_bigtiff() {
        let mut cursor = test_utils::create_test_bigtiff_buffer();
        let mut reader = TiffReader::new();
        let tiff = reader.read(&mut cursor).unwrap();

        assert!(tiff.is_big_tiff);
        assert_eq!(tiff.ifds[0].get_dimensions(), Some((1024, 768)));
    }

    #[test]
    fn test_big_endian_inline_short() {
        let mut cursor = test_utils::create_big_endian_tiff_buffer();
        let mut reader = TiffReader::new();
        let tiff = reader.read(&mut cursor).unwrap();
        let ifd = tiff.main_ifd().unwrap();

        assert_eq!(tiff.byte_order, ByteOrder::BigEndian);
        assert_eq!(ifd.get_dimensions(), Some((300, 200)));
        assert_eq!(ifd.get_tag_value(tags::BITS_PER_SAMPLE), Some(16));
    }

    #[test]
    fn test_read_out_of_line_doubles() {
        let mut cursor = test_utils::create_georeferenced_tiff_buffer();
        let mut reader = TiffReader::new();
        let tiff = reader.read(&mut cursor).unwrap();
        let ifd = tiff.main_ifd().unwrap();

        let scale = reader.read_tag_doubles(&mut cursor, ifd, tags::MODEL_PIXEL_SCALE_TAG).unwrap();
        assert_eq!(scale, vec![10.0, 10.0, 0.0]);

        let tiepoint = reader.read_tag_doubles(&mut cursor, ifd, tags::MODEL_TIEPOINT_TAG).unwrap();
        assert_eq!(tiepoint[3], 500000.0);
        assert_eq!(tiepoint[4], 4000000.0);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut cursor = std::io::Cursor::new(vec![0x49, 0x49, 44, 0, 8, 0, 0, 0]);
        let mut reader = TiffReader::new();
        assert!(matches!(reader.read(&mut cursor), Err(RasterError::UnsupportedVersion(44))));
    }
}
