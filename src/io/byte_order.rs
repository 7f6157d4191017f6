//! Byte order handling for TIFF files
//!
//! Strategy pattern over little-endian and big-endian files: the handler is
//! chosen once from the header and then used for every tag value and every
//! decoded pixel sample.

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use std::io::Result;

use crate::error::{RasterError, RasterResult};
use crate::io::SeekableReader;
use crate::raster::SampleType;

/// Represents the byte order of a TIFF file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian byte order (II)
    LittleEndian,
    /// Big-endian byte order (MM)
    BigEndian,
}

impl ByteOrder {
    /// Detects the byte order from the TIFF header
    pub fn detect(reader: &mut dyn SeekableReader) -> RasterResult<Self> {
        let marker = reader.read_u16::<LittleEndian>()?;
        match marker {
            0x4949 => Ok(ByteOrder::LittleEndian), // "II"
            0x4D4D => Ok(ByteOrder::BigEndian),    // "MM"
            _ => Err(RasterError::InvalidByteOrder(marker)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ByteOrder::LittleEndian => "Little Endian (II)",
            ByteOrder::BigEndian => "Big Endian (MM)",
        }
    }

    /// Creates the appropriate handler for this byte order
    pub fn create_handler(&self) -> Box<dyn ByteOrderHandler> {
        match self {
            ByteOrder::LittleEndian => Box::new(LittleEndianHandler),
            ByteOrder::BigEndian => Box::new(BigEndianHandler),
        }
    }
}

/// Trait for byte order handling strategies
pub trait ByteOrderHandler: Send + Sync {
    fn order(&self) -> ByteOrder;

    fn read_u16(&self, reader: &mut dyn SeekableReader) -> Result<u16>;

    fn read_u32(&self, reader: &mut dyn SeekableReader) -> Result<u32>;

    fn read_u64(&self, reader: &mut dyn SeekableReader) -> Result<u64>;

    fn read_f64(&self, reader: &mut dyn SeekableReader) -> Result<f64>;

    /// Decodes a buffer of packed samples, appending one `f64` per sample
    ///
    /// Trailing bytes that do not form a whole sample are ignored.
    fn decode_samples(&self, data: &[u8], sample_type: SampleType, out: &mut Vec<f64>);

    /// Reverses TIFF predictor 2 (horizontal differencing) in place
    ///
    /// `data` holds whole rows of `row_samples` samples each, where a row
    /// sample count already includes the samples-per-pixel factor.
    fn undo_horizontal_predictor(
        &self,
        data: &mut [u8],
        row_samples: usize,
        samples_per_pixel: usize,
        sample_type: SampleType,
    );

    /// Converts `data` made of `element_size`-byte values to little-endian order
    fn to_little_endian(&self, data: &mut [u8], element_size: usize);
}

/// Little-endian byte order handler
pub struct LittleEndianHandler;

impl ByteOrderHandler for LittleEndianHandler {
    fn order(&self) -> ByteOrder {
        ByteOrder::LittleEndian
    }

    fn read_u16(&self, reader: &mut dyn SeekableReader) -> Result<u16> {
        reader.read_u16::<LittleEndian>()
    }

    fn read_u32(&self, reader: &mut dyn SeekableReader) -> Result<u32> {
        reader.read_u32::<LittleEndian>()
    }

    fn read_u64(&self, reader: &mut dyn SeekableReader) -> Result<u64> {
        reader.read_u64::<LittleEndian>()
    }

    fn read_f64(&self, reader: &mut dyn SeekableReader) -> Result<f64> {
        reader.read_f64::<LittleEndian>()
    }

    fn decode_samples(&self, data: &[u8], sample_type: SampleType, out: &mut Vec<f64>) {
        decode_samples_as::<LittleEndian>(data, sample_type, out);
    }

    fn undo_horizontal_predictor(
        &self,
        data: &mut [u8],
        row_samples: usize,
        samples_per_pixel: usize,
        sample_type: SampleType,
    ) {
        undo_predictor_as::<LittleEndian>(data, row_samples, samples_per_pixel, sample_type);
    }

    fn to_little_endian(&self, _data: &mut [u8], _element_size: usize) {}
}

/// Big-endian byte order handler
pub struct BigEndianHandler;

impl ByteOrderHandler for BigEndianHandler {
    fn order(&self) -> ByteOrder {
        ByteOrder::BigEndian
    }

    fn read_u16(&self, reader: &mut dyn SeekableReader) -> Result<u16> {
        reader.read_u16::<BigEndian>()
    }

    fn read_u32(&self, reader: &mut dyn SeekableReader) -> Result<u32> {
        reader.read_u32::<BigEndian>()
    }

    fn read_u64(&self, reader: &mut dyn SeekableReader) -> Result<u64> {
        reader.read_u64::<BigEndian>()
    }

    fn read_f64(&self, reader: &mut dyn SeekableReader) -> Result<f64> {
        reader.read_f64::<BigEndian>()
    }

    fn decode_samples(&self, data: &[u8], sample_type: SampleType, out: &mut Vec<f64>) {
        decode_samples_as::<BigEndian>(data, sample_type, out);
    }

    fn undo_horizontal_predictor(
        &self,
        data: &mut [u8],
        row_samples: usize,
        samples_per_pixel: usize,
        sample_type: SampleType,
    ) {
        undo_predictor_as::<BigEndian>(data, row_samples, samples_per_pixel, sample_type);
    }

    fn to_little_endian(&self, data: &mut [u8], element_size: usize) {
        if element_size < 2 {
            return;
        }
        for chunk in data.chunks_exact_mut(element_size) {
            chunk.reverse();
        }
    }
}

fn decode_samples_as<B: byteorder::ByteOrder>(data: &[u8], sample_type: SampleType, out: &mut Vec<f64>) {
    let size = sample_type.bytes();
    out.reserve(data.len() / size);

    for chunk in data.chunks_exact(size) {
        let value = match sample_type {
            SampleType::U8 => chunk[0] as f64,
            SampleType::I8 => chunk[0] as i8 as f64,
            SampleType::U16 => B::read_u16(chunk) as f64,
            SampleType::I16 => B::read_i16(chunk) as f64,
            SampleType::U32 => B::read_u32(chunk) as f64,
            SampleType::I32 => B::read_i32(chunk) as f64,
            SampleType::F32 => B::read_f32(chunk) as f64,
            SampleType::F64 => B::read_f64(chunk),
        };
        out.push(value);
    }
}

fn undo_predictor_as<B: byteorder::ByteOrder>(
    data: &mut [u8],
    row_samples: usize,
    samples_per_pixel: usize,
    sample_type: SampleType,
) {
    let size = sample_type.bytes();
    let row_bytes = row_samples * size;
    if row_bytes == 0 {
        return;
    }

    for row in data.chunks_exact_mut(row_bytes) {
        // Each sample adds the one `samples_per_pixel` positions before it
        for i in samples_per_pixel..row_samples {
            let cur = i * size;
            let prev = (i - samples_per_pixel) * size;
            match size {
                1 => row[cur] = row[cur].wrapping_add(row[prev]),
                2 => {
                    let sum = B::read_u16(&row[cur..]).wrapping_add(B::read_u16(&row[prev..]));
                    B::write_u16(&mut row[cur..cur + 2], sum);
                }
                4 => {
                    let sum = B::read_u32(&row[cur..]).wrapping_add(B::read_u32(&row[prev..]));
                    B::write_u32(&mut row[cur..cur + 4], sum);
                }
                _ => {
                    let sum = B::read_u64(&row[cur..]).wrapping_add(B::read_u64(&row[prev..]));
                    B::write_u64(&mut row[cur..cur + 8], sum);
                }
            }
        }
    }
}
