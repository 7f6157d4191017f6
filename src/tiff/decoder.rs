//! Strip and tile pixel decoding
//!
//! Image data is stored in chunks: horizontal strips spanning the full width,
//! or rectangular tiles. A windowed read visits only the chunks that intersect
//! the window, decompresses them, undoes the predictor and scatters the
//! samples into a band-sequential `f64` buffer.

use log::{debug, trace};
use std::io::{Read, Seek, SeekFrom};

use crate::compression::{CompressionFactory, CompressionHandler};
use crate::error::{RasterError, RasterResult};
use crate::io::{ByteOrderHandler, SeekableReader};
use crate::raster::{SampleType, Window};
use crate::tiff::constants::{compression, planar_config, predictor, sample_format, tags};
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;

/// Geometry and encoding of the pixel data described by one IFD
#[derive(Debug, Clone)]
pub struct ImageLayout {
    pub width: usize,
    pub height: usize,
    pub samples_per_pixel: usize,
    pub sample_type: SampleType,
    pub planar: bool,
    pub compression: u16,
    pub predictor: u16,
    pub tiled: bool,
    /// Chunk width in pixels (image width for strips)
    pub chunk_width: usize,
    /// Chunk height in rows (rows per strip for strips)
    pub chunk_height: usize,
    pub offsets: Vec<u64>,
    pub byte_counts: Vec<u64>,
}

impl ImageLayout {
    /// Collects the layout tags of `ifd`
    pub fn from_ifd(tiff_reader: &TiffReader, reader: &mut dyn SeekableReader, ifd: &IFD) -> RasterResult<Self> {
        let (width, height) = ifd.get_dimensions().ok_or(RasterError::MissingDimensions)?;
        let (width, height) = (width as usize, height as usize);
        if width == 0 || height == 0 {
            return Err(RasterError::MissingDimensions);
        }

        let samples_per_pixel = ifd.get_samples_per_pixel().max(1) as usize;

        // All samples must share one type; only the first value is consulted
        let bits = first_value(tiff_reader, reader, ifd, tags::BITS_PER_SAMPLE)?.unwrap_or(1) as u16;
        let format = first_value(tiff_reader, reader, ifd, tags::SAMPLE_FORMAT)?
            .unwrap_or(sample_format::UNSIGNED as u64) as u16;
        let sample_type = SampleType::from_tags(bits, format)?;

        let planar = samples_per_pixel > 1
            && ifd.get_tag_value(tags::PLANAR_CONFIGURATION) == Some(planar_config::PLANAR as u64);
        let compression = ifd.get_tag_value(tags::COMPRESSION).unwrap_or(compression::NONE as u64) as u16;
        let predictor = ifd.get_tag_value(tags::PREDICTOR).unwrap_or(predictor::NONE as u64) as u16;

        let tiled = ifd.is_tiled();
        let (chunk_width, chunk_height, offsets, byte_counts) = if tiled {
            let tile_width = ifd.get_tag_value(tags::TILE_WIDTH).unwrap_or(256) as usize;
            let tile_height = ifd.get_tag_value(tags::TILE_LENGTH).unwrap_or(256) as usize;
            (
                tile_width,
                tile_height,
                tiff_reader.read_tag_values(reader, ifd, tags::TILE_OFFSETS)?,
                tiff_reader.read_tag_values(reader, ifd, tags::TILE_BYTE_COUNTS)?,
            )
        } else {
            let rows_per_strip = ifd.get_tag_value(tags::ROWS_PER_STRIP)
                .map_or(height, |rows| (rows as usize).min(height));
            (
                width,
                rows_per_strip,
                tiff_reader.read_tag_values(reader, ifd, tags::STRIP_OFFSETS)?,
                tiff_reader.read_tag_values(reader, ifd, tags::STRIP_BYTE_COUNTS)?,
            )
        };

        if chunk_width == 0 || chunk_height == 0 {
            return Err(RasterError::Generic(format!(
                "Invalid chunk size {}x{}", chunk_width, chunk_height
            )));
        }

        let layout = ImageLayout {
            width,
            height,
            samples_per_pixel,
            sample_type,
            planar,
            compression,
            predictor,
            tiled,
            chunk_width,
            chunk_height,
            offsets,
            byte_counts,
        };

        let expected = layout.chunks_per_plane() * layout.planes();
        if layout.offsets.len() < expected || layout.byte_counts.len() < expected {
            return Err(RasterError::Generic(format!(
                "Image needs {} chunks but lists {} offsets and {} byte counts",
                expected, layout.offsets.len(), layout.byte_counts.len()
            )));
        }

        Ok(layout)
    }

    pub fn chunks_across(&self) -> usize {
        self.width.div_ceil(self.chunk_width)
    }

    pub fn chunks_down(&self) -> usize {
        self.height.div_ceil(self.chunk_height)
    }

    fn chunks_per_plane(&self) -> usize {
        self.chunks_across() * self.chunks_down()
    }

    fn planes(&self) -> usize {
        if self.planar { self.samples_per_pixel } else { 1 }
    }

    /// Samples stored side by side in one pixel of a chunk
    fn interleaved_samples(&self) -> usize {
        if self.planar { 1 } else { self.samples_per_pixel }
    }

    /// Rows actually stored in the chunk at `chunk_row`
    ///
    /// Tiles are always padded to full height; the last strip may be short.
    fn rows_in_chunk(&self, chunk_row: usize) -> usize {
        if self.tiled {
            self.chunk_height
        } else {
            self.chunk_height.min(self.height - chunk_row * self.chunk_height)
        }
    }

    pub fn layout_name(&self) -> &'static str {
        if self.tiled { "tiled" } else { "stripped" }
    }
}

fn first_value(
    tiff_reader: &TiffReader,
    reader: &mut dyn SeekableReader,
    ifd: &IFD,
    tag: u16,
) -> RasterResult<Option<u64>> {
    if !ifd.has_tag(tag) {
        return Ok(None);
    }
    Ok(tiff_reader.read_tag_values(reader, ifd, tag)?.first().copied())
}

/// Reads windows of pixel data described by an [`ImageLayout`]
pub struct ChunkDecoder<'a> {
    layout: &'a ImageLayout,
    byte_order: &'a dyn ByteOrderHandler,
    compression_handler: Box<dyn CompressionHandler>,
}

impl<'a> ChunkDecoder<'a> {
    pub fn new(layout: &'a ImageLayout, byte_order: &'a dyn ByteOrderHandler) -> RasterResult<Self> {
        if layout.predictor != predictor::NONE && layout.predictor != predictor::HORIZONTAL_DIFFERENCING {
            return Err(RasterError::Generic(format!("Unsupported predictor: {}", layout.predictor)));
        }
        let compression_handler = CompressionFactory::create_handler(layout.compression)?;
        debug!("Decoding {} image with {} compression", layout.layout_name(), compression_handler.name());

        Ok(ChunkDecoder {
            layout,
            byte_order,
            compression_handler,
        })
    }

    /// Decodes one chunk into `f64` samples, row by row
    fn read_chunk(&self, reader: &mut dyn SeekableReader, index: usize, rows: usize) -> RasterResult<Vec<f64>> {
        let layout = self.layout;
        let offset = layout.offsets[index];
        let byte_count = layout.byte_counts[index] as usize;
        trace!("Reading chunk {} at offset {} ({} bytes)", index, offset, byte_count);

        reader.seek(SeekFrom::Start(offset))?;
        let mut compressed = vec![0u8; byte_count];
        reader.read_exact(&mut compressed)?;

        let mut data = self.compression_handler.decompress(&compressed)?;

        let row_samples = layout.chunk_width * layout.interleaved_samples();
        let expected = rows * row_samples * layout.sample_type.bytes();
        if data.len() < expected {
            return Err(RasterError::Generic(format!(
                "Chunk {} decoded to {} bytes, expected {}", index, data.len(), expected
            )));
        }
        data.truncate(expected);

        if layout.predictor == predictor::HORIZONTAL_DIFFERENCING {
            self.byte_order.undo_horizontal_predictor(
                &mut data,
                row_samples,
                layout.interleaved_samples(),
                layout.sample_type,
            );
        }

        let mut samples = Vec::new();
        self.byte_order.decode_samples(&data, layout.sample_type, &mut samples);
        Ok(samples)
    }

    /// Reads `window` (which must lie inside the image) for every band
    ///
    /// The result is band-sequential, each band row-major over the window.
    pub fn read_window(&self, reader: &mut dyn SeekableReader, window: &Window) -> RasterResult<Vec<f64>> {
        let layout = self.layout;
        let extent = Window::full(layout.width, layout.height);
        if window.intersection(&extent) != Some(*window) {
            return Err(RasterError::Generic(format!(
                "Window {:?} outside {}x{} image", window, layout.width, layout.height
            )));
        }

        let bands = layout.samples_per_pixel;
        let band_size = window.pixel_count();
        let mut output = vec![0.0; band_size * bands];

        let row_start = window.row_off as usize;
        let col_start = window.col_off as usize;
        let row_end = window.end_row() as usize;
        let col_end = window.end_col() as usize;

        let first_chunk_row = row_start / layout.chunk_height;
        let last_chunk_row = (row_end - 1) / layout.chunk_height;
        let first_chunk_col = col_start / layout.chunk_width;
        let last_chunk_col = (col_end - 1) / layout.chunk_width;

        let interleaved = layout.interleaved_samples();
        let row_samples = layout.chunk_width * interleaved;

        for plane in 0..layout.planes() {
            for chunk_row in first_chunk_row..=last_chunk_row {
                let rows = layout.rows_in_chunk(chunk_row);
                for chunk_col in first_chunk_col..=last_chunk_col {
                    let index = plane * layout.chunks_per_plane() + chunk_row * layout.chunks_across() + chunk_col;
                    let samples = self.read_chunk(reader, index, rows)?;

                    let chunk_top = chunk_row * layout.chunk_height;
                    let chunk_left = chunk_col * layout.chunk_width;
                    let rows_from = row_start.max(chunk_top);
                    let rows_to = row_end.min(chunk_top + rows);
                    let cols_from = col_start.max(chunk_left);
                    let cols_to = col_end.min(chunk_left + layout.chunk_width);

                    for row in rows_from..rows_to {
                        let src_row = (row - chunk_top) * row_samples;
                        let dst_row = (row - row_start) * window.width;
                        for col in cols_from..cols_to {
                            let src = src_row + (col - chunk_left) * interleaved;
                            let dst = dst_row + (col - col_start);
                            if layout.planar {
                                output[plane * band_size + dst] = samples[src];
                            } else {
                                for band in 0..bands {
                                    output[band * band_size + dst] = samples[src + band];
                                }
                            }
                        }
                    }
                }
            }
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ByteOrder;

    fn strip_layout(width: usize, height: usize, rows_per_strip: usize, data: &[u8]) -> ImageLayout {
        let strip_bytes = width * rows_per_strip;
        let strips = height.div_ceil(rows_per_strip);
        let offsets = (0..strips).map(|i| (i * strip_bytes) as u64).collect();
        let byte_counts = (0..strips)
            .map(|i| (data.len() - i * strip_bytes).min(strip_bytes) as u64)
            .collect();
        ImageLayout {
            width,
            height,
            samples_per_pixel: 1,
            sample_type: SampleType::U8,
            planar: false,
            compression: compression::NONE,
            predictor: predictor::NONE,
            tiled: false,
            chunk_width: width,
            chunk_height: rows_per_strip,
            offsets,
            byte_counts,
        }
    }

    #[test]
    fn test_window_across_strips() {
        let data: Vec<u8> = (0..50).collect();
        let layout = strip_layout(10, 5, 2, &data);
        let handler = ByteOrder::LittleEndian.create_handler();
        let decoder = ChunkDecoder::new(&layout, handler.as_ref()).unwrap();

        let mut cursor = std::io::Cursor::new(data);
        let values = decoder.read_window(&mut cursor, &Window::new(1, 3, 4, 2)).unwrap();
        assert_eq!(values, vec![13.0, 14.0, 23.0, 24.0, 33.0, 34.0, 43.0, 44.0]);
    }

    #[test]
    fn test_tiles_with_padding() {
        // 3x3 image in 2x2 tiles; padded cells hold 99
        let tiles: Vec<u8> = vec![
            0, 1, 3, 4,
            2, 99, 5, 99,
            6, 7, 99, 99,
            8, 99, 99, 99,
        ];
        let layout = ImageLayout {
            width: 3,
            height: 3,
            samples_per_pixel: 1,
            sample_type: SampleType::U8,
            planar: false,
            compression: compression::NONE,
            predictor: predictor::NONE,
            tiled: true,
            chunk_width: 2,
            chunk_height: 2,
            offsets: vec![0, 4, 8, 12],
            byte_counts: vec![4, 4, 4, 4],
        };
        let handler = ByteOrder::LittleEndian.create_handler();
        let decoder = ChunkDecoder::new(&layout, handler.as_ref()).unwrap();

        let mut cursor = std::io::Cursor::new(tiles);
        let values = decoder.read_window(&mut cursor, &Window::full(3, 3)).unwrap();
        assert_eq!(values, (0..9).map(|v| v as f64).collect::<Vec<_>>());
    }

    #[test]
    fn test_chunky_bands_are_split() {
        let data: Vec<u8> = vec![1, 10, 2, 20, 3, 30, 4, 40];
        let mut layout = strip_layout(2, 2, 2, &data);
        layout.samples_per_pixel = 2;
        layout.chunk_width = 2;
        layout.byte_counts = vec![8];
        let handler = ByteOrder::LittleEndian.create_handler();
        let decoder = ChunkDecoder::new(&layout, handler.as_ref()).unwrap();

        let mut cursor = std::io::Cursor::new(data);
        let values = decoder.read_window(&mut cursor, &Window::full(2, 2)).unwrap();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_short_chunk_is_an_error() {
        let data: Vec<u8> = (0..10).collect();
        let mut layout = strip_layout(10, 2, 2, &data);
        layout.byte_counts = vec![10];
        let handler = ByteOrder::LittleEndian.create_handler();
        let decoder = ChunkDecoder::new(&layout, handler.as_ref()).unwrap();

        let mut cursor = std::io::Cursor::new(data);
        assert!(decoder.read_window(&mut cursor, &Window::full(10, 2)).is_err());
    }
}
