//! In-memory rasters and GeoTIFF-backed datasets
//!
//! A [`Raster`] holds samples as `f64` in band-sequential order together with
//! its georeferencing. [`RasterDataset`] is the file-backed handle the grid,
//! patch and vectorize stages read from.

mod dataset;
mod resample;
mod window;
mod writer;

pub use dataset::RasterDataset;
pub use resample::{downsample, Resampling};
pub use window::Window;
pub use writer::write_geotiff;

use std::fmt;

use crate::coordinate::{BoundingBox, CoordinateSystem, GeoTransform};
use crate::error::{RasterError, RasterResult};
use crate::tiff::constants::sample_format;

/// Storage type of one raster sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

impl SampleType {
    /// Resolves BitsPerSample and SampleFormat tag values
    pub fn from_tags(bits: u16, format: u16) -> RasterResult<Self> {
        let sample_type = match (format, bits) {
            (sample_format::UNSIGNED, 8) => SampleType::U8,
            (sample_format::UNSIGNED, 16) => SampleType::U16,
            (sample_format::UNSIGNED, 32) => SampleType::U32,
            (sample_format::SIGNED, 8) => SampleType::I8,
            (sample_format::SIGNED, 16) => SampleType::I16,
            (sample_format::SIGNED, 32) => SampleType::I32,
            (sample_format::IEEEFP, 32) => SampleType::F32,
            (sample_format::IEEEFP, 64) => SampleType::F64,
            _ => {
                return Err(RasterError::UnsupportedSampleFormat(format!(
                    "{} bits with sample format {}", bits, format
                )));
            }
        };
        Ok(sample_type)
    }

    /// Bytes occupied by one sample
    pub fn bytes(&self) -> usize {
        match self {
            SampleType::U8 | SampleType::I8 => 1,
            SampleType::U16 | SampleType::I16 => 2,
            SampleType::U32 | SampleType::I32 | SampleType::F32 => 4,
            SampleType::F64 => 8,
        }
    }

    pub fn bits(&self) -> u16 {
        (self.bytes() * 8) as u16
    }

    /// Value of the SampleFormat tag for this type
    pub fn format_code(&self) -> u16 {
        match self {
            SampleType::U8 | SampleType::U16 | SampleType::U32 => sample_format::UNSIGNED,
            SampleType::I8 | SampleType::I16 | SampleType::I32 => sample_format::SIGNED,
            SampleType::F32 | SampleType::F64 => sample_format::IEEEFP,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, SampleType::F32 | SampleType::F64)
    }

    /// Clamps and rounds a value into this type's representable range
    pub fn saturate(&self, value: f64) -> f64 {
        let (min, max) = match self {
            SampleType::U8 => (u8::MIN as f64, u8::MAX as f64),
            SampleType::I8 => (i8::MIN as f64, i8::MAX as f64),
            SampleType::U16 => (u16::MIN as f64, u16::MAX as f64),
            SampleType::I16 => (i16::MIN as f64, i16::MAX as f64),
            SampleType::U32 => (u32::MIN as f64, u32::MAX as f64),
            SampleType::I32 => (i32::MIN as f64, i32::MAX as f64),
            SampleType::F32 => return value as f32 as f64,
            SampleType::F64 => return value,
        };
        if value.is_nan() {
            return 0.0;
        }
        value.round().clamp(min, max)
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleType::U8 => "uint8",
            SampleType::I8 => "int8",
            SampleType::U16 => "uint16",
            SampleType::I16 => "int16",
            SampleType::U32 => "uint32",
            SampleType::I32 => "int32",
            SampleType::F32 => "float32",
            SampleType::F64 => "float64",
        };
        write!(f, "{}", name)
    }
}

/// A TIFF tag copied verbatim from a source file into derived outputs
///
/// `data` holds the value array in little-endian byte order.
#[derive(Debug, Clone, PartialEq)]
pub struct PassthroughTag {
    pub tag: u16,
    pub field_type: u16,
    pub count: u64,
    pub data: Vec<u8>,
}

/// Source metadata that travels with a raster into its patches
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RasterMetadata {
    pub nodata: Option<f64>,
    /// Source georeferencing used PixelIsPoint raster space
    pub pixel_is_point: bool,
    pub passthrough: Vec<PassthroughTag>,
}

impl RasterMetadata {
    pub fn passthrough_tag(&self, tag: u16) -> Option<&PassthroughTag> {
        self.passthrough.iter().find(|entry| entry.tag == tag)
    }
}

/// A georeferenced multi-band raster held in memory
#[derive(Debug, Clone)]
pub struct Raster {
    pub width: usize,
    pub height: usize,
    pub bands: usize,
    pub sample_type: SampleType,
    /// Samples, band-sequential then row-major
    pub data: Vec<f64>,
    pub transform: GeoTransform,
    pub crs: CoordinateSystem,
    pub metadata: RasterMetadata,
}

impl Raster {
    /// Zero-filled raster with an identity transform and no CRS
    pub fn new(width: usize, height: usize, bands: usize, sample_type: SampleType) -> Self {
        Raster {
            width,
            height,
            bands,
            sample_type,
            data: vec![0.0; width * height * bands],
            transform: GeoTransform::identity(),
            crs: CoordinateSystem::Undefined,
            metadata: RasterMetadata::default(),
        }
    }

    /// Wraps existing band-sequential samples
    pub fn from_data(
        width: usize,
        height: usize,
        bands: usize,
        sample_type: SampleType,
        data: Vec<f64>,
    ) -> RasterResult<Self> {
        if data.len() != width * height * bands {
            return Err(RasterError::config(format!(
                "Raster of {}x{}x{} needs {} samples, got {}",
                width, height, bands, width * height * bands, data.len()
            )));
        }
        let mut raster = Raster::new(0, 0, 0, sample_type);
        raster.width = width;
        raster.height = height;
        raster.bands = bands;
        raster.data = data;
        Ok(raster)
    }

    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_crs(mut self, crs: CoordinateSystem) -> Self {
        self.crs = crs;
        self
    }

    pub fn with_metadata(mut self, metadata: RasterMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn extent(&self) -> Window {
        Window::full(self.width, self.height)
    }

    /// World envelope of the whole raster
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_window(&self.extent(), &self.transform)
    }

    fn offset(&self, band: usize, row: usize, col: usize) -> usize {
        (band * self.height + row) * self.width + col
    }

    pub fn get(&self, band: usize, row: usize, col: usize) -> Option<f64> {
        if band >= self.bands || row >= self.height || col >= self.width {
            return None;
        }
        Some(self.data[self.offset(band, row, col)])
    }

    pub fn set(&mut self, band: usize, row: usize, col: usize, value: f64) {
        if band < self.bands && row < self.height && col < self.width {
            let offset = self.offset(band, row, col);
            self.data[offset] = value;
        }
    }

    /// Samples of one zero-based band in row-major order
    pub fn band(&self, band: usize) -> RasterResult<&[f64]> {
        if band >= self.bands {
            return Err(RasterError::config(format!(
                "Band {} requested from a raster with {} band(s)", band + 1, self.bands
            )));
        }
        let size = self.width * self.height;
        Ok(&self.data[band * size..(band + 1) * size])
    }

    /// Copies the part of the raster under `window`
    ///
    /// The window must lie inside the raster; the copy's transform is shifted
    /// to the window origin.
    pub fn crop(&self, window: &Window) -> RasterResult<Raster> {
        if window.intersection(&self.extent()) != Some(*window) {
            return Err(RasterError::config(format!(
                "Window {:?} is not inside the {}x{} raster", window, self.width, self.height
            )));
        }

        let row_off = window.row_off as usize;
        let col_off = window.col_off as usize;
        let mut data = Vec::with_capacity(window.pixel_count() * self.bands);
        for band in 0..self.bands {
            for row in row_off..row_off + window.height {
                let start = self.offset(band, row, col_off);
                data.extend_from_slice(&self.data[start..start + window.width]);
            }
        }

        Ok(Raster {
            width: window.width,
            height: window.height,
            bands: self.bands,
            sample_type: self.sample_type,
            data,
            transform: self.transform.translate(window.col_off as f64, window.row_off as f64),
            crs: self.crs.clone(),
            metadata: self.metadata.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: usize, height: usize, bands: usize) -> Raster {
        let data = (0..width * height * bands).map(|v| v as f64).collect();
        Raster::from_data(width, height, bands, SampleType::U16, data).unwrap()
    }

    #[test]
    fn test_sample_type_from_tags() {
        assert_eq!(SampleType::from_tags(8, 1).unwrap(), SampleType::U8);
        assert_eq!(SampleType::from_tags(16, 2).unwrap(), SampleType::I16);
        assert_eq!(SampleType::from_tags(64, 3).unwrap(), SampleType::F64);
        assert!(SampleType::from_tags(64, 1).is_err());
        assert!(SampleType::from_tags(12, 1).is_err());
    }

    #[test]
    fn test_saturate() {
        assert_eq!(SampleType::U8.saturate(300.0), 255.0);
        assert_eq!(SampleType::I16.saturate(-2.6), -3.0);
        assert_eq!(SampleType::U16.saturate(f64::NAN), 0.0);
        assert_eq!(SampleType::F64.saturate(0.25), 0.25);
    }

    #[test]
    fn test_from_data_checks_length() {
        assert!(Raster::from_data(3, 3, 1, SampleType::U8, vec![0.0; 8]).is_err());
    }

    #[test]
    fn test_band_layout() {
        let raster = ramp(4, 3, 2);
        assert_eq!(raster.get(1, 0, 0), Some(12.0));
        assert_eq!(raster.get(0, 2, 3), Some(11.0));
        assert_eq!(raster.band(1).unwrap()[0], 12.0);
        assert!(raster.band(2).is_err());
    }

    #[test]
    fn test_crop_shifts_transform() {
        let raster = ramp(4, 3, 2).with_transform(GeoTransform::from_origin(100.0, 50.0, 2.0, 2.0));
        let crop = raster.crop(&Window::new(1, 2, 2, 2)).unwrap();

        assert_eq!(crop.data, vec![6.0, 7.0, 10.0, 11.0, 18.0, 19.0, 22.0, 23.0]);
        assert_eq!(crop.transform.apply(0.0, 0.0), (104.0, 48.0));
        assert!(raster.crop(&Window::new(2, 2, 2, 2)).is_err());
    }
}
