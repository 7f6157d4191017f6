//! Raster downsampling
//!
//! Used as an optional pre-step before vectorization to cut the pixel count
//! of very large rasters.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma};
use log::{debug, warn};
use std::fmt;
use std::str::FromStr;

use crate::error::{RasterError, RasterResult};
use crate::raster::Raster;

/// Resampling kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resampling {
    /// Source sample whose centre is closest
    Nearest,
    /// Tent filter over neighbouring samples
    #[default]
    Bilinear,
}

impl FromStr for Resampling {
    type Err = RasterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nearest" => Ok(Resampling::Nearest),
            "bilinear" => Ok(Resampling::Bilinear),
            other => Err(RasterError::config(format!("Unknown resampling method: {}", other))),
        }
    }
}

impl fmt::Display for Resampling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resampling::Nearest => write!(f, "nearest"),
            Resampling::Bilinear => write!(f, "bilinear"),
        }
    }
}

/// Shrinks `raster` by `factor` along both axes
///
/// The output has `floor(width / factor)` by `floor(height / factor)` pixels
/// (at least one each), keeps the source sample type, and its transform is
/// scaled so it covers the same world extent.
pub fn downsample(raster: &Raster, factor: f64, method: Resampling) -> RasterResult<Raster> {
    if !factor.is_finite() || factor < 1.0 {
        return Err(RasterError::config(format!("Downsample factor must be >= 1, got {}", factor)));
    }

    let new_width = ((raster.width as f64 / factor) as usize).max(1);
    let new_height = ((raster.height as f64 / factor) as usize).max(1);
    if new_width == raster.width && new_height == raster.height {
        return Ok(raster.clone());
    }

    debug!("Downsampling {}x{} to {}x{} ({})", raster.width, raster.height, new_width, new_height, method);

    let mut data = Vec::with_capacity(new_width * new_height * raster.bands);
    for band in 0..raster.bands {
        let samples = raster.band(band)?;
        let resized = match method {
            Resampling::Nearest => nearest(samples, raster.width, raster.height, new_width, new_height),
            Resampling::Bilinear => bilinear(samples, raster.width, raster.height, new_width, new_height)?,
        };
        data.extend(resized.into_iter().map(|v| raster.sample_type.saturate(v)));
    }

    let transform = raster.transform.scale(
        raster.width as f64 / new_width as f64,
        raster.height as f64 / new_height as f64,
    );

    Ok(Raster::from_data(new_width, new_height, raster.bands, raster.sample_type, data)?
        .with_transform(transform)
        .with_crs(raster.crs.clone())
        .with_metadata(raster.metadata.clone()))
}

/// Picks source samples directly so class values of any sample type survive
/// unchanged; the `image` resize path goes through `f32` samples.
fn nearest(samples: &[f64], width: usize, height: usize, new_width: usize, new_height: usize) -> Vec<f64> {
    let x_ratio = width as f64 / new_width as f64;
    let y_ratio = height as f64 / new_height as f64;

    let mut out = Vec::with_capacity(new_width * new_height);
    for row in 0..new_height {
        let src_row = (((row as f64 + 0.5) * y_ratio) as usize).min(height - 1);
        for col in 0..new_width {
            let src_col = (((col as f64 + 0.5) * x_ratio) as usize).min(width - 1);
            out.push(samples[src_row * width + src_col]);
        }
    }
    out
}

/// Largest span of integers an `f32` holds exactly
const F32_EXACT_SPAN: f64 = (1u32 << 24) as f64;

/// Whether normalising `[min, max]` into `f32` loses integer steps
fn loses_f32_precision(min: f64, max: f64) -> bool {
    max - min > F32_EXACT_SPAN
}

/// Tent-filter resize through the `image` crate
///
/// The crate clamps float pixels to [0, 1] and filters in `f32`, so the band
/// is normalised to that range first and mapped back afterwards. Bands whose
/// range exceeds 2^24 come back with an error of up to `range / 2^24`.
fn bilinear(samples: &[f64], width: usize, height: usize, new_width: usize, new_height: usize) -> RasterResult<Vec<f64>> {
    let (min, max) = samples.iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if !min.is_finite() {
        return Ok(vec![0.0; new_width * new_height]);
    }
    let range = if max > min { max - min } else { 1.0 };
    if loses_f32_precision(min, max) {
        warn!(
            "Bilinear downsampling filters in f32; values in [{}, {}] may shift by up to {:.0}",
            min, max, range / F32_EXACT_SPAN
        );
    }

    let normalised: Vec<f32> = samples.iter()
        .map(|&v| if v.is_finite() { ((v - min) / range) as f32 } else { 0.0 })
        .collect();
    let buffer: ImageBuffer<Luma<f32>, Vec<f32>> = ImageBuffer::from_raw(width as u32, height as u32, normalised)
        .ok_or_else(|| RasterError::Generic(format!("Band buffer does not match {}x{}", width, height)))?;

    let resized = imageops::resize(&buffer, new_width as u32, new_height as u32, FilterType::Triangle);
    Ok(resized.into_raw().into_iter().map(|v| min + v as f64 * range).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::GeoTransform;
    use crate::raster::SampleType;

    fn checker(size: usize, block: usize) -> Raster {
        let data = (0..size * size)
            .map(|i| if ((i / size) / block + (i % size) / block) % 2 == 0 { 40.0 } else { 0.0 })
            .collect();
        Raster::from_data(size, size, 1, SampleType::U8, data)
            .unwrap()
            .with_transform(GeoTransform::from_origin(0.0, 100.0, 1.0, 1.0))
    }

    #[test]
    fn test_nearest_keeps_block_values() {
        let raster = checker(8, 4);
        let small = downsample(&raster, 4.0, Resampling::Nearest).unwrap();

        assert_eq!((small.width, small.height), (2, 2));
        assert_eq!(small.data, vec![40.0, 0.0, 0.0, 40.0]);
        assert_eq!(small.transform.a, 4.0);
        assert_eq!(small.transform.e, -4.0);
        assert_eq!(small.bounds(), raster.bounds());
    }

    #[test]
    fn test_bilinear_preserves_constant_and_range() {
        let constant = Raster::from_data(10, 10, 1, SampleType::U16, vec![1234.0; 100]).unwrap();
        let small = downsample(&constant, 3.0, Resampling::Bilinear).unwrap();
        assert_eq!((small.width, small.height), (3, 3));
        assert!(small.data.iter().all(|&v| v == 1234.0));

        let raster = checker(8, 4);
        let blurred = downsample(&raster, 2.0, Resampling::Bilinear).unwrap();
        assert!(blurred.data.iter().all(|&v| (0.0..=40.0).contains(&v)));
    }

    #[test]
    fn test_nearest_keeps_wide_integer_classes() {
        // Adjacent u32 values that share one f32 representation
        let data = (0..16).map(|i| if i % 4 < 2 { 4_000_000_001.0 } else { 4_000_000_003.0 }).collect();
        let raster = Raster::from_data(4, 4, 1, SampleType::U32, data).unwrap();
        let small = downsample(&raster, 2.0, Resampling::Nearest).unwrap();
        assert_eq!(small.data, vec![4_000_000_001.0, 4_000_000_003.0, 4_000_000_001.0, 4_000_000_003.0]);
    }

    #[test]
    fn test_bilinear_precision_bound() {
        assert!(!loses_f32_precision(0.0, 65535.0));
        assert!(!loses_f32_precision(-8_388_608.0, 8_388_608.0));
        assert!(loses_f32_precision(0.0, 4_294_967_295.0));

        let data = (0..64).map(|i| if i % 8 < 4 { 0.0 } else { 4_000_000_000.0 }).collect();
        let raster = Raster::from_data(8, 8, 1, SampleType::U32, data).unwrap();
        let small = downsample(&raster, 2.0, Resampling::Bilinear).unwrap();
        let tolerance = 4.0 * 4_000_000_000.0 / F32_EXACT_SPAN;
        assert!((small.get(0, 0, 0).unwrap() - 0.0).abs() <= tolerance);
        assert!((small.get(0, 0, 3).unwrap() - 4_000_000_000.0).abs() <= tolerance);
    }

    #[test]
    fn test_invalid_factor() {
        let raster = checker(4, 2);
        assert!(downsample(&raster, 0.5, Resampling::Nearest).is_err());
        assert!(downsample(&raster, f64::NAN, Resampling::Nearest).is_err());
        assert_eq!(downsample(&raster, 1.0, Resampling::Nearest).unwrap().data, raster.data);
    }

    #[test]
    fn test_parse_resampling() {
        assert_eq!("Nearest".parse::<Resampling>().unwrap(), Resampling::Nearest);
        assert!("cubic".parse::<Resampling>().is_err());
    }
}
