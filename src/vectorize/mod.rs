//! Raster to polygon conversion
//!
//! A single-band raster is truncated to integers, split into maximal
//! connected regions of equal value, and each region that passes the value
//! filter becomes one polygon (with holes) in world coordinates.

mod labeling;
mod trace;

pub use labeling::{label_regions, Labels};
pub use trace::{trace_regions, RegionOutline, Ring};

use geo::orient::{Direction, Orient};
use geo_types::{Coord, LineString, Polygon};
use log::{debug, info};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::coordinate::{CoordinateSystem, GeoTransform};
use crate::error::{RasterError, RasterResult};
use crate::raster::{downsample, Raster, RasterDataset, Resampling, SampleType};
use crate::vector::{VectorFeature, VectorLayer};

/// Neighbourhood that joins pixels into one region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    /// Edge neighbours only
    #[default]
    Four,
    /// Edge and corner neighbours
    Eight,
}

impl FromStr for Connectivity {
    type Err = RasterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "4" => Ok(Connectivity::Four),
            "8" => Ok(Connectivity::Eight),
            other => Err(RasterError::config(format!("Connectivity must be 4 or 8, got {}", other))),
        }
    }
}

impl TryFrom<u8> for Connectivity {
    type Error = RasterError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        value.to_string().parse()
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connectivity::Four => write!(f, "4"),
            Connectivity::Eight => write!(f, "8"),
        }
    }
}

/// Decides which region values are kept
///
/// The default keeps strictly positive values, treating zero and negative
/// values as background.
#[derive(Clone)]
pub struct ValueFilter {
    name: String,
    predicate: Arc<dyn Fn(i64) -> bool + Send + Sync>,
}

impl ValueFilter {
    pub fn positive() -> Self {
        Self::greater_than(0)
    }

    pub fn greater_than(threshold: i64) -> Self {
        ValueFilter {
            name: format!("value > {}", threshold),
            predicate: Arc::new(move |value| value > threshold),
        }
    }

    pub fn all() -> Self {
        ValueFilter {
            name: "all values".to_string(),
            predicate: Arc::new(|_| true),
        }
    }

    pub fn from_fn(name: &str, predicate: impl Fn(i64) -> bool + Send + Sync + 'static) -> Self {
        ValueFilter {
            name: name.to_string(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn keeps(&self, value: i64) -> bool {
        (self.predicate)(value)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for ValueFilter {
    fn default() -> Self {
        Self::positive()
    }
}

impl fmt::Debug for ValueFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ValueFilter").field(&self.name).finish()
    }
}

/// Settings of one vectorization run
#[derive(Debug, Clone, Default)]
pub struct VectorizeOptions {
    pub connectivity: Connectivity,
    pub filter: ValueFilter,
    /// One entry per source pixel; `false` pixels belong to no region
    pub mask: Option<Vec<bool>>,
    /// Shrink the raster by this factor before labelling
    pub downsample: Option<(f64, Resampling)>,
}

impl VectorizeOptions {
    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn with_filter(mut self, filter: ValueFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_mask(mut self, mask: Vec<bool>) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn with_downsample(mut self, factor: f64, method: Resampling) -> Self {
        self.downsample = Some((factor, method));
        self
    }
}

/// A connected set of equal-valued pixels
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub value: i64,
    pub geometry: Polygon<f64>,
    pub pixel_count: usize,
}

/// Regions in scan order of their first pixel
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegionCollection {
    pub regions: Vec<Region>,
    pub crs: CoordinateSystem,
}

impl RegionCollection {
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Region> {
        self.regions.iter()
    }

    pub fn to_layer(&self) -> VectorLayer {
        let mut layer = VectorLayer::new(self.crs.clone());
        for region in &self.regions {
            layer.push(VectorFeature::new(region.geometry.clone()).with_property("value", region.value));
        }
        layer
    }

    /// Writes the regions with their `value` as GeoJSON
    pub fn save(&self, path: impl AsRef<Path>) -> RasterResult<()> {
        let path = path.as_ref();
        self.to_layer().save(path)?;
        info!("Saved {} polygons to {}", self.len(), path.display());
        Ok(())
    }
}

/// Truncates samples toward zero; NaN becomes 0
///
/// Returns the integers and the number of samples that had a fractional part.
fn truncate_samples(samples: &[f64]) -> (Vec<i64>, usize) {
    let mut fractional = 0usize;
    let values = samples.iter()
        .map(|&v| {
            if v.is_finite() && v.fract() != 0.0 {
                fractional += 1;
            }
            v as i64
        })
        .collect();
    (values, fractional)
}

fn downsample_mask(mask: &[bool], width: usize, height: usize, factor: f64) -> RasterResult<Vec<bool>> {
    let data = mask.iter().map(|&keep| if keep { 1.0 } else { 0.0 }).collect();
    let raster = Raster::from_data(width, height, 1, SampleType::U8, data)?;
    let small = downsample(&raster, factor, Resampling::Nearest)?;
    Ok(small.data.iter().map(|&v| v > 0.0).collect())
}

fn ring_to_world(ring: &Ring, transform: &GeoTransform) -> LineString<f64> {
    let mut coords: Vec<Coord<f64>> = ring.vertices.iter()
        .map(|&(col, row)| {
            let (x, y) = transform.apply(col as f64, row as f64);
            Coord { x, y }
        })
        .collect();
    if let Some(&first) = coords.first() {
        coords.push(first);
    }
    LineString::from(coords)
}

/// Polygonizes the single band of `raster`
pub fn vectorize(raster: &Raster, options: &VectorizeOptions) -> RasterResult<RegionCollection> {
    if raster.bands != 1 {
        return Err(RasterError::config(format!(
            "Vectorization needs a single-band raster, got {} bands", raster.bands
        )));
    }
    if raster.width == 0 || raster.height == 0 {
        return Err(RasterError::config("Cannot vectorize an empty raster"));
    }
    if let Some(mask) = &options.mask {
        if mask.len() != raster.width * raster.height {
            return Err(RasterError::config(format!(
                "Mask has {} entries for a {}x{} raster", mask.len(), raster.width, raster.height
            )));
        }
    }

    let (source, mask) = match options.downsample {
        Some((factor, method)) => {
            let small = downsample(raster, factor, method)?;
            info!("Downsampled {}x{} to {}x{} before vectorizing", raster.width, raster.height, small.width, small.height);
            let mask = match &options.mask {
                Some(mask) => Some(downsample_mask(mask, raster.width, raster.height, factor)?),
                None => None,
            };
            (std::borrow::Cow::Owned(small), mask)
        }
        None => (std::borrow::Cow::Borrowed(raster), options.mask.clone()),
    };

    let (values, fractional) = truncate_samples(&source.data);
    if fractional > 0 {
        info!("Truncated {} fractional samples toward zero before grouping", fractional);
    }

    let labels = label_regions(&values, source.width, source.height, mask.as_deref(), options.connectivity);
    let wanted: Vec<bool> = labels.values.iter().map(|&v| options.filter.keeps(v)).collect();
    debug!(
        "Labelled {} regions ({}-connected), {} pass {}",
        labels.region_count(), options.connectivity,
        wanted.iter().filter(|&&keep| keep).count(), options.filter.name()
    );

    let outlines = trace_regions(&labels, &wanted)?;
    let mut regions = Vec::new();
    for (index, outline) in outlines.into_iter().enumerate() {
        let Some(outline) = outline else { continue };
        let exterior = ring_to_world(&outline.exterior, &source.transform);
        let holes = outline.holes.iter().map(|ring| ring_to_world(ring, &source.transform)).collect();
        regions.push(Region {
            value: labels.values[index],
            geometry: Polygon::new(exterior, holes).orient(Direction::Default),
            pixel_count: labels.counts[index],
        });
    }

    info!("Vectorized {} regions from {}x{} pixels", regions.len(), source.width, source.height);
    Ok(RegionCollection { regions, crs: source.crs.clone() })
}

/// Opens a GeoTIFF and polygonizes its first band
pub fn vectorize_file(path: impl AsRef<Path>, options: &VectorizeOptions) -> RasterResult<RegionCollection> {
    let dataset = RasterDataset::open(path)?;
    if dataset.bands() > 1 {
        info!("Using band 1 of {}", dataset.bands());
    }
    let band = dataset.read_band(1)?;
    vectorize(&band, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    fn raster(width: usize, height: usize, data: Vec<f64>) -> Raster {
        Raster::from_data(width, height, 1, SampleType::F32, data)
            .unwrap()
            .with_transform(GeoTransform::from_origin(1000.0, 2000.0, 2.0, 2.0))
            .with_crs(CoordinateSystem::Epsg(21036))
    }

    #[test]
    fn test_uniform_raster_is_one_region() {
        let result = vectorize(&raster(5, 3, vec![4.0; 15]), &VectorizeOptions::default()).unwrap();

        assert_eq!(result.len(), 1);
        let region = &result.regions[0];
        assert_eq!(region.value, 4);
        assert_eq!(region.pixel_count, 15);
        assert_eq!(region.geometry.unsigned_area(), 15.0 * 4.0);
        assert_eq!(result.crs, CoordinateSystem::Epsg(21036));
    }

    #[test]
    fn test_background_only_is_empty() {
        let data = vec![0.0, -1.0, 0.0, -3.0];
        let result = vectorize(&raster(2, 2, data), &VectorizeOptions::default()).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_l_shape_is_single_region() {
        let data = vec![
            1.0, 0.0, 0.0,
            1.0, 0.0, 0.0,
            1.0, 1.0, 1.0,
        ];
        let result = vectorize(&raster(3, 3, data), &VectorizeOptions::default()).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.regions[0].value, 1);
        assert_eq!(result.regions[0].pixel_count, 5);
        assert_eq!(result.regions[0].geometry.exterior().0.len(), 7);
    }

    #[test]
    fn test_connectivity_on_diagonals() {
        let data = vec![
            2.0, 0.0,
            0.0, 2.0,
        ];
        let four = vectorize(&raster(2, 2, data.clone()), &VectorizeOptions::default()).unwrap();
        assert_eq!(four.len(), 2);

        let options = VectorizeOptions::default().with_connectivity(Connectivity::Eight);
        let eight = vectorize(&raster(2, 2, data), &options).unwrap();
        assert_eq!(eight.len(), 1);
        assert_eq!(eight.regions[0].geometry.unsigned_area(), 8.0);
    }

    #[test]
    fn test_hole_is_interior_ring() {
        let mut data = vec![3.0; 25];
        data[12] = 0.0;
        let result = vectorize(&raster(5, 5, data), &VectorizeOptions::default()).unwrap();

        let polygon = &result.regions[0].geometry;
        assert_eq!(polygon.interiors().len(), 1);
        assert_eq!(polygon.unsigned_area(), 24.0 * 4.0);
        assert_eq!(polygon.clone().orient(Direction::Default), *polygon);
    }

    #[test]
    fn test_hole_touching_notch_stays_interior() {
        let data = vec![
            1.0, 1.0, 0.0,
            1.0, 0.0, 1.0,
            1.0, 1.0, 1.0,
        ];
        let result = vectorize(&raster(3, 3, data), &VectorizeOptions::default()).unwrap();
        let polygon = &result.regions[0].geometry;

        assert_eq!(polygon.interiors().len(), 1);
        assert_eq!(polygon.unsigned_area(), 7.0 * 4.0);

        // Closed ring with no vertex visited twice
        let exterior = &polygon.exterior().0;
        let mut corners: Vec<(i64, i64)> = exterior[..exterior.len() - 1].iter()
            .map(|c| (c.x as i64, c.y as i64))
            .collect();
        let count = corners.len();
        corners.sort_unstable();
        corners.dedup();
        assert_eq!(corners.len(), count);
        assert_eq!(count, 6);
    }

    #[test]
    fn test_fractions_truncate_toward_zero() {
        let data = vec![1.9, 1.2, -0.7, 0.4];
        let result = vectorize(&raster(2, 2, data), &VectorizeOptions::default()).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.regions[0].value, 1);
        assert_eq!(result.regions[0].pixel_count, 2);
    }

    #[test]
    fn test_custom_filter_and_mask() {
        let data = vec![1.0, 2.0, 3.0, 0.0];
        let options = VectorizeOptions::default().with_filter(ValueFilter::all());
        assert_eq!(vectorize(&raster(4, 1, data.clone()), &options).unwrap().len(), 4);

        let options = VectorizeOptions::default()
            .with_filter(ValueFilter::from_fn("odd", |v| v % 2 == 1))
            .with_mask(vec![true, true, false, true]);
        let result = vectorize(&raster(4, 1, data), &options).unwrap();
        assert_eq!(result.iter().map(|r| r.value).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_mask_shape_is_checked() {
        let options = VectorizeOptions::default().with_mask(vec![true; 3]);
        assert!(vectorize(&raster(2, 2, vec![1.0; 4]), &options).is_err());
    }

    #[test]
    fn test_downsample_before_vectorizing() {
        let options = VectorizeOptions::default().with_downsample(2.0, Resampling::Nearest);
        let result = vectorize(&raster(4, 4, vec![5.0; 16]), &options).unwrap();

        assert_eq!(result.regions[0].pixel_count, 4);
        assert_eq!(result.regions[0].geometry.unsigned_area(), 64.0);
    }

    #[test]
    fn test_multi_band_is_rejected() {
        let multi = Raster::new(2, 2, 2, SampleType::U8);
        assert!(matches!(
            vectorize(&multi, &VectorizeOptions::default()),
            Err(RasterError::Configuration(_))
        ));
    }

    #[test]
    fn test_parse_connectivity() {
        assert_eq!("8".parse::<Connectivity>().unwrap(), Connectivity::Eight);
        assert_eq!(Connectivity::try_from(4).unwrap(), Connectivity::Four);
        assert!("6".parse::<Connectivity>().is_err());
    }
}
