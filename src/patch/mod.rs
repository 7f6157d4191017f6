//! Patch extraction
//!
//! Crops the source raster once per tile footprint and keeps only crops that
//! come out exactly `tile_size` pixels square. Edge tiles that run past the
//! raster and footprints that miss it entirely are counted as dropped; a tile
//! that fails to read or write is recorded and the batch moves on.

use geo::{Area, Contains};
use geo_types::{Point, Polygon};
use log::{debug, info, warn};
use std::path::PathBuf;

use crate::compression::{CompressionFactory, CompressionHandler};
use crate::coordinate::BoundingBox;
use crate::error::{RasterError, RasterResult};
use crate::grid::{TileCollection, DEFAULT_TILE_SIZE};
use crate::raster::{write_geotiff, Raster, RasterDataset, Window};
use crate::utils::ProgressTracker;
use crate::vector::VectorLayer;

/// Where the tile footprints come from
#[derive(Debug, Clone)]
pub enum TileSource {
    InMemory(TileCollection),
    /// A GeoJSON file written by [`TileCollection::save`] or any polygon layer
    FromFile(PathBuf),
}

impl TileSource {
    /// Footprints in source order
    pub fn resolve(&self) -> RasterResult<Vec<Polygon<f64>>> {
        match self {
            TileSource::InMemory(tiles) => Ok(tiles.footprints()),
            TileSource::FromFile(path) => {
                if !path.exists() {
                    return Err(RasterError::config(format!("Tile file not found: {}", path.display())));
                }
                Ok(VectorLayer::load(path)?.polygons())
            }
        }
    }
}

impl From<TileCollection> for TileSource {
    fn from(tiles: TileCollection) -> Self {
        TileSource::InMemory(tiles)
    }
}

/// Output settings for a patch run
#[derive(Debug, Clone, PartialEq)]
pub struct PatchConfig {
    pub tile_size: usize,
    /// Stem of every patch file name
    pub image_name: String,
    pub output_dir: PathBuf,
    /// Compression name understood by [`CompressionFactory::get_handler_by_name`]
    pub compression: String,
    pub show_progress: bool,
}

impl PatchConfig {
    pub fn new(image_name: &str, output_dir: impl Into<PathBuf>) -> Self {
        PatchConfig {
            tile_size: DEFAULT_TILE_SIZE,
            image_name: image_name.to_string(),
            output_dir: output_dir.into(),
            compression: "none".to_string(),
            show_progress: false,
        }
    }

    pub fn with_tile_size(mut self, tile_size: usize) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_compression(mut self, compression: &str) -> Self {
        self.compression = compression.to_string();
        self
    }

    pub fn validate(&self) -> RasterResult<()> {
        if self.tile_size == 0 {
            return Err(RasterError::config("Tile size must be positive"));
        }
        if self.image_name.trim().is_empty() {
            return Err(RasterError::config("Image name must not be empty"));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(RasterError::config("Output directory must be set"));
        }
        Ok(())
    }

    /// `{output_dir}/{image_name}_{index}.tif`
    pub fn patch_path(&self, index: usize) -> PathBuf {
        self.output_dir.join(format!("{}_{}.tif", self.image_name, index))
    }
}

/// What happened to each footprint of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchReport {
    pub written: Vec<PathBuf>,
    /// Crops that were not exactly `tile_size` square, including empty ones
    pub dropped: usize,
    /// Footprint index and error message of tiles that failed
    pub failed: Vec<(usize, String)>,
}

impl PatchReport {
    pub fn total(&self) -> usize {
        self.written.len() + self.dropped + self.failed.len()
    }
}

enum PatchOutcome {
    Written(PathBuf),
    Dropped,
}

/// Crops and writes patches for one source raster
pub struct PatchExtractor {
    config: PatchConfig,
    compression: Box<dyn CompressionHandler>,
}

impl PatchExtractor {
    pub fn new(config: PatchConfig) -> RasterResult<Self> {
        config.validate()?;
        let compression = CompressionFactory::get_handler_by_name(&config.compression)?;
        Ok(PatchExtractor { config, compression })
    }

    pub fn config(&self) -> &PatchConfig {
        &self.config
    }

    /// Resolves `source` and crops `dataset` under every footprint
    pub fn extract(&self, dataset: &RasterDataset, source: &TileSource) -> RasterResult<PatchReport> {
        let footprints = source.resolve()?;
        self.extract_footprints(dataset, &footprints)
    }

    pub fn extract_footprints(&self, dataset: &RasterDataset, footprints: &[Polygon<f64>]) -> RasterResult<PatchReport> {
        let out_dir = &self.config.output_dir;
        std::fs::create_dir_all(out_dir).map_err(|e| RasterError::io(out_dir, "create directory", e))?;

        info!(
            "Extracting up to {} patches of {} px from {} into {}",
            footprints.len(), self.config.tile_size, dataset.path().display(), out_dir.display()
        );

        let progress = self.config.show_progress
            .then(|| ProgressTracker::new(footprints.len() as u64, "Extracting patches"));

        let mut report = PatchReport::default();
        for (index, footprint) in footprints.iter().enumerate() {
            match self.extract_one(dataset, index, footprint) {
                Ok(PatchOutcome::Written(path)) => report.written.push(path),
                Ok(PatchOutcome::Dropped) => report.dropped += 1,
                Err(e) => {
                    warn!("Patch {} failed: {}", index, e);
                    report.failed.push((index, e.to_string()));
                }
            }
            if let Some(progress) = &progress {
                progress.increment(1);
            }
        }

        if let Some(progress) = &progress {
            progress.finish();
        }
        info!(
            "Wrote {} patches, dropped {} undersized, {} failed",
            report.written.len(), report.dropped, report.failed.len()
        );
        Ok(report)
    }

    fn extract_one(&self, dataset: &RasterDataset, index: usize, footprint: &Polygon<f64>) -> RasterResult<PatchOutcome> {
        let requested = BoundingBox::from_polygon(footprint)?.to_window(dataset.transform())?;
        let window = match requested.intersection(&dataset.extent()) {
            Some(window) => window,
            None => {
                debug!("Patch {}: footprint misses the raster", index);
                return Ok(PatchOutcome::Dropped);
            }
        };

        let size = self.config.tile_size;
        if window.width != size || window.height != size {
            debug!("Patch {}: crop is {}x{}, not {}x{}", index, window.width, window.height, size, size);
            return Ok(PatchOutcome::Dropped);
        }

        let mut patch = dataset.read_window(&window)?;
        mask_outside(&mut patch, footprint, &window);

        let path = self.config.patch_path(index);
        write_geotiff(&patch, &path, self.compression.as_ref())?;
        debug!("Patch {}: wrote {}", index, path.display());
        Ok(PatchOutcome::Written(path))
    }
}

/// Sets pixels whose centres fall outside a non-rectangular footprint to nodata
fn mask_outside(patch: &mut Raster, footprint: &Polygon<f64>, window: &Window) {
    let crop_area = Window::full(window.width, window.height).footprint(&patch.transform).unsigned_area();
    if (footprint.unsigned_area() - crop_area).abs() <= crop_area * 1e-9 {
        return;
    }

    let nodata = patch.metadata.nodata.unwrap_or(0.0);
    let mut masked = 0usize;
    for row in 0..patch.height {
        for col in 0..patch.width {
            let (x, y) = patch.transform.apply(col as f64 + 0.5, row as f64 + 0.5);
            if !footprint.contains(&Point::new(x, y)) {
                for band in 0..patch.bands {
                    patch.set(band, row, col, nodata);
                }
                masked += 1;
            }
        }
    }
    debug!("Masked {} pixels outside the footprint", masked);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::{CoordinateSystem, GeoTransform};
    use crate::grid::{GridBuilder, GridConfig};
    use crate::raster::{RasterMetadata, SampleType};
    use crate::compression::UncompressedHandler;
    use geo_types::polygon;
    use std::path::Path;

    fn source(dir: &Path, width: usize, height: usize) -> RasterDataset {
        let data = (0..width * height).map(|v| (v % 200) as f64 + 1.0).collect();
        let raster = Raster::from_data(width, height, 1, SampleType::U8, data)
            .unwrap()
            .with_transform(GeoTransform::from_origin(0.0, height as f64, 1.0, 1.0))
            .with_crs(CoordinateSystem::Epsg(32737));
        let path = dir.join("source.tif");
        write_geotiff(&raster, &path, &UncompressedHandler).unwrap();
        RasterDataset::open(&path).unwrap()
    }

    fn tiles(dataset: &RasterDataset, size: usize) -> TileCollection {
        GridBuilder::new(GridConfig::new("test", size)).unwrap().build_for(dataset).unwrap()
    }

    #[test]
    fn test_exact_multiple_keeps_every_patch() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = source(dir.path(), 8, 8);
        let extractor = PatchExtractor::new(
            PatchConfig::new("scene", dir.path().join("patches")).with_tile_size(4)
        ).unwrap();

        let report = extractor.extract(&dataset, &tiles(&dataset, 4).into()).unwrap();
        assert_eq!(report.written.len(), 4);
        assert_eq!(report.dropped, 0);
        assert!(report.failed.is_empty());
        assert_eq!(report.written[3], dir.path().join("patches").join("scene_3.tif"));

        let patch = RasterDataset::open(&report.written[3]).unwrap();
        assert_eq!((patch.width(), patch.height()), (4, 4));
        assert_eq!(patch.crs(), &CoordinateSystem::Epsg(32737));
        assert_eq!(patch.transform().apply(0.0, 0.0), (4.0, 4.0));
        assert_eq!(patch.read().unwrap().get(0, 0, 0), Some(37.0));
    }

    #[test]
    fn test_edge_tiles_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = source(dir.path(), 10, 6);
        let extractor = PatchExtractor::new(
            PatchConfig::new("scene", dir.path().join("out")).with_tile_size(4)
        ).unwrap();

        let report = extractor.extract(&dataset, &tiles(&dataset, 4).into()).unwrap();
        assert_eq!(report.total(), 6);
        assert_eq!(report.written.len(), 2);
        assert_eq!(report.dropped, 4);
        assert!(report.written.iter().all(|path| RasterDataset::open(path).unwrap().width() == 4));
    }

    #[test]
    fn test_footprint_outside_raster_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = source(dir.path(), 8, 8);
        let extractor = PatchExtractor::new(PatchConfig::new("scene", dir.path()).with_tile_size(4)).unwrap();

        let far_away = polygon![(x: 100.0, y: 100.0), (x: 104.0, y: 100.0), (x: 104.0, y: 104.0), (x: 100.0, y: 104.0)];
        let report = extractor.extract_footprints(&dataset, &[far_away]).unwrap();
        assert_eq!(report, PatchReport { dropped: 1, ..Default::default() });
    }

    #[test]
    fn test_triangle_footprint_masks_outside_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = source(dir.path(), 8, 8);
        let extractor = PatchExtractor::new(PatchConfig::new("tri", dir.path()).with_tile_size(4)).unwrap();

        let triangle = polygon![(x: 0.0, y: 8.0), (x: 4.0, y: 8.0), (x: 0.0, y: 4.0)];
        let report = extractor.extract_footprints(&dataset, &[triangle]).unwrap();
        let patch = RasterDataset::open(&report.written[0]).unwrap().read().unwrap();

        assert_eq!(patch.get(0, 0, 0), Some(1.0));
        assert_eq!(patch.get(0, 3, 3), Some(0.0));
    }

    #[test]
    fn test_failed_tile_does_not_stop_batch() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = source(dir.path(), 8, 8);
        let out = dir.path().join("out");
        let extractor = PatchExtractor::new(PatchConfig::new("x", &out).with_tile_size(4)).unwrap();

        // A directory where patch 1 should go makes its write fail
        std::fs::create_dir_all(out.join("x_1.tif")).unwrap();

        let report = extractor.extract(&dataset, &tiles(&dataset, 4).into()).unwrap();
        assert_eq!(report.written, vec![out.join("x_0.tif"), out.join("x_2.tif"), out.join("x_3.tif")]);
        assert_eq!(report.dropped, 0);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, 1);
        assert_eq!(report.total(), 4);
    }

    #[test]
    fn test_missing_tile_file() {
        let source = TileSource::FromFile(PathBuf::from("/nonexistent/tiles.geojson"));
        assert!(matches!(source.resolve(), Err(RasterError::Configuration(_))));
    }

    #[test]
    fn test_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PatchExtractor::new(PatchConfig::new("", dir.path())).is_err());
        assert!(PatchExtractor::new(PatchConfig::new("a", dir.path()).with_tile_size(0)).is_err());
        assert!(PatchExtractor::new(PatchConfig::new("a", dir.path()).with_compression("lzw")).is_err());
    }

    #[test]
    fn test_nodata_fills_masked_pixels() {
        let mut patch = Raster::from_data(2, 2, 1, SampleType::I16, vec![5.0; 4])
            .unwrap()
            .with_transform(GeoTransform::from_origin(0.0, 2.0, 1.0, 1.0))
            .with_metadata(RasterMetadata { nodata: Some(-1.0), ..Default::default() });
        let half = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 1.0), (x: 1.0, y: 1.0), (x: 1.0, y: 2.0), (x: 0.0, y: 2.0)];

        mask_outside(&mut patch, &half, &Window::full(2, 2));
        assert_eq!(patch.data, vec![5.0, -1.0, 5.0, 5.0]);
    }
}
