use log::info;
use std::path::Path;

use crate::config::RunConfig;
use crate::error::{RasterError, RasterResult};
use crate::grid::{GridBuilder, TileCollection};
use crate::patch::{PatchExtractor, PatchReport, TileSource};
use crate::raster::RasterDataset;
use crate::utils::Logger;
use crate::vectorize::{vectorize_file, RegionCollection};

/// Main interface to the rastergrid library
///
/// Each operation opens the source raster itself, so one instance can serve
/// any number of inputs with the same configuration.
pub struct RasterGrid {
    config: RunConfig,
    logger: Logger,
}

impl RasterGrid {
    /// Create an instance that writes run summaries to the console
    pub fn new(config: RunConfig) -> Self {
        RasterGrid { config, logger: Logger::console() }
    }

    /// Write run summaries to `log_file` instead
    ///
    /// # Arguments
    /// * `log_file` - Path of the summary file, appended to if it exists
    pub fn with_log_file(config: RunConfig, log_file: impl AsRef<Path>) -> RasterResult<Self> {
        let path = log_file.as_ref();
        let logger = Logger::append(path).map_err(|e| RasterError::io(path, "open", e))?;
        Ok(Self::with_logger(config, logger))
    }

    /// Write run summaries through an existing logger
    pub fn with_logger(config: RunConfig, logger: Logger) -> Self {
        RasterGrid { config, logger }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    fn summary(&self, message: &str) {
        if let Err(e) = self.logger.log(message) {
            log::warn!("Could not write run summary: {}", e);
        }
    }

    /// Build the tile grid for a raster
    ///
    /// # Arguments
    /// * `input` - Source GeoTIFF
    /// * `output` - Optional GeoJSON file receiving the tile footprints
    ///
    /// # Returns
    /// The tiles in enumeration order
    pub fn generate_tiles(&self, input: impl AsRef<Path>, output: Option<&Path>) -> RasterResult<TileCollection> {
        let dataset = RasterDataset::open(input)?;
        let builder = GridBuilder::new(self.config.grid_config()?)?;
        let tiles = builder.build_for(&dataset)?;

        if let Some(path) = output {
            tiles.save(path)?;
        }
        self.summary(&format!(
            "grid: {} -> {} tiles of {} px",
            dataset.path().display(), tiles.len(), builder.config().tile_size
        ));
        Ok(tiles)
    }

    /// Crop a raster into patches under the footprints of `source`
    ///
    /// # Arguments
    /// * `input` - Source GeoTIFF
    /// * `source` - Tiles in memory or a GeoJSON file of footprints
    ///
    /// # Returns
    /// Counts of written, dropped and failed patches
    pub fn generate_patches(&self, input: impl AsRef<Path>, source: &TileSource) -> RasterResult<PatchReport> {
        let input = input.as_ref();
        let dataset = RasterDataset::open(input)?;
        let extractor = PatchExtractor::new(self.config.patch_config(input)?)?;
        let report = extractor.extract(&dataset, source)?;

        self.summary(&format!(
            "patches: {} -> {} written, {} dropped, {} failed",
            input.display(), report.written.len(), report.dropped, report.failed.len()
        ));
        Ok(report)
    }

    /// Grid a raster and crop it in one run
    pub fn tile(&self, input: impl AsRef<Path>, tiles_output: Option<&Path>) -> RasterResult<(TileCollection, PatchReport)> {
        let input = input.as_ref();
        let tiles = self.generate_tiles(input, tiles_output)?;
        let report = self.generate_patches(input, &TileSource::InMemory(tiles.clone()))?;
        Ok((tiles, report))
    }

    /// Polygonize the first band of a raster into a GeoJSON file
    ///
    /// # Arguments
    /// * `input` - Classified GeoTIFF
    /// * `output` - GeoJSON file receiving one feature per kept region
    pub fn raster_to_vector(&self, input: impl AsRef<Path>, output: impl AsRef<Path>) -> RasterResult<RegionCollection> {
        let input = input.as_ref();
        let options = self.config.vectorize_options()?;
        info!(
            "Vectorizing {} ({}-connected, keeping {})",
            input.display(), options.connectivity, options.filter.name()
        );

        let output = output.as_ref();
        let regions = vectorize_file(input, &options)?;
        regions.save(output)?;
        self.summary(&format!(
            "vectorize: {} -> {} ({} polygons)",
            input.display(), output.display(), regions.len()
        ));
        Ok(regions)
    }

    /// Describe a raster's structure and georeferencing
    pub fn info(&self, input: impl AsRef<Path>) -> RasterResult<String> {
        let dataset = RasterDataset::open(input)?;
        self.summary(&format!(
            "info: {} ({}x{}, {} band(s), {})",
            dataset.path().display(), dataset.width(), dataset.height(), dataset.bands(), dataset.crs()
        ));
        Ok(dataset.to_string())
    }
}
