//! Regular tile grids over a raster
//!
//! The grid builder walks a raster's pixel grid in steps of the tile size and
//! emits one [`Tile`] per step, each with a stable identifier derived from the
//! area label and its enumeration index.

mod collection;

pub use collection::TileCollection;

/// Area label used when none is configured
pub const DEFAULT_AREA_LABEL: &str = "grid";

use geo_types::Polygon;
use log::{debug, info};
use std::fmt;
use std::str::FromStr;

use crate::coordinate::{CoordinateSystem, GeoTransform};
use crate::error::{RasterError, RasterResult};
use crate::raster::{RasterDataset, Window};

pub const DEFAULT_TILE_SIZE: usize = 256;

/// Which loop variable becomes the row offset of each window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AxisOrder {
    /// Outer loop over rows, inner loop over columns
    #[default]
    RowMajor,
    /// Outer loop over `0..height` used as the column offset, inner loop over
    /// `0..width` used as the row offset. Reproduces tile artifacts generated
    /// by older tooling.
    Swapped,
}

impl FromStr for AxisOrder {
    type Err = RasterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "row_major" | "rowmajor" => Ok(AxisOrder::RowMajor),
            "swapped" | "legacy" => Ok(AxisOrder::Swapped),
            other => Err(RasterError::config(format!("Unknown axis order: {}", other))),
        }
    }
}

impl fmt::Display for AxisOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisOrder::RowMajor => write!(f, "row_major"),
            AxisOrder::Swapped => write!(f, "swapped"),
        }
    }
}

/// Parameters of a tile grid
#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    pub tile_size: usize,
    /// Free-form area name; tile ids are derived from it
    pub area_label: String,
    pub axis_order: AxisOrder,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            tile_size: DEFAULT_TILE_SIZE,
            area_label: DEFAULT_AREA_LABEL.to_string(),
            axis_order: AxisOrder::default(),
        }
    }
}

impl GridConfig {
    pub fn new(area_label: &str, tile_size: usize) -> Self {
        GridConfig {
            tile_size,
            area_label: area_label.to_string(),
            ..Default::default()
        }
    }

    pub fn with_axis_order(mut self, axis_order: AxisOrder) -> Self {
        self.axis_order = axis_order;
        self
    }

    pub fn validate(&self) -> RasterResult<()> {
        if self.tile_size == 0 {
            return Err(RasterError::config("Tile size must be positive"));
        }
        Ok(())
    }

    /// Lower-cased label with spaces replaced by underscores
    pub fn id_prefix(&self) -> String {
        self.area_label.to_lowercase().replace(' ', "_")
    }

    pub fn tile_id(&self, index: usize) -> String {
        format!("{}-{}", self.id_prefix(), index)
    }
}

/// One cell of the grid
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    /// Position in enumeration order
    pub index: usize,
    pub id: String,
    /// Full requested window, possibly reaching past the raster edge
    pub window: Window,
    /// World polygon of the window clipped to the raster
    pub footprint: Polygon<f64>,
}

/// Builds tile grids for a validated [`GridConfig`]
#[derive(Debug, Clone)]
pub struct GridBuilder {
    config: GridConfig,
}

impl GridBuilder {
    pub fn new(config: GridConfig) -> RasterResult<Self> {
        config.validate()?;
        Ok(GridBuilder { config })
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Enumerates the `tile_size` windows over a `width x height` raster
    pub fn windows(&self, width: usize, height: usize) -> RasterResult<Vec<Window>> {
        if width == 0 || height == 0 {
            return Err(RasterError::config(format!(
                "Raster dimensions must be positive, got {}x{}", width, height
            )));
        }

        let size = self.config.tile_size;
        let mut windows = Vec::with_capacity(width.div_ceil(size) * height.div_ceil(size));
        match self.config.axis_order {
            AxisOrder::RowMajor => {
                for row in (0..height).step_by(size) {
                    for col in (0..width).step_by(size) {
                        windows.push(Window::new(row as i64, col as i64, size, size));
                    }
                }
            }
            AxisOrder::Swapped => {
                for outer in (0..height).step_by(size) {
                    for inner in (0..width).step_by(size) {
                        windows.push(Window::new(inner as i64, outer as i64, size, size));
                    }
                }
            }
        }
        Ok(windows)
    }

    /// Builds the tiles for a raster of the given shape and georeferencing
    pub fn build(
        &self,
        width: usize,
        height: usize,
        transform: &GeoTransform,
        crs: &CoordinateSystem,
    ) -> RasterResult<TileCollection> {
        let windows = self.windows(width, height)?;
        let extent = Window::full(width, height);
        debug!(
            "Building {} tiles of {} px over {}x{} ({})",
            windows.len(), self.config.tile_size, width, height, self.config.axis_order
        );

        let tiles = windows.into_iter()
            .enumerate()
            .map(|(index, window)| Tile {
                index,
                id: self.config.tile_id(index),
                window,
                footprint: clipped_footprint(&window, &extent, transform),
            })
            .collect::<Vec<_>>();

        info!("Generated {} tiles labelled '{}'", tiles.len(), self.config.id_prefix());
        Ok(TileCollection::new(tiles, crs.clone()))
    }

    pub fn build_for(&self, dataset: &RasterDataset) -> RasterResult<TileCollection> {
        self.build(dataset.width(), dataset.height(), dataset.transform(), dataset.crs())
    }
}

/// Footprint of the part of `window` inside `extent`
///
/// Windows entirely outside the raster keep their unclipped footprint.
fn clipped_footprint(window: &Window, extent: &Window, transform: &GeoTransform) -> Polygon<f64> {
    window.intersection(extent)
        .unwrap_or(*window)
        .footprint(transform)
}
