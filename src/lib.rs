pub mod api;
pub mod commands;
pub mod compression;
pub mod config;
pub mod coordinate;
pub mod error;
pub mod grid;
pub mod io;
pub mod patch;
pub mod raster;
pub mod tiff;
pub mod utils;
pub mod vector;
pub mod vectorize;

pub use crate::api::RasterGrid;
pub use crate::error::{RasterError, RasterResult};

pub use config::RunConfig;
pub use coordinate::{BoundingBox, CoordinateSystem, GeoTransform};
pub use grid::{AxisOrder, GridBuilder, GridConfig, Tile, TileCollection};
pub use patch::{PatchConfig, PatchExtractor, PatchReport, TileSource};
pub use raster::{Raster, RasterDataset, Window};
pub use vectorize::{vectorize, Connectivity, Region, RegionCollection, ValueFilter, VectorizeOptions};
