//! Patch extraction command

use clap::ArgMatches;
use std::path::PathBuf;

use crate::api::RasterGrid;
use crate::commands::command_traits::Command;
use crate::commands::{apply_grid_args, apply_patch_args, input_path, optional_path};
use crate::config::RunConfig;
use crate::error::RasterResult;
use crate::patch::TileSource;
use crate::utils::Logger;

/// Crops a raster under existing tile footprints or a fresh grid
pub struct PatchesCommand<'a> {
    input: PathBuf,
    /// Footprint file; a grid is built on the fly without one
    tiles: Option<PathBuf>,
    config: RunConfig,
    logger: &'a Logger,
}

impl<'a> PatchesCommand<'a> {
    pub fn new(args: &ArgMatches, mut config: RunConfig, logger: &'a Logger) -> RasterResult<Self> {
        let input = input_path(args)?;
        apply_grid_args(args, &mut config);
        apply_patch_args(args, &mut config);

        let tiles = optional_path(args, "tiles");
        if tiles.is_none() {
            config.grid_config()?;
        }
        config.patch_config(&input)?;

        Ok(PatchesCommand { input, tiles, config, logger })
    }
}

impl<'a> Command for PatchesCommand<'a> {
    fn execute(&self) -> RasterResult<()> {
        let api = RasterGrid::with_logger(self.config.clone(), self.logger.clone());
        match &self.tiles {
            Some(path) => {
                api.generate_patches(&self.input, &TileSource::FromFile(path.clone()))?;
            }
            None => {
                api.tile(&self.input, None)?;
            }
        }
        Ok(())
    }
}
