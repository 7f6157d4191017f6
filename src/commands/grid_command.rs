//! Tile grid command

use clap::ArgMatches;
use std::path::PathBuf;

use crate::api::RasterGrid;
use crate::commands::command_traits::Command;
use crate::commands::{apply_grid_args, input_path, optional_path};
use crate::config::RunConfig;
use crate::error::{RasterError, RasterResult};
use crate::utils::Logger;

/// Builds the tile grid of a raster and saves the footprints
pub struct GridCommand<'a> {
    input: PathBuf,
    output: PathBuf,
    config: RunConfig,
    logger: &'a Logger,
}

impl<'a> GridCommand<'a> {
    pub fn new(args: &ArgMatches, mut config: RunConfig, logger: &'a Logger) -> RasterResult<Self> {
        let input = input_path(args)?;
        apply_grid_args(args, &mut config);
        config.grid_config()?;

        let output = optional_path(args, "output")
            .or_else(|| config.grid.output.clone())
            .ok_or_else(|| RasterError::config("No output file for the tile grid (use --output)"))?;

        Ok(GridCommand { input, output, config, logger })
    }
}

impl<'a> Command for GridCommand<'a> {
    fn execute(&self) -> RasterResult<()> {
        let api = RasterGrid::with_logger(self.config.clone(), self.logger.clone());
        api.generate_tiles(&self.input, Some(&self.output))?;
        Ok(())
    }
}
