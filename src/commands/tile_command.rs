//! Grid and patch extraction in one run

use clap::ArgMatches;
use std::path::PathBuf;

use crate::api::RasterGrid;
use crate::commands::command_traits::Command;
use crate::commands::{apply_grid_args, apply_patch_args, input_path, optional_path};
use crate::config::RunConfig;
use crate::error::RasterResult;
use crate::utils::Logger;

pub struct TileCommand<'a> {
    input: PathBuf,
    tiles_output: Option<PathBuf>,
    config: RunConfig,
    logger: &'a Logger,
}

impl<'a> TileCommand<'a> {
    pub fn new(args: &ArgMatches, mut config: RunConfig, logger: &'a Logger) -> RasterResult<Self> {
        let input = input_path(args)?;
        apply_grid_args(args, &mut config);
        apply_patch_args(args, &mut config);
        config.grid_config()?;
        config.patch_config(&input)?;

        Ok(TileCommand {
            tiles_output: optional_path(args, "tiles-output").or_else(|| config.grid.output.clone()),
            input,
            config,
            logger,
        })
    }
}

impl<'a> Command for TileCommand<'a> {
    fn execute(&self) -> RasterResult<()> {
        let api = RasterGrid::with_logger(self.config.clone(), self.logger.clone());
        api.tile(&self.input, self.tiles_output.as_deref())?;
        Ok(())
    }
}
