//! Raster description command

use clap::ArgMatches;
use std::path::PathBuf;

use crate::api::RasterGrid;
use crate::commands::command_traits::Command;
use crate::commands::input_path;
use crate::config::RunConfig;
use crate::error::RasterResult;
use crate::utils::Logger;

pub struct InfoCommand<'a> {
    input: PathBuf,
    config: RunConfig,
    logger: &'a Logger,
}

impl<'a> InfoCommand<'a> {
    pub fn new(args: &ArgMatches, config: RunConfig, logger: &'a Logger) -> RasterResult<Self> {
        Ok(InfoCommand { input: input_path(args)?, config, logger })
    }
}

impl<'a> Command for InfoCommand<'a> {
    fn execute(&self) -> RasterResult<()> {
        let api = RasterGrid::with_logger(self.config.clone(), self.logger.clone());
        print!("{}", api.info(&self.input)?);
        Ok(())
    }
}
