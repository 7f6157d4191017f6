//! Raster to polygon command

use clap::ArgMatches;
use std::path::PathBuf;

use crate::api::RasterGrid;
use crate::commands::command_traits::Command;
use crate::commands::{input_path, optional_path};
use crate::config::RunConfig;
use crate::error::{RasterError, RasterResult};
use crate::utils::Logger;

pub struct VectorizeCommand<'a> {
    input: PathBuf,
    output: PathBuf,
    config: RunConfig,
    logger: &'a Logger,
}

impl<'a> VectorizeCommand<'a> {
    pub fn new(args: &ArgMatches, mut config: RunConfig, logger: &'a Logger) -> RasterResult<Self> {
        let input = input_path(args)?;
        let output = optional_path(args, "output")
            .ok_or_else(|| RasterError::config("Missing output file"))?;

        let section = &mut config.vectorize;
        if let Some(connectivity) = args.get_one::<String>("connectivity") {
            section.connectivity = connectivity.parse()
                .map_err(|_| RasterError::config(format!("Invalid connectivity: {}", connectivity)))?;
        }
        if let Some(&min_value) = args.get_one::<i64>("min-value") {
            section.min_value = min_value;
        }
        if let Some(&factor) = args.get_one::<f64>("downsample") {
            section.downsample = Some(factor);
        }
        if let Some(method) = args.get_one::<String>("resampling") {
            section.resampling = method.clone();
        }
        config.vectorize_options()?;

        Ok(VectorizeCommand { input, output, config, logger })
    }
}

impl<'a> Command for VectorizeCommand<'a> {
    fn execute(&self) -> RasterResult<()> {
        let api = RasterGrid::with_logger(self.config.clone(), self.logger.clone());
        api.raster_to_vector(&self.input, &self.output)?;
        Ok(())
    }
}
