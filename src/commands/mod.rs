//! CLI command implementations
//!
//! One command per subcommand, created by [`RastergridCommandFactory`].
//! Command-line values override the matching `--config` entries.

pub mod cli;
pub mod command_traits;
pub mod grid_command;
pub mod info_command;
pub mod patches_command;
pub mod tile_command;
pub mod vectorize_command;

pub use cli::build_cli;
pub use command_traits::{Command, CommandFactory};
pub use grid_command::GridCommand;
pub use info_command::InfoCommand;
pub use patches_command::PatchesCommand;
pub use tile_command::TileCommand;
pub use vectorize_command::VectorizeCommand;

use clap::ArgMatches;
use std::path::PathBuf;

use crate::config::RunConfig;
use crate::error::{RasterError, RasterResult};
use crate::utils::Logger;

/// Factory for creating command instances based on CLI arguments
pub struct RastergridCommandFactory;

impl RastergridCommandFactory {
    pub fn new() -> Self {
        RastergridCommandFactory
    }
}

impl Default for RastergridCommandFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> CommandFactory<'a> for RastergridCommandFactory {
    fn create_command(&self, args: &ArgMatches, config: RunConfig, logger: &'a Logger) -> RasterResult<Box<dyn Command + 'a>> {
        match args.subcommand() {
            Some(("grid", sub)) => Ok(Box::new(GridCommand::new(sub, config, logger)?)),
            Some(("patches", sub)) => Ok(Box::new(PatchesCommand::new(sub, config, logger)?)),
            Some(("tile", sub)) => Ok(Box::new(TileCommand::new(sub, config, logger)?)),
            Some(("vectorize", sub)) => Ok(Box::new(VectorizeCommand::new(sub, config, logger)?)),
            Some(("info", sub)) => Ok(Box::new(InfoCommand::new(sub, config, logger)?)),
            Some((other, _)) => Err(RasterError::config(format!("Unknown command: {}", other))),
            None => Err(RasterError::config("No command given")),
        }
    }
}

pub(crate) fn input_path(args: &ArgMatches) -> RasterResult<PathBuf> {
    let input = args.get_one::<String>("input")
        .ok_or_else(|| RasterError::config("Missing input file"))?;
    let path = PathBuf::from(input);
    if !path.is_file() {
        return Err(RasterError::config(format!("Input file not found: {}", path.display())));
    }
    Ok(path)
}

pub(crate) fn optional_path(args: &ArgMatches, id: &str) -> Option<PathBuf> {
    args.get_one::<String>(id).map(PathBuf::from)
}

/// Applies `--label`, `--tile-size` and `--axis-order`
pub(crate) fn apply_grid_args(args: &ArgMatches, config: &mut RunConfig) {
    if let Some(label) = args.get_one::<String>("label") {
        config.grid.area_label = label.clone();
    }
    if let Some(&tile_size) = args.get_one::<usize>("tile-size") {
        config.grid.tile_size = tile_size;
    }
    if let Some(order) = args.get_one::<String>("axis-order") {
        config.grid.axis_order = order.clone();
    }
}

/// Applies `--output-dir`, `--image-name`, `--compression` and `--progress`
pub(crate) fn apply_patch_args(args: &ArgMatches, config: &mut RunConfig) {
    if let Some(dir) = optional_path(args, "output-dir") {
        config.patches.output_dir = Some(dir);
    }
    if let Some(name) = args.get_one::<String>("image-name") {
        config.patches.image_name = Some(name.clone());
    }
    if let Some(compression) = args.get_one::<String>("compression") {
        config.patches.compression = compression.clone();
    }
    if args.get_flag("progress") {
        config.patches.show_progress = true;
    }
}
