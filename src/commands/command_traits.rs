//! Command pattern interfaces
//!
//! Each subcommand is parsed into a [`Command`] object up front, so argument
//! and configuration errors surface before any file is touched.

use crate::config::RunConfig;
use crate::error::RasterResult;
use crate::utils::Logger;

/// Represents an executable command in the application
pub trait Command {
    /// Execute the command
    fn execute(&self) -> RasterResult<()>;
}

/// Factory for creating commands from CLI arguments
pub trait CommandFactory<'a> {
    /// Create the command selected on the command line
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    /// * `config` - Run configuration loaded from `--config`, before CLI overrides
    /// * `logger` - Logger receiving run summaries
    fn create_command(&self, args: &clap::ArgMatches, config: RunConfig, logger: &'a Logger) -> RasterResult<Box<dyn Command + 'a>>;
}
