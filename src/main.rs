use log::{error, Level};
use std::path::PathBuf;
use std::process;

use rastergrid::commands::{build_cli, CommandFactory, RastergridCommandFactory};
use rastergrid::config::RunConfig;
use rastergrid::utils::logger::Logger;

fn main() {
    let matches = build_cli().get_matches();
    let sub = matches.subcommand().map(|(_, sub)| sub).unwrap_or(&matches);

    let log_file = sub.get_one::<String>("log-file").map(PathBuf::from);
    let level = if sub.get_flag("verbose") { Level::Debug } else { Level::Info };
    if let Err(e) = Logger::init_global_logger(log_file.as_deref(), level) {
        eprintln!("Error setting up global logger: {}", e);
        process::exit(1);
    }

    // Run summaries share the log file with the global logger
    let logger = match &log_file {
        Some(path) => match Logger::append(path) {
            Ok(logger) => logger,
            Err(e) => {
                eprintln!("Error opening log file {}: {}", path.display(), e);
                process::exit(1);
            }
        },
        None => Logger::console(),
    };

    let config_path = sub.get_one::<String>("config").map(PathBuf::from);
    let config = match RunConfig::load_or_default(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let factory = RastergridCommandFactory::new();
    match factory.create_command(&matches, config, &logger) {
        Ok(command) => {
            if let Err(e) = command.execute() {
                error!("Command execution error: {}", e);
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
        Err(e) => {
            error!("Failed to create command: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
}
