//! Application-wide logging
//!
//! The binary installs [`Logger`] as the `log` backend. Records go to the
//! console and, when a log file is configured, to that file as well. Commands
//! also write one-line run summaries through [`Logger::log`], which go to the
//! file when there is one and to stdout otherwise.

use log::{Level, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Clones share the same log file handle
#[derive(Clone)]
pub struct Logger {
    file: Arc<Mutex<Option<File>>>,
    level: Level,
}

impl Logger {
    /// Creates a logger writing to `log_file`, truncating it
    pub fn new(log_file: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(log_file.as_ref())?;
        Ok(Logger {
            file: Arc::new(Mutex::new(Some(file))),
            level: Level::Debug,
        })
    }

    /// Opens `log_file` for appending, creating it if needed
    pub fn append(log_file: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(log_file.as_ref())?;
        Ok(Logger {
            file: Arc::new(Mutex::new(Some(file))),
            level: Level::Debug,
        })
    }

    /// A logger without a file; records only reach the console
    pub fn console() -> Self {
        Logger {
            file: Arc::new(Mutex::new(None)),
            level: Level::Info,
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Writes one line to the log file, or to stdout without one
    pub fn log(&self, message: &str) -> io::Result<()> {
        if !self.write_file(message)? {
            println!("{}", message);
        }
        Ok(())
    }

    /// Returns whether there was a file to write to
    fn write_file(&self, message: &str) -> io::Result<bool> {
        let mut guard = self.file.lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
        match guard.as_mut() {
            Some(file) => {
                writeln!(file, "{}", message)?;
                file.flush()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Installs a logger as the global `log` backend
    pub fn init_global_logger(log_file: Option<&Path>, level: Level) -> io::Result<()> {
        let logger = match log_file {
            Some(path) => Logger::new(path)?,
            None => Logger::console(),
        }
        .with_level(level);

        if log::set_boxed_logger(Box::new(logger)).is_err() {
            eprintln!("Warning: Global logger was already initialized");
        }

        log::set_max_level(level.to_level_filter());
        Ok(())
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let message = format!("[{}] {}", record.level(), record.args());
            let _ = self.write_file(&message);
            println!("{}", message);
        }
    }

    fn flush(&self) {}
}
