//! Logging and progress reporting helpers

pub mod logger;
mod progress;

pub use logger::Logger;
pub use progress::ProgressTracker;
