//! Error types shared by the grid, patch and vectorize pipelines

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while tiling, cropping or vectorizing rasters
///
/// Undersized patches and empty vectorization results are not errors; they
/// surface as counts in `PatchReport` and as empty collections.
#[derive(Debug, Error)]
pub enum RasterError {
    /// Invalid dimensions, tile size, label, path or option value
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// I/O failure with the path and operation that triggered it
    #[error("Failed to {operation} {}: {source}", path.display())]
    Io {
        path: PathBuf,
        operation: &'static str,
        #[source]
        source: io::Error,
    },

    /// I/O failure inside an already opened stream
    #[error("I/O error: {0}")]
    Stream(#[from] io::Error),

    #[error("Invalid TIFF header")]
    InvalidHeader,

    #[error("Invalid byte order marker: {0:#06x}")]
    InvalidByteOrder(u16),

    #[error("Unsupported TIFF version: {0}")]
    UnsupportedVersion(u16),

    #[error("Tag not found: {0}")]
    TagNotFound(u16),

    #[error("Unsupported field type: {0}")]
    UnsupportedFieldType(u16),

    #[error("Unsupported compression method: {0}")]
    UnsupportedCompression(u16),

    #[error("Unsupported sample layout: {0}")]
    UnsupportedSampleFormat(String),

    #[error("Image dimensions not found")]
    MissingDimensions,

    /// Well-formed JSON that is not a usable feature collection
    #[error("Vector data error: {0}")]
    Vector(String),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Generic(String),
}

impl RasterError {
    /// Wraps an I/O error with the path and operation it belongs to
    pub fn io(path: impl AsRef<Path>, operation: &'static str, source: io::Error) -> Self {
        RasterError::Io {
            path: path.as_ref().to_path_buf(),
            operation,
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        RasterError::Configuration(message.into())
    }
}

impl From<String> for RasterError {
    fn from(msg: String) -> Self {
        RasterError::Generic(msg)
    }
}

/// Result type for raster operations
pub type RasterResult<T> = Result<T, RasterError>;
