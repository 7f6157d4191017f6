//! Coordinate handling for geospatial data
//!
//! Affine pixel/world transforms, bounding boxes and coordinate reference
//! system identifiers.

mod bbox;
mod transform;
mod crs;

// Re-export key types
pub use self::bbox::BoundingBox;
pub use self::transform::GeoTransform;
pub use self::crs::{CoordinateSystem, CoordinateSystemFactory};
