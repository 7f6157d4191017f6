//! Affine pixel-to-world transforms
//!
//! Follows the rasterio/affine convention:
//!
//! ```text
//! x = a * col + b * row + c
//! y = d * col + e * row + f
//! ```
//!
//! where `(col, row)` are continuous pixel coordinates with the top-left
//! corner of the top-left cell at `(0, 0)`.

use crate::error::{RasterError, RasterResult};

/// Affine transform mapping pixel coordinates to world coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl GeoTransform {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        GeoTransform { a, b, c, d, e, f }
    }

    pub fn identity() -> Self {
        GeoTransform::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0)
    }

    /// North-up transform from the top-left corner and positive pixel sizes
    pub fn from_origin(west: f64, north: f64, x_size: f64, y_size: f64) -> Self {
        GeoTransform::new(x_size, 0.0, west, 0.0, -y_size, north)
    }

    /// Builds a transform from GDAL's `[c, a, b, f, d, e]` ordering
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        GeoTransform::new(gt[1], gt[2], gt[0], gt[4], gt[5], gt[3])
    }

    /// Returns the GDAL `[c, a, b, f, d, e]` ordering
    pub fn to_gdal(&self) -> [f64; 6] {
        [self.c, self.a, self.b, self.f, self.d, self.e]
    }

    /// Maps pixel coordinates to world coordinates
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.e - self.b * self.d
    }

    /// World area covered by one pixel
    pub fn pixel_area(&self) -> f64 {
        self.determinant().abs()
    }

    /// True when the transform has no rotation or shear terms
    pub fn is_rectilinear(&self) -> bool {
        self.b == 0.0 && self.d == 0.0
    }

    /// Inverse transform mapping world coordinates back to pixel coordinates
    pub fn inverse(&self) -> RasterResult<GeoTransform> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return Err(RasterError::config(format!("Degenerate affine transform: {:?}", self)));
        }

        let ia = self.e / det;
        let ib = -self.b / det;
        let id = -self.d / det;
        let ie = self.a / det;

        Ok(GeoTransform::new(
            ia,
            ib,
            -ia * self.c - ib * self.f,
            id,
            ie,
            -id * self.c - ie * self.f,
        ))
    }

    /// Transform of a sub-raster whose top-left cell is `(col_off, row_off)` here
    pub fn translate(&self, col_off: f64, row_off: f64) -> GeoTransform {
        let (c, f) = self.apply(col_off, row_off);
        GeoTransform::new(self.a, self.b, c, self.d, self.e, f)
    }

    /// Transform of a resampled raster whose pixels are `sx` by `sy` source pixels
    pub fn scale(&self, sx: f64, sy: f64) -> GeoTransform {
        GeoTransform::new(self.a * sx, self.b * sy, self.c, self.d * sx, self.e * sy, self.f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_and_inverse_round_trip() {
        let transform = GeoTransform::new(0.5, 0.1, 300000.0, -0.2, -0.5, 9000000.0);
        let inverse = transform.inverse().unwrap();

        let (x, y) = transform.apply(17.0, 42.0);
        let (col, row) = inverse.apply(x, y);
        assert!((col - 17.0).abs() < 1e-6);
        assert!((row - 42.0).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_transform_has_no_inverse() {
        let flat = GeoTransform::new(1.0, 2.0, 0.0, 2.0, 4.0, 0.0);
        assert!(matches!(flat.inverse(), Err(RasterError::Configuration(_))));
    }

    #[test]
    fn test_translate_moves_origin() {
        let transform = GeoTransform::from_origin(100.0, 200.0, 10.0, 10.0);
        let shifted = transform.translate(3.0, 2.0);
        assert_eq!(shifted.c, 130.0);
        assert_eq!(shifted.f, 180.0);
        assert_eq!(shifted.a, 10.0);
        assert_eq!(shifted.e, -10.0);
    }

    #[test]
    fn test_scale_for_downsampling() {
        let transform = GeoTransform::from_origin(0.0, 0.0, 1.0, 1.0);
        let coarse = transform.scale(20.0, 20.0);
        assert_eq!(coarse.apply(1.0, 1.0), (20.0, -20.0));
        assert_eq!(coarse.pixel_area(), 400.0);
    }

    #[test]
    fn test_gdal_ordering() {
        let gt = [500000.0, 10.0, 0.0, 4000000.0, 0.0, -10.0];
        let transform = GeoTransform::from_gdal(gt);
        assert_eq!(transform, GeoTransform::from_origin(500000.0, 4000000.0, 10.0, 10.0));
        assert_eq!(transform.to_gdal(), gt);
    }
}
