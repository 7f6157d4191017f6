//! Pixel-space windows
//!
//! A window addresses a rectangular block of raster cells by its top-left
//! offset and size. Offsets are signed so that windows requested partly or
//! fully outside a raster can be represented and then clipped.

use geo_types::{Coord, LineString, Polygon};

use crate::coordinate::GeoTransform;

/// Rectangular pixel region: rows `row_off..row_off+height`, columns `col_off..col_off+width`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window {
    pub row_off: i64,
    pub col_off: i64,
    pub height: usize,
    pub width: usize,
}

impl Window {
    pub fn new(row_off: i64, col_off: i64, height: usize, width: usize) -> Self {
        Window { row_off, col_off, height, width }
    }

    /// The window covering a whole `width x height` raster
    pub fn full(width: usize, height: usize) -> Self {
        Window::new(0, 0, height, width)
    }

    /// Row just past the bottom edge (exclusive)
    pub fn end_row(&self) -> i64 {
        self.row_off + self.height as i64
    }

    /// Column just past the right edge (exclusive)
    pub fn end_col(&self) -> i64 {
        self.col_off + self.width as i64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Overlap of two windows, or `None` when they share no cell
    pub fn intersection(&self, other: &Window) -> Option<Window> {
        let row_start = self.row_off.max(other.row_off);
        let col_start = self.col_off.max(other.col_off);
        let row_end = self.end_row().min(other.end_row());
        let col_end = self.end_col().min(other.end_col());

        if row_end <= row_start || col_end <= col_start {
            return None;
        }

        Some(Window::new(
            row_start,
            col_start,
            (row_end - row_start) as usize,
            (col_end - col_start) as usize,
        ))
    }

    /// Whether any part of two windows covers the same cell
    pub fn overlaps(&self, other: &Window) -> bool {
        self.intersection(other).is_some()
    }

    /// World-space polygon of the window's outer edges
    ///
    /// Corners are visited top-left, top-right, bottom-right, bottom-left in
    /// pixel space; the ring is closed.
    pub fn footprint(&self, transform: &GeoTransform) -> Polygon<f64> {
        let top = self.row_off as f64;
        let left = self.col_off as f64;
        let bottom = self.end_row() as f64;
        let right = self.end_col() as f64;

        let corners = [(left, top), (right, top), (right, bottom), (left, bottom), (left, top)];
        let ring: Vec<Coord<f64>> = corners.iter()
            .map(|&(col, row)| {
                let (x, y) = transform.apply(col, row);
                Coord { x, y }
            })
            .collect();

        Polygon::new(LineString::from(ring), Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    #[test]
    fn test_intersection_clips_to_extent() {
        let extent = Window::full(300, 200);
        let edge = Window::new(128, 256, 128, 128);

        let clipped = edge.intersection(&extent).unwrap();
        assert_eq!(clipped, Window::new(128, 256, 72, 44));
    }

    #[test]
    fn test_disjoint_windows() {
        let a = Window::new(0, 0, 10, 10);
        let b = Window::new(0, 10, 10, 10);
        assert!(a.intersection(&b).is_none());
        assert!(!a.overlaps(&b));

        let outside = Window::new(-20, -20, 10, 10);
        assert!(outside.intersection(&Window::full(5, 5)).is_none());
    }

    #[test]
    fn test_footprint_area() {
        let transform = GeoTransform::from_origin(1000.0, 2000.0, 2.0, 2.0);
        let polygon = Window::new(1, 2, 3, 4).footprint(&transform);

        assert_eq!(polygon.unsigned_area(), 3.0 * 4.0 * 4.0);
        let first = polygon.exterior().0[0];
        assert_eq!((first.x, first.y), (1004.0, 1998.0));
    }
}
