//! Bounding box structure for defining regions

use geo::BoundingRect;
use geo_types::{Coord, Point, Polygon, Rect};

use crate::coordinate::GeoTransform;
use crate::error::{RasterError, RasterResult};
use crate::raster::Window;

/// Slack applied before rounding world-derived pixel bounds, so that edges
/// landing a hair off a pixel boundary do not grow the window by a row or column
const PIXEL_TOLERANCE: f64 = 1e-6;

/// An axis-aligned bounding box in world coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum X coordinate
    pub min_x: f64,
    /// Minimum Y coordinate
    pub min_y: f64,
    /// Maximum X coordinate
    pub max_x: f64,
    /// Maximum Y coordinate
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        BoundingBox { min_x, min_y, max_x, max_y }
    }

    /// Envelope of a polygon; fails for an empty polygon
    pub fn from_polygon(polygon: &Polygon<f64>) -> RasterResult<Self> {
        let rect = polygon.bounding_rect()
            .ok_or_else(|| RasterError::Vector("Polygon has no coordinates".to_string()))?;
        Ok(Self::from(rect))
    }

    /// World envelope of a pixel window
    pub fn from_window(window: &Window, transform: &GeoTransform) -> Self {
        let corners = [
            (window.col_off as f64, window.row_off as f64),
            (window.end_col() as f64, window.row_off as f64),
            (window.end_col() as f64, window.end_row() as f64),
            (window.col_off as f64, window.end_row() as f64),
        ];
        let mut bbox = BoundingBox::new(f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (col, row) in corners {
            let (x, y) = transform.apply(col, row);
            bbox.min_x = bbox.min_x.min(x);
            bbox.min_y = bbox.min_y.min(y);
            bbox.max_x = bbox.max_x.max(x);
            bbox.max_y = bbox.max_y.max(y);
        }
        bbox
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point<f64> {
        Point::new(
            self.min_x + self.width() / 2.0,
            self.min_y + self.height() / 2.0,
        )
    }

    /// Check if this bounding box contains a point (edges included)
    pub fn contains(&self, point: &Point<f64>) -> bool {
        point.x() >= self.min_x && point.x() <= self.max_x &&
            point.y() >= self.min_y && point.y() <= self.max_y
    }

    /// True when the boxes share interior area
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x < other.max_x && other.min_x < self.max_x &&
            self.min_y < other.max_y && other.min_y < self.max_y
    }

    pub fn to_polygon(&self) -> Polygon<f64> {
        Rect::new(
            Coord { x: self.min_x, y: self.min_y },
            Coord { x: self.max_x, y: self.max_y },
        ).to_polygon()
    }

    /// Smallest pixel window covering this box under `transform`
    ///
    /// The result is not clipped to any raster extent and may have negative
    /// offsets.
    pub fn to_window(&self, transform: &GeoTransform) -> RasterResult<Window> {
        let inverse = transform.inverse()?;

        let corners = [
            (self.min_x, self.min_y),
            (self.max_x, self.min_y),
            (self.max_x, self.max_y),
            (self.min_x, self.max_y),
        ];

        let mut col_min = f64::INFINITY;
        let mut col_max = f64::NEG_INFINITY;
        let mut row_min = f64::INFINITY;
        let mut row_max = f64::NEG_INFINITY;
        for (x, y) in corners {
            let (col, row) = inverse.apply(x, y);
            col_min = col_min.min(col);
            col_max = col_max.max(col);
            row_min = row_min.min(row);
            row_max = row_max.max(row);
        }

        if !(col_min.is_finite() && col_max.is_finite() && row_min.is_finite() && row_max.is_finite()) {
            return Err(RasterError::Vector(format!("Bounding box {:?} maps to non-finite pixels", self)));
        }

        let col_start = (col_min + PIXEL_TOLERANCE).floor() as i64;
        let row_start = (row_min + PIXEL_TOLERANCE).floor() as i64;
        let col_end = (col_max - PIXEL_TOLERANCE).ceil() as i64;
        let row_end = (row_max - PIXEL_TOLERANCE).ceil() as i64;

        Ok(Window::new(
            row_start,
            col_start,
            (row_end - row_start).max(0) as usize,
            (col_end - col_start).max(0) as usize,
        ))
    }
}

impl From<Rect<f64>> for BoundingBox {
    fn from(rect: Rect<f64>) -> Self {
        BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_round_trip() {
        let transform = GeoTransform::from_origin(500000.0, 4000000.0, 10.0, 10.0);
        let window = Window::new(16, 32, 8, 8);

        let bbox = BoundingBox::from_window(&window, &transform);
        assert_eq!(bbox, BoundingBox::new(500320.0, 3999760.0, 500400.0, 3999840.0));
        assert_eq!(bbox.to_window(&transform).unwrap(), window);
    }

    #[test]
    fn test_partial_pixels_expand_window() {
        let transform = GeoTransform::from_origin(0.0, 100.0, 1.0, 1.0);
        let bbox = BoundingBox::new(2.5, 90.2, 4.1, 97.0);

        let window = bbox.to_window(&transform).unwrap();
        assert_eq!(window, Window::new(3, 2, 7, 3));
    }

    #[test]
    fn test_contains_and_intersects() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(10.0, 0.0, 20.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&BoundingBox::new(5.0, 5.0, 15.0, 15.0)));
        assert!(a.contains(&a.center()));
        assert!(!a.contains(&Point::new(-1.0, 5.0)));
    }
}
