//! Boundary tracing of labelled regions
//!
//! Boundaries follow pixel edges. Every edge separating a region pixel from a
//! non-region pixel (or the raster border) is directed so that the region
//! lies on its right in row-down pixel space; chaining the edges gives closed
//! rings whose shoelace area is positive for the outer boundary and negative
//! for holes.
//!
//! At a corner shared by two region pixels on one diagonal and two other
//! pixels on the other, the tracer turns left first. Rings then split along
//! the background side, so a hole touching the outer boundary or another hole
//! at a single corner stays a separate ring meeting it at that point.

use std::collections::HashMap;

use super::labeling::Labels;
use crate::error::{RasterError, RasterResult};

/// Pixel corner as (x = column, y = row)
pub type Vertex = (i64, i64);

/// A closed ring in pixel corner coordinates, without the repeated end vertex
#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    pub vertices: Vec<Vertex>,
}

impl Ring {
    /// Twice the signed shoelace area in row-down pixel space
    pub fn twice_area(&self) -> i64 {
        let n = self.vertices.len();
        (0..n)
            .map(|i| {
                let (x0, y0) = self.vertices[i];
                let (x1, y1) = self.vertices[(i + 1) % n];
                x0 * y1 - x1 * y0
            })
            .sum()
    }

    pub fn is_hole(&self) -> bool {
        self.twice_area() < 0
    }
}

/// Outer ring and holes of one region
#[derive(Debug, Clone, PartialEq)]
pub struct RegionOutline {
    pub exterior: Ring,
    pub holes: Vec<Ring>,
}

// E, S, W, N
const STEPS: [(i64, i64); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];

#[derive(Debug, Clone, Copy)]
struct Edge {
    start: Vertex,
    dir: u8,
}

impl Edge {
    fn end(&self) -> Vertex {
        let (dx, dy) = STEPS[self.dir as usize];
        (self.start.0 + dx, self.start.1 + dy)
    }
}

/// Boundary edges of every region, indexed by `label - 1`
///
/// Regions for which `wanted` is false get no edges.
fn collect_edges(labels: &Labels, wanted: &[bool]) -> Vec<Vec<Edge>> {
    let mut edges = vec![Vec::new(); labels.region_count()];

    for row in 0..labels.height as i64 {
        for col in 0..labels.width as i64 {
            let label = labels.label_at(row, col);
            if label == 0 || !wanted[label as usize - 1] {
                continue;
            }
            let region = &mut edges[label as usize - 1];
            if labels.label_at(row - 1, col) != label {
                region.push(Edge { start: (col, row), dir: 0 });
            }
            if labels.label_at(row, col + 1) != label {
                region.push(Edge { start: (col + 1, row), dir: 1 });
            }
            if labels.label_at(row + 1, col) != label {
                region.push(Edge { start: (col + 1, row + 1), dir: 2 });
            }
            if labels.label_at(row, col - 1) != label {
                region.push(Edge { start: (col, row + 1), dir: 3 });
            }
        }
    }

    edges
}

/// Direction preference when leaving a vertex reached while heading `dir`
fn turn_order(dir: u8) -> [u8; 3] {
    [(dir + 3) % 4, dir, (dir + 1) % 4]
}

/// Chains a region's edges into rings
fn trace_rings(edges: &[Edge]) -> RasterResult<Vec<Ring>> {
    let by_start: HashMap<(Vertex, u8), usize> = edges.iter()
        .enumerate()
        .map(|(index, edge)| ((edge.start, edge.dir), index))
        .collect();

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for first in 0..edges.len() {
        if used[first] {
            continue;
        }

        // (vertex, outgoing direction) for every edge of the ring
        let mut path: Vec<(Vertex, u8)> = Vec::new();
        let mut current = first;
        loop {
            used[current] = true;
            let edge = edges[current];
            path.push((edge.start, edge.dir));

            let end = edge.end();
            let next = turn_order(edge.dir).iter()
                .find_map(|&dir| by_start.get(&(end, dir)).copied())
                .ok_or_else(|| RasterError::Vector(format!("Open boundary at pixel corner {:?}", end)))?;

            if next == first {
                break;
            }
            if used[next] {
                return Err(RasterError::Vector(format!("Boundary revisits an edge at pixel corner {:?}", end)));
            }
            current = next;
        }

        // Keep only corners where the direction changes
        let n = path.len();
        let vertices = (0..n)
            .filter(|&i| path[i].1 != path[(i + n - 1) % n].1)
            .map(|i| path[i].0)
            .collect();
        rings.push(Ring { vertices });
    }

    Ok(rings)
}

/// Traces the outline of every region with `wanted[label - 1]` set
///
/// The result is indexed like `labels.values`; unwanted regions map to `None`.
pub fn trace_regions(labels: &Labels, wanted: &[bool]) -> RasterResult<Vec<Option<RegionOutline>>> {
    let edges = collect_edges(labels, wanted);
    let mut outlines = Vec::with_capacity(edges.len());

    for (index, region_edges) in edges.iter().enumerate() {
        if region_edges.is_empty() {
            outlines.push(None);
            continue;
        }

        let mut rings = trace_rings(region_edges)?.into_iter();
        // The first edge is the top edge of the region's first pixel in scan
        // order, which always lies on the outer boundary.
        let exterior = rings.next()
            .filter(|ring| !ring.is_hole())
            .ok_or_else(|| RasterError::Vector(format!("Region {} has no outer boundary", index + 1)))?;

        let mut holes = Vec::new();
        for ring in rings {
            if !ring.is_hole() {
                return Err(RasterError::Vector(format!("Region {} has more than one outer boundary", index + 1)));
            }
            holes.push(ring);
        }
        outlines.push(Some(RegionOutline { exterior, holes }));
    }

    Ok(outlines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorize::labeling::label_regions;
    use crate::vectorize::Connectivity;

    fn outlines(values: &[i64], width: usize, height: usize, connectivity: Connectivity) -> Vec<Option<RegionOutline>> {
        let labels = label_regions(values, width, height, None, connectivity);
        let wanted: Vec<bool> = labels.values.iter().map(|&v| v > 0).collect();
        trace_regions(&labels, &wanted).unwrap()
    }

    #[test]
    fn test_rectangle_has_four_corners() {
        let result = outlines(&[7; 6], 3, 2, Connectivity::Four);
        let outline = result[0].as_ref().unwrap();

        assert_eq!(outline.exterior.vertices, vec![(0, 0), (3, 0), (3, 2), (0, 2)]);
        assert_eq!(outline.exterior.twice_area(), 12);
        assert!(outline.holes.is_empty());
    }

    #[test]
    fn test_l_shape_is_one_ring() {
        let values = [
            1, 0,
            1, 0,
            1, 1,
        ];
        let result = outlines(&values, 2, 3, Connectivity::Four);
        let outline = result[0].as_ref().unwrap();

        assert_eq!(outline.exterior.vertices.len(), 6);
        assert_eq!(outline.exterior.twice_area(), 8);
        assert!(result[1].is_none());
    }

    #[test]
    fn test_ring_with_hole() {
        let values = [
            1, 1, 1,
            1, 0, 1,
            1, 1, 1,
        ];
        let result = outlines(&values, 3, 3, Connectivity::Four);
        let outline = result[0].as_ref().unwrap();

        assert_eq!(outline.exterior.twice_area(), 18);
        assert_eq!(outline.holes.len(), 1);
        assert_eq!(outline.holes[0].twice_area(), -2);
    }

    #[test]
    fn test_diagonal_pinch() {
        let values = [
            1, 0,
            0, 1,
        ];
        let four = outlines(&values, 2, 2, Connectivity::Four);
        assert_eq!(four.iter().flatten().count(), 2);

        let eight = outlines(&values, 2, 2, Connectivity::Eight);
        let outline = eight[0].as_ref().unwrap();
        assert_eq!(outline.exterior.twice_area(), 4);
        assert_eq!(outline.exterior.vertices.iter().filter(|&&v| v == (1, 1)).count(), 2);
    }

    #[test]
    fn test_hole_touching_at_corner() {
        // Background pixels (1, 1) and (2, 2) share only a corner
        let values = [
            1, 1, 1, 1,
            1, 0, 1, 1,
            1, 1, 0, 1,
            1, 1, 1, 1,
        ];
        for connectivity in [Connectivity::Four, Connectivity::Eight] {
            let result = outlines(&values, 4, 4, connectivity);
            let outline = result[0].as_ref().unwrap();
            let hole_area: i64 = outline.holes.iter().map(Ring::twice_area).sum();
            assert_eq!(outline.exterior.twice_area() + hole_area, 28);
            assert_eq!(outline.holes.len(), 2, "{}-connected", connectivity);
            assert!(outline.holes.iter().all(|hole| hole.twice_area() == -2));
        }
    }

    #[test]
    fn test_hole_touching_exterior_at_corner() {
        // The hole at (1, 1) meets the notch at (0, 2) only at corner (2, 1)
        let values = [
            1, 1, 0,
            1, 0, 1,
            1, 1, 1,
        ];
        for connectivity in [Connectivity::Four, Connectivity::Eight] {
            let result = outlines(&values, 3, 3, connectivity);
            let outline = result[0].as_ref().unwrap();

            assert_eq!(outline.holes.len(), 1, "{}-connected", connectivity);
            assert_eq!(outline.holes[0].twice_area(), -2);
            assert_eq!(outline.exterior.twice_area(), 16);
            let exterior = &outline.exterior.vertices;
            assert_eq!(exterior.iter().filter(|&&v| v == (2, 1)).count(), 1);
            assert!(outline.holes[0].vertices.contains(&(2, 1)));
        }
    }
}
