//! Connected-component labelling of integer grids

use std::collections::VecDeque;

use super::Connectivity;

/// Label assigned to pixels excluded by the mask
pub const UNLABELED: u32 = 0;

/// Per-pixel region labels plus per-region value and size
///
/// Labels start at 1 and are assigned in raster scan order of each region's
/// first pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct Labels {
    pub width: usize,
    pub height: usize,
    pub labels: Vec<u32>,
    /// Value of region `l` at index `l - 1`
    pub values: Vec<i64>,
    /// Pixel count of region `l` at index `l - 1`
    pub counts: Vec<usize>,
}

impl Labels {
    pub fn region_count(&self) -> usize {
        self.values.len()
    }

    pub fn label_at(&self, row: i64, col: i64) -> u32 {
        if row < 0 || col < 0 || row as usize >= self.height || col as usize >= self.width {
            return UNLABELED;
        }
        self.labels[row as usize * self.width + col as usize]
    }
}

const FOUR: [(i64, i64); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];
const EIGHT: [(i64, i64); 8] = [(-1, -1), (-1, 0), (-1, 1), (0, -1), (0, 1), (1, -1), (1, 0), (1, 1)];

/// Groups equal-valued neighbouring pixels into regions by flood fill
///
/// `mask`, when given, has one entry per pixel; `false` entries take part in
/// no region.
pub fn label_regions(
    values: &[i64],
    width: usize,
    height: usize,
    mask: Option<&[bool]>,
    connectivity: Connectivity,
) -> Labels {
    let neighbours: &[(i64, i64)] = match connectivity {
        Connectivity::Four => &FOUR,
        Connectivity::Eight => &EIGHT,
    };
    let included = |index: usize| mask.map_or(true, |mask| mask[index]);

    let mut labels = vec![UNLABELED; width * height];
    let mut region_values = Vec::new();
    let mut counts = Vec::new();
    let mut queue = VecDeque::new();

    for start in 0..width * height {
        if labels[start] != UNLABELED || !included(start) {
            continue;
        }

        let label = region_values.len() as u32 + 1;
        let value = values[start];
        let mut count = 0usize;
        labels[start] = label;
        queue.push_back(start);

        while let Some(index) = queue.pop_front() {
            count += 1;
            let row = (index / width) as i64;
            let col = (index % width) as i64;
            for &(dr, dc) in neighbours {
                let (r, c) = (row + dr, col + dc);
                if r < 0 || c < 0 || r >= height as i64 || c >= width as i64 {
                    continue;
                }
                let next = r as usize * width + c as usize;
                if labels[next] == UNLABELED && included(next) && values[next] == value {
                    labels[next] = label;
                    queue.push_back(next);
                }
            }
        }

        region_values.push(value);
        counts.push(count);
    }

    Labels { width, height, labels, values: region_values, counts }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_pixel_in_one_region() {
        let values = vec![
            1, 1, 0, 2,
            0, 1, 0, 2,
            3, 0, 0, 2,
        ];
        let labels = label_regions(&values, 4, 3, None, Connectivity::Four);

        assert_eq!(labels.region_count(), 5);
        assert!(labels.labels.iter().all(|&l| l != UNLABELED));
        assert_eq!(labels.counts.iter().sum::<usize>(), 12);
        assert_eq!(labels.values, vec![1, 0, 2, 0, 3]);
        assert_eq!(labels.counts, vec![3, 4, 3, 1, 1]);
    }

    #[test]
    fn test_diagonal_neighbours() {
        let values = vec![
            1, 0,
            0, 1,
        ];
        let four = label_regions(&values, 2, 2, None, Connectivity::Four);
        assert_eq!(four.region_count(), 4);

        let eight = label_regions(&values, 2, 2, None, Connectivity::Eight);
        assert_eq!(eight.region_count(), 2);
        assert_eq!(eight.counts, vec![2, 2]);
    }

    #[test]
    fn test_mask_excludes_pixels() {
        let values = vec![5, 5, 5];
        let mask = vec![true, false, true];
        let labels = label_regions(&values, 3, 1, Some(&mask), Connectivity::Four);

        assert_eq!(labels.labels, vec![1, UNLABELED, 2]);
        assert_eq!(labels.label_at(0, 1), UNLABELED);
        assert_eq!(labels.label_at(-1, 0), UNLABELED);
    }
}
