/*
This file is part of the Agglomeration LULC Extent Tool
Copyright (C) 2022 Novel-T

The Agglomeration LULC Extent Tool is free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/
use ndarray::Array2;
use rayon::prelude::*;

use crate::raster::{label_components, BitGrid, EIGHT_CONNECTED};

/// Urban footprint detection over a LULC grid, following the moving-window
/// density criterion of the "Atlas of Urban Expansion, The 2016 Edition" by
/// Angel, S. et al.
///
/// A cell belongs to the footprint candidate set when the fraction of
/// urban-class cells within a euclidean disk around it reaches the density
/// threshold.  The candidate set is reduced to the largest contiguous
/// patches and optionally buffered outwards.
pub struct UrbanFootprinter {
    num_rows: usize,
    num_cols: usize,
    urban: BitGrid,
    res: u32,
}

impl UrbanFootprinter {
    pub fn new(grid: &Array2<u8>, urban_classes: &[u8], res: u32) -> UrbanFootprinter {
        let (num_rows, num_cols) = grid.dim();

        let urban = BitGrid::from_fn(num_rows, num_cols, |r, c| {
            urban_classes.contains(&grid[[r, c]])
        });

        UrbanFootprinter {
            num_rows,
            num_cols,
            urban,
            res,
        }
    }

    /// Pixel count of the urban-class indicator, mostly for logging
    pub fn num_urban_cells(&self) -> usize {
        self.urban.count_ones()
    }

    /// `kernel_radius` and `buffer_dist` are in map units; `num_patches` is
    /// the number of contiguous clusters kept (0 keeps everything);
    /// `buffer_dist` of 0 skips the buffering step.
    pub fn compute_footprint_mask(
        &self,
        kernel_radius: u32,
        urban_threshold: f64,
        num_patches: usize,
        buffer_dist: u32,
    ) -> BitGrid {
        let pixel_radius = (kernel_radius / self.res) as usize;

        let counts = disk_counts(&self.urban, pixel_radius);
        let kernel_size = disk_cell_count(pixel_radius) as f64;

        let mut mask = BitGrid::new(self.num_rows, self.num_cols);
        for (idx, &count) in counts.iter().enumerate() {
            if count as f64 / kernel_size >= urban_threshold {
                mask.set_index(idx, true);
            }
        }

        if num_patches > 0 {
            let labels = label_components(&mask, EIGHT_CONNECTED);
            mask = labels.mask_of_any(&labels.largest_n(num_patches));
        }

        let buffer_radius = (buffer_dist / self.res) as usize;
        if buffer_radius > 0 {
            mask = dilate_disk(&mask, buffer_radius);
        }

        mask
    }
}

/// Morphological dilation by a euclidean disk of `radius` pixels
pub fn dilate_disk(mask: &BitGrid, radius: usize) -> BitGrid {
    let counts = disk_counts(mask, radius);

    let mut out = BitGrid::new(mask.num_rows, mask.num_cols);
    for (idx, &count) in counts.iter().enumerate() {
        if count > 0 {
            out.set_index(idx, true);
        }
    }
    out
}

/// Cells of a disk of the given pixel radius (dx^2 + dy^2 <= r^2)
pub fn disk_cell_count(radius: usize) -> usize {
    disk_row_spans(radius)
        .iter()
        .map(|&w| 2 * w as usize + 1)
        .sum::<usize>()
        * 2
        - (2 * disk_row_spans(radius)[0] as usize + 1)
}

//half width of the disk at each |dy|
fn disk_row_spans(radius: usize) -> Vec<i64> {
    let r2 = (radius * radius) as f64;
    (0..=radius)
        .map(|dy| (r2 - (dy * dy) as f64).sqrt().floor() as i64)
        .collect()
}

/// Per-cell count of set bits within a euclidean disk of `radius` pixels,
/// cells outside the grid counting as unset.  Decomposes the disk into row
/// spans over per-row prefix sums, one parallel sweep per output row.
fn disk_counts(mask: &BitGrid, radius: usize) -> Vec<u32> {
    let num_rows = mask.num_rows;
    let num_cols = mask.num_cols;

    //prefix[r * (num_cols + 1) + c] = set bits of row r left of column c
    let mut prefix = vec![0u32; num_rows * (num_cols + 1)];
    for r in 0..num_rows {
        let base = r * (num_cols + 1);
        let mut acc = 0u32;
        for c in 0..num_cols {
            acc += mask.get(r, c) as u32;
            prefix[base + c + 1] = acc;
        }
    }

    let spans = disk_row_spans(radius);

    let mut out = vec![0u32; num_rows * num_cols];
    out.par_chunks_mut(num_cols)
        .enumerate()
        .for_each(|(r, row_out)| {
            for dy in -(radius as i64)..=radius as i64 {
                let rr = r as i64 + dy;
                if rr < 0 || rr >= num_rows as i64 {
                    continue;
                }
                let half_width = spans[dy.unsigned_abs() as usize];
                let base = rr as usize * (num_cols + 1);

                for (c, cell) in row_out.iter_mut().enumerate() {
                    let lo = (c as i64 - half_width).max(0) as usize;
                    let hi = (c as i64 + half_width + 1).min(num_cols as i64) as usize;
                    *cell += prefix[base + hi] - prefix[base + lo];
                }
            }
        });

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_cell_count() {
        //radius 0 is the cell itself, radius 1 the 4-neighborhood cross
        assert_eq!(disk_cell_count(0), 1);
        assert_eq!(disk_cell_count(1), 5);
        assert_eq!(disk_cell_count(2), 13);
    }

    #[test]
    fn test_disk_counts_single_cell() {
        let mut mask = BitGrid::new(7, 7);
        mask.set(3, 3, true);

        let counts = disk_counts(&mask, 1);

        //cross around the set cell
        assert_eq!(counts[3 * 7 + 3], 1);
        assert_eq!(counts[2 * 7 + 3], 1);
        assert_eq!(counts[4 * 7 + 3], 1);
        assert_eq!(counts[3 * 7 + 2], 1);
        assert_eq!(counts[3 * 7 + 4], 1);
        //diagonal is outside the radius-1 disk
        assert_eq!(counts[2 * 7 + 2], 0);

        assert_eq!(counts.iter().map(|&c| c as usize).sum::<usize>(), 5);
    }

    #[test]
    fn test_disk_counts_border_clipping() {
        let mut mask = BitGrid::new(3, 3);
        mask.set(0, 0, true);

        let counts = disk_counts(&mask, 1);
        //the corner still sees itself, outside cells count as unset
        assert_eq!(counts[0], 1);
        assert_eq!(counts[1], 1);
        assert_eq!(counts[3], 1);
        assert_eq!(counts[4], 0);
    }

    #[test]
    fn test_dilate_disk() {
        let mut mask = BitGrid::new(7, 7);
        mask.set(3, 3, true);

        let dilated = dilate_disk(&mask, 2);

        assert_eq!(dilated.count_ones(), disk_cell_count(2));
        assert!(dilated.get(3, 1));
        assert!(dilated.get(1, 3));
        assert!(dilated.get(2, 2));
        assert!(!dilated.get(1, 1));

        assert!(mask.is_subset_of(&dilated));
    }

    #[test]
    fn test_footprint_block_detected() {
        //30x30 grid, 10x10 urban block, rest nodata
        let grid = Array2::from_shape_fn((30, 30), |(r, c)| {
            if (10..20).contains(&r) && (10..20).contains(&c) {
                0u8
            } else {
                255u8
            }
        });

        let footprinter = UrbanFootprinter::new(&grid, &[0], 10);
        assert_eq!(footprinter.num_urban_cells(), 100);

        //radius 1 px, majority threshold, no buffering: the block comes
        //back exactly
        let mask = footprinter.compute_footprint_mask(10, 0.5, 1, 0);

        assert_eq!(mask.count_ones(), 100);
        for r in 10..20 {
            for c in 10..20 {
                assert!(mask.get(r, c));
            }
        }
    }

    #[test]
    fn test_footprint_threshold_zero_keeps_disk_reach() {
        let grid = Array2::from_shape_fn((9, 9), |(r, c)| {
            if r == 4 && c == 4 {
                0u8
            } else {
                255u8
            }
        });

        let footprinter = UrbanFootprinter::new(&grid, &[0], 1);
        //any nonzero density qualifies, so the mask is the disk around the
        //single urban cell
        let mask = footprinter.compute_footprint_mask(2, 1e-9, 1, 0);
        assert_eq!(mask.count_ones(), disk_cell_count(2));
    }

    #[test]
    fn test_footprint_keeps_largest_patches() {
        //two urban blocks, far apart; the second is larger
        let grid = Array2::from_shape_fn((40, 40), |(r, c)| {
            if (2..5).contains(&r) && (2..5).contains(&c) {
                0u8
            } else if (20..30).contains(&r) && (20..30).contains(&c) {
                0u8
            } else {
                255u8
            }
        });

        let footprinter = UrbanFootprinter::new(&grid, &[0], 10);

        let one = footprinter.compute_footprint_mask(10, 0.5, 1, 0);
        //only the 10x10 block survives, the 3x3 patch is dropped
        assert!(one.get(25, 25));
        assert!(!one.get(3, 3));

        let two = footprinter.compute_footprint_mask(10, 0.5, 2, 0);
        assert!(two.get(25, 25));
        assert!(two.get(3, 3));
        assert!(one.is_subset_of(&two));
    }

    #[test]
    fn test_footprint_buffer_expands() {
        let grid = Array2::from_shape_fn((30, 30), |(r, c)| {
            if (10..20).contains(&r) && (10..20).contains(&c) {
                0u8
            } else {
                255u8
            }
        });

        let footprinter = UrbanFootprinter::new(&grid, &[0], 10);

        let tight = footprinter.compute_footprint_mask(10, 0.5, 1, 0);
        let buffered = footprinter.compute_footprint_mask(10, 0.5, 1, 30);

        assert!(tight.is_subset_of(&buffered));
        //3 px buffer reaches (10 - 3) but not further
        assert!(buffered.get(7, 15));
        assert!(!buffered.get(6, 15));
    }
}
