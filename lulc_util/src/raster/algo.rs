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
use std::collections::VecDeque;

use anyhow::{bail, Result};
use bitvec::prelude::*;
use itertools::Itertools;
use ndarray::{s, Array2};

pub const FOUR_CONNECTED: &[(i32, i32)] = &[(-1, 0), (0, -1), (0, 1), (1, 0)];

pub const EIGHT_CONNECTED: &[(i32, i32)] = &[
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Binary mask over a raster grid, one bit per cell, row major
#[derive(Clone)]
pub struct BitGrid {
    pub num_rows: usize,
    pub num_cols: usize,
    bits: BitVec,
}

impl BitGrid {
    pub fn new(num_rows: usize, num_cols: usize) -> BitGrid {
        BitGrid {
            num_rows,
            num_cols,
            bits: bitvec![0; num_rows * num_cols],
        }
    }

    pub fn from_fn<F: Fn(usize, usize) -> bool>(
        num_rows: usize,
        num_cols: usize,
        f: F,
    ) -> BitGrid {
        let mut grid = BitGrid::new(num_rows, num_cols);
        for r in 0..num_rows {
            for c in 0..num_cols {
                if f(r, c) {
                    grid.bits.set(r * num_cols + c, true);
                }
            }
        }
        grid
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.bits[row * self.num_cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: bool) {
        self.bits.set(row * self.num_cols + col, value);
    }

    #[inline]
    pub fn get_index(&self, index: usize) -> bool {
        self.bits[index]
    }

    #[inline]
    pub fn set_index(&mut self, index: usize, value: bool) {
        self.bits.set(index, value);
    }

    pub fn len(&self) -> usize {
        self.num_rows * self.num_cols
    }

    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    pub fn count_ones(&self) -> usize {
        self.bits.count_ones()
    }

    /// Cells set in self and not in rhs
    pub fn and_not(&self, rhs: &BitGrid) -> BitGrid {
        assert_eq!(self.num_rows, rhs.num_rows);
        assert_eq!(self.num_cols, rhs.num_cols);

        let mut bits = self.bits.clone();
        for idx in rhs.bits.iter_ones() {
            bits.set(idx, false);
        }
        BitGrid {
            num_rows: self.num_rows,
            num_cols: self.num_cols,
            bits,
        }
    }

    pub fn is_subset_of(&self, rhs: &BitGrid) -> bool {
        self.bits.iter_ones().all(|idx| rhs.bits[idx])
    }
}

/// Connected-component labels of a binary mask.  Label 0 is background,
/// components are numbered 1.. in row-major discovery order.
pub struct Labels {
    pub num_rows: usize,
    pub num_cols: usize,
    pub labels: Vec<u32>,
    /// counts[k] = cell count of label k + 1
    pub counts: Vec<usize>,
}

impl Labels {
    pub fn num_labels(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn label_at(&self, row: usize, col: usize) -> u32 {
        self.labels[row * self.num_cols + col]
    }

    /// Label of the component with the most cells, ties going to the lowest
    /// label id.  None when the mask had no set cell.
    pub fn largest(&self) -> Option<u32> {
        let mut best: Option<(u32, usize)> = None;
        for (idx, &count) in self.counts.iter().enumerate() {
            if best.map_or(true, |(_, best_count)| count > best_count) {
                best = Some((idx as u32 + 1, count));
            }
        }
        best.map(|(label, _)| label)
    }

    /// The n largest components by cell count, ties going to the lowest label id
    pub fn largest_n(&self, n: usize) -> Vec<u32> {
        (1..=self.counts.len() as u32)
            .sorted_by_key(|&label| (std::cmp::Reverse(self.counts[label as usize - 1]), label))
            .take(n)
            .collect()
    }

    pub fn mask_of(&self, label: u32) -> BitGrid {
        self.mask_of_any(&[label])
    }

    pub fn mask_of_any(&self, keep: &[u32]) -> BitGrid {
        let mut mask = BitGrid::new(self.num_rows, self.num_cols);
        for (idx, &label) in self.labels.iter().enumerate() {
            if label > 0 && keep.contains(&label) {
                mask.set_index(idx, true);
            }
        }
        mask
    }
}

/// BFS labeling of the connected components of `mask`, with the given
/// neighborhood (FOUR_CONNECTED or EIGHT_CONNECTED)
pub fn label_components(mask: &BitGrid, neighborhood: &[(i32, i32)]) -> Labels {
    let num_rows = mask.num_rows;
    let num_cols = mask.num_cols;

    let mut labels = vec![0u32; mask.len()];
    let mut counts = Vec::new();

    let mut deq = VecDeque::new();

    for start in 0..mask.len() {
        if !mask.get_index(start) || labels[start] != 0 {
            continue;
        }

        let label = counts.len() as u32 + 1;
        let mut count = 0usize;

        labels[start] = label;
        deq.push_back(start);

        while let Some(current_idx) = deq.pop_front() {
            count += 1;

            let y = (current_idx / num_cols) as i32;
            let x = (current_idx % num_cols) as i32;

            for &(dy, dx) in neighborhood {
                let try_y = y + dy;
                let try_x = x + dx;
                if try_y < 0 || try_y >= num_rows as i32 || try_x < 0 || try_x >= num_cols as i32 {
                    continue;
                }

                let try_index = try_y as usize * num_cols + try_x as usize;
                if labels[try_index] != 0 || !mask.get_index(try_index) {
                    continue;
                }

                labels[try_index] = label;
                deq.push_back(try_index);
            }
        }

        counts.push(count);
    }

    Labels {
        num_rows,
        num_cols,
        labels,
        counts,
    }
}

/// Removes 4-connected components smaller than `min_size` cells.  Only ever
/// clears cells, larger components come through untouched.
pub fn sieve(mask: &BitGrid, min_size: usize) -> BitGrid {
    let labels = label_components(mask, FOUR_CONNECTED);

    let mut out = mask.clone();
    for (idx, &label) in labels.labels.iter().enumerate() {
        if label > 0 && labels.counts[label as usize - 1] < min_size {
            out.set_index(idx, false);
        }
    }
    out
}

/// Minimal row/col window containing the set cells of a mask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub row_off: usize,
    pub col_off: usize,
    pub num_rows: usize,
    pub num_cols: usize,
}

pub fn data_window(mask: &BitGrid) -> Result<Window> {
    let mut row_min = usize::MAX;
    let mut row_max = 0usize;
    let mut col_min = usize::MAX;
    let mut col_max = 0usize;

    for r in 0..mask.num_rows {
        for c in 0..mask.num_cols {
            if !mask.get(r, c) {
                continue;
            }
            row_min = row_min.min(r);
            row_max = row_max.max(r);
            col_min = col_min.min(c);
            col_max = col_max.max(c);
        }
    }

    if row_min == usize::MAX {
        bail!("mask has no valid data cells, cannot compute an extent window");
    }

    Ok(Window {
        row_off: row_min,
        col_off: col_min,
        num_rows: row_max - row_min + 1,
        num_cols: col_max - col_min + 1,
    })
}

pub fn crop_grid(grid: &Array2<u8>, window: &Window) -> Array2<u8> {
    grid.slice(s![
        window.row_off..window.row_off + window.num_rows,
        window.col_off..window.col_off + window.num_cols
    ])
    .to_owned()
}

pub fn crop_mask(mask: &BitGrid, window: &Window) -> BitGrid {
    BitGrid::from_fn(window.num_rows, window.num_cols, |r, c| {
        mask.get(window.row_off + r, window.col_off + c)
    })
}

/// Grid values where the mask is set, nodata elsewhere
pub fn mask_where(mask: &BitGrid, grid: &Array2<u8>, no_data_value: u8) -> Array2<u8> {
    let (num_rows, num_cols) = grid.dim();
    assert_eq!(num_rows, mask.num_rows);
    assert_eq!(num_cols, mask.num_cols);

    Array2::from_shape_fn((num_rows, num_cols), |(r, c)| {
        if mask.get(r, c) {
            grid[[r, c]]
        } else {
            no_data_value
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from_rows(rows: &[&str]) -> BitGrid {
        let num_rows = rows.len();
        let num_cols = rows[0].len();
        BitGrid::from_fn(num_rows, num_cols, |r, c| {
            rows[r].as_bytes()[c] == b'#'
        })
    }

    #[test]
    fn test_label_connectivity() {
        //two blocks touching only diagonally
        let mask = mask_from_rows(&[
            "##..",
            "##..",
            "..##",
            "..##",
        ]);

        let four = label_components(&mask, FOUR_CONNECTED);
        assert_eq!(four.num_labels(), 2);
        assert_eq!(four.counts, vec![4, 4]);

        let eight = label_components(&mask, EIGHT_CONNECTED);
        assert_eq!(eight.num_labels(), 1);
        assert_eq!(eight.counts, vec![8]);
    }

    #[test]
    fn test_largest_deterministic() {
        let mask = mask_from_rows(&[
            "#....",
            ".....",
            "###..",
            ".....",
            "###..",
        ]);

        let labels = label_components(&mask, EIGHT_CONNECTED);
        assert_eq!(labels.num_labels(), 3);
        assert_eq!(labels.counts, vec![1, 3, 3]);

        //unique maximum
        assert_eq!(labels.largest(), Some(2));
        //ties resolved to the lowest label id
        assert_eq!(labels.largest_n(2), vec![2, 3]);
        assert_eq!(labels.largest_n(10), vec![2, 3, 1]);
    }

    #[test]
    fn test_largest_empty_mask() {
        let mask = BitGrid::new(4, 4);
        let labels = label_components(&mask, EIGHT_CONNECTED);
        assert_eq!(labels.largest(), None);
        assert!(labels.largest_n(3).is_empty());
    }

    #[test]
    fn test_mask_of() {
        let mask = mask_from_rows(&[
            "#.#",
            "...",
            "#..",
        ]);
        let labels = label_components(&mask, FOUR_CONNECTED);
        let one = labels.mask_of(2);
        assert_eq!(one.count_ones(), 1);
        assert!(one.get(0, 2));
    }

    #[test]
    fn test_sieve_removes_small_keeps_large() {
        let mask = mask_from_rows(&[
            "###..#",
            "###...",
            "......",
            "#.....",
        ]);

        let sieved = sieve(&mask, 3);

        //the 6-cell block is unchanged
        for r in 0..2 {
            for c in 0..3 {
                assert!(sieved.get(r, c));
            }
        }
        //the single-cell components are gone
        assert!(!sieved.get(0, 5));
        assert!(!sieved.get(3, 0));
        assert_eq!(sieved.count_ones(), 6);

        //the sieve never adds cells
        assert!(sieved.is_subset_of(&mask));
    }

    #[test]
    fn test_data_window() {
        let mask = mask_from_rows(&[
            "......",
            "..##..",
            "..#...",
            "......",
        ]);

        let window = data_window(&mask).unwrap();
        assert_eq!(
            window,
            Window {
                row_off: 1,
                col_off: 2,
                num_rows: 2,
                num_cols: 2,
            }
        );
    }

    #[test]
    fn test_data_window_empty_mask_is_error() {
        let mask = BitGrid::new(5, 5);
        assert!(data_window(&mask).is_err());
    }

    #[test]
    fn test_crop_and_mask_where() {
        let grid = Array2::from_shape_fn((4, 4), |(r, c)| (r * 4 + c) as u8);
        let mask = BitGrid::from_fn(4, 4, |r, c| r == c);

        let masked = mask_where(&mask, &grid, 255);
        assert_eq!(masked[[1, 1]], 5);
        assert_eq!(masked[[1, 2]], 255);

        let window = Window {
            row_off: 1,
            col_off: 1,
            num_rows: 2,
            num_cols: 2,
        };
        let cropped = crop_grid(&masked, &window);
        assert_eq!(cropped.dim(), (2, 2));
        assert_eq!(cropped[[0, 0]], 5);
        assert_eq!(cropped[[1, 1]], 10);

        let cropped_mask = crop_mask(&mask, &window);
        assert!(cropped_mask.get(0, 0));
        assert!(!cropped_mask.get(0, 1));
    }
}
