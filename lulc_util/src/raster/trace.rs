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
use std::collections::HashMap;

use geo::{Coordinate, LineString, Polygon};
use itertools::Itertools;

use crate::raster::{label_components, BitGrid, GridStats, FOUR_CONNECTED};

//grid corner, (x, y) = (col, row)
type Corner = (i32, i32);
type Edge = (Corner, Corner);

/// Traces the 4-connected regions of a binary mask into polygons in map
/// coordinates.  Ring vertices follow cell corners, runs of collinear
/// corners are merged, interior holes become interior rings.
pub fn trace_mask_polygons(mask: &BitGrid, stats: &GridStats) -> Vec<Polygon<f64>> {
    let labels = label_components(mask, FOUR_CONNECTED);

    //directed boundary edges per component, the region always on the right
    //of the walking direction
    let mut edges_by_label: Vec<Vec<Edge>> = vec![Vec::new(); labels.num_labels()];

    for r in 0..mask.num_rows {
        for c in 0..mask.num_cols {
            if !mask.get(r, c) {
                continue;
            }
            let edges = &mut edges_by_label[labels.label_at(r, c) as usize - 1];

            let x = c as i32;
            let y = r as i32;

            if r == 0 || !mask.get(r - 1, c) {
                edges.push(((x, y), (x + 1, y)));
            }
            if c + 1 == mask.num_cols || !mask.get(r, c + 1) {
                edges.push(((x + 1, y), (x + 1, y + 1)));
            }
            if r + 1 == mask.num_rows || !mask.get(r + 1, c) {
                edges.push(((x + 1, y + 1), (x, y + 1)));
            }
            if c == 0 || !mask.get(r, c - 1) {
                edges.push(((x, y + 1), (x, y)));
            }
        }
    }

    let mut polygons = Vec::new();

    for edges in &edges_by_label {
        let rings = chain_rings(edges).into_iter().map(simplify_ring).collect_vec();

        //positive doubled shoelace area means exterior with this edge
        //orientation (y axis points down in grid space)
        let (exteriors, holes): (Vec<_>, Vec<_>) =
            rings.into_iter().partition(|ring| ring_signed_area2(ring) > 0);

        let hole_strings = holes
            .iter()
            .map(|ring| ring_to_line_string(ring, stats))
            .collect_vec();

        //a pinched region can decompose into several exterior rings; the
        //largest one carries the holes
        for (idx, ring) in exteriors
            .into_iter()
            .sorted_by_key(|ring| std::cmp::Reverse(ring_signed_area2(ring)))
            .enumerate()
        {
            let interiors = if idx == 0 { hole_strings.clone() } else { Vec::new() };
            polygons.push(Polygon::new(ring_to_line_string(&ring, stats), interiors));
        }
    }

    polygons
}

/// The polygon with the most ring vertices, first one winning ties.
/// Selection is by vertex count, not area.
pub fn largest_polygon_by_vertex_count(polygons: Vec<Polygon<f64>>) -> Option<Polygon<f64>> {
    let mut best: Option<(usize, Polygon<f64>)> = None;
    for polygon in polygons {
        let count = polygon_vertex_count(&polygon);
        if best.as_ref().map_or(true, |(best_count, _)| count > *best_count) {
            best = Some((count, polygon));
        }
    }
    best.map(|(_, polygon)| polygon)
}

pub fn polygon_vertex_count(polygon: &Polygon<f64>) -> usize {
    polygon.exterior().0.len()
        + polygon
            .interiors()
            .iter()
            .map(|ring| ring.0.len())
            .sum::<usize>()
}

fn clockwise(d: (i32, i32)) -> (i32, i32) {
    (-d.1, d.0)
}

fn counter_clockwise(d: (i32, i32)) -> (i32, i32) {
    (d.1, -d.0)
}

/// Chains directed boundary edges into closed rings.  Where four edges meet
/// at a pinch corner, the tightest clockwise turn is taken so every ring
/// stays simple.
fn chain_rings(edges: &[Edge]) -> Vec<Vec<Corner>> {
    let mut by_start: HashMap<Corner, Vec<usize>> = HashMap::new();
    for (idx, edge) in edges.iter().enumerate() {
        by_start.entry(edge.0).or_default().push(idx);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for start in 0..edges.len() {
        if used[start] {
            continue;
        }

        let origin = edges[start].0;
        let mut ring = vec![origin];
        let mut current = start;

        loop {
            used[current] = true;
            let (from, to) = edges[current];
            ring.push(to);

            if to == origin {
                break;
            }

            let dir = (to.0 - from.0, to.1 - from.1);
            let mut next = None;
            'turns: for want in [clockwise(dir), dir, counter_clockwise(dir)] {
                for &candidate in by_start.get(&to).into_iter().flatten() {
                    if used[candidate] {
                        continue;
                    }
                    let (c_from, c_to) = edges[candidate];
                    if (c_to.0 - c_from.0, c_to.1 - c_from.1) == want {
                        next = Some(candidate);
                        break 'turns;
                    }
                }
            }

            //every vertex has as many outgoing as incoming boundary edges
            current = next.expect("boundary edges always chain into closed rings");
        }

        rings.push(ring);
    }

    rings
}

/// Drops collinear midpoints from a closed ring, keeping it closed
fn simplify_ring(ring: Vec<Corner>) -> Vec<Corner> {
    //first == last on input
    let n = ring.len() - 1;

    let mut out = Vec::new();
    for i in 0..n {
        let prev = ring[(i + n - 1) % n];
        let cur = ring[i];
        let next = ring[(i + 1) % n];

        if (cur.0 - prev.0, cur.1 - prev.1) != (next.0 - cur.0, next.1 - cur.1) {
            out.push(cur);
        }
    }

    let first = out[0];
    out.push(first);
    out
}

//doubled shoelace area in grid corner space
fn ring_signed_area2(ring: &[Corner]) -> i64 {
    let mut acc = 0i64;
    for window in ring.windows(2) {
        let (x0, y0) = window[0];
        let (x1, y1) = window[1];
        acc += x0 as i64 * y1 as i64 - x1 as i64 * y0 as i64;
    }
    acc
}

fn ring_to_line_string(ring: &[Corner], stats: &GridStats) -> LineString<f64> {
    LineString::from(
        ring.iter()
            .map(|&(x, y)| Coordinate {
                x: stats.origin_x + stats.pixel_width * x as f64,
                y: stats.origin_y + stats.pixel_height * y as f64,
            })
            .collect::<Vec<_>>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use geo::algorithm::area::Area;

    fn test_stats(num_rows: usize, num_cols: usize) -> GridStats {
        GridStats {
            origin_x: 0.0,
            origin_y: num_rows as f64 * 10.0,
            pixel_width: 10.0,
            pixel_height: -10.0,
            num_rows,
            num_cols,
            no_data_value: 255,
            projection: "EPSG:2056".to_string(),
        }
    }

    fn mask_from_rows(rows: &[&str]) -> BitGrid {
        BitGrid::from_fn(rows.len(), rows[0].len(), |r, c| {
            rows[r].as_bytes()[c] == b'#'
        })
    }

    #[test]
    fn test_trace_square() {
        let mask = mask_from_rows(&[
            ".....",
            ".##..",
            ".##..",
            ".....",
        ]);

        let polygons = trace_mask_polygons(&mask, &test_stats(4, 5));
        assert_eq!(polygons.len(), 1);

        let polygon = &polygons[0];
        //4 corners plus the closing vertex once collinear points are merged
        assert_eq!(polygon.exterior().0.len(), 5);
        assert!(polygon.interiors().is_empty());
        assert!(approx_eq!(f64, polygon.unsigned_area(), 400.0, epsilon = 1e-9));

        //corners sit on cell boundaries of the transform
        let xs: Vec<f64> = polygon.exterior().0.iter().map(|c| c.x).collect();
        assert!(xs.iter().all(|&x| x == 10.0 || x == 30.0));
    }

    #[test]
    fn test_trace_ring_with_hole() {
        let mask = mask_from_rows(&[
            "###",
            "#.#",
            "###",
        ]);

        let polygons = trace_mask_polygons(&mask, &test_stats(3, 3));
        assert_eq!(polygons.len(), 1);

        let polygon = &polygons[0];
        assert_eq!(polygon.interiors().len(), 1);
        assert_eq!(polygon.exterior().0.len(), 5);
        assert_eq!(polygon.interiors()[0].0.len(), 5);

        //8 cells of 100 map units each
        assert!(approx_eq!(f64, polygon.unsigned_area(), 800.0, epsilon = 1e-9));
    }

    #[test]
    fn test_trace_multiple_components() {
        let mask = mask_from_rows(&[
            "##...",
            "##...",
            "....#",
        ]);

        let polygons = trace_mask_polygons(&mask, &test_stats(3, 5));
        assert_eq!(polygons.len(), 2);

        let total: f64 = polygons.iter().map(|p| p.unsigned_area()).sum();
        assert!(approx_eq!(f64, total, 500.0, epsilon = 1e-9));
    }

    #[test]
    fn test_trace_staircase_vertices() {
        let mask = mask_from_rows(&[
            "#..",
            "##.",
            "###",
        ]);

        let polygons = trace_mask_polygons(&mask, &test_stats(3, 3));
        assert_eq!(polygons.len(), 1);

        //staircase outline: 8 corners plus closing vertex
        assert_eq!(polygons[0].exterior().0.len(), 9);
        assert!(approx_eq!(
            f64,
            polygons[0].unsigned_area(),
            600.0,
            epsilon = 1e-9
        ));
    }

    #[test]
    fn test_largest_by_vertex_count_not_area() {
        //a 2x2 square has the larger area, the 4-cell L-shape the more
        //vertices; the selection heuristic is vertex count
        let mask = mask_from_rows(&[
            "##.....",
            "##.....",
            ".....#.",
            "....##.",
            ".......",
        ]);

        let polygons = trace_mask_polygons(&mask, &test_stats(5, 7));
        assert_eq!(polygons.len(), 2);

        let best = largest_polygon_by_vertex_count(polygons).unwrap();
        assert_eq!(polygon_vertex_count(&best), 7);
        assert!(approx_eq!(f64, best.unsigned_area(), 300.0, epsilon = 1e-9));
    }

    #[test]
    fn test_largest_of_empty_is_none() {
        assert!(largest_polygon_by_vertex_count(Vec::new()).is_none());
    }

    #[test]
    fn test_trace_pinched_component() {
        //one 4-connected component with an enclosed cell whose boundary
        //touches the outside at a diagonal pinch; the traced rings may
        //decompose either way but the covered area stays exact
        let mask = mask_from_rows(&[
            "####.",
            "##.#.",
            "..##.",
            "..##.",
        ]);

        let polygons = trace_mask_polygons(&mask, &test_stats(4, 5));

        let total: f64 = polygons.iter().map(|p| p.unsigned_area()).sum();
        assert!(approx_eq!(f64, total, 1100.0, epsilon = 1e-9));
    }
}
