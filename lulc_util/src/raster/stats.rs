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
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::config::AgglomConfig;
use crate::raster::Window;

/// Helper struct holding the georeferencing of the in-memory LULC grid
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct GridStats {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    //negative, y axis points down
    pub pixel_height: f64,
    pub num_rows: usize,
    pub num_cols: usize,
    pub no_data_value: u8,

    //CRS definition string
    pub projection: String,
}

impl fmt::Display for GridStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Origin X,Y: {}, {}\nRight/Bottom: {},{}\nPixel Width/Height: {},{}\nRows: {} Cols: {}\nNo data value: {}\nProjection: {}",
            self.origin_x,
            self.origin_y,
            self.calc_x_coord(self.num_cols),
            self.calc_y_coord(self.num_rows),
            self.pixel_width,
            self.pixel_height,
            self.num_rows,
            self.num_cols,
            self.no_data_value,
            &self.projection
        )
    }
}

impl GridStats {
    /// Grid anchored on the agglomeration bounding box, pixel centers offset
    /// half a resolution inwards from the raw corners
    pub fn from_bounds(config: &AgglomConfig, res: u32, no_data_value: u8) -> Self {
        let res_f = res as f64;

        GridStats {
            origin_x: config.west + (res / 2) as f64,
            origin_y: config.north - (res / 2) as f64,
            pixel_width: res_f,
            pixel_height: -res_f,
            num_rows: ((config.north - config.south) / res_f).floor() as usize,
            num_cols: ((config.east - config.west) / res_f).floor() as usize,
            no_data_value,
            projection: config.crs.clone(),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.num_rows, self.num_cols)
    }

    /// Calculates projected x coordinate of the left side of a column
    pub fn calc_x_coord(&self, raster_x: usize) -> f64 {
        self.origin_x + self.pixel_width * raster_x as f64
    }

    /// Calculates projected y coordinate of the top side of a row
    /// Note pixel height is negative
    pub fn calc_y_coord(&self, raster_y: usize) -> f64 {
        self.origin_y + self.pixel_height * raster_y as f64
    }

    pub fn geo_transform(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            0.0,
            self.origin_y,
            0.0,
            self.pixel_height,
        ]
    }

    /// Stats of the sub-grid covered by `window`
    pub fn window(&self, window: &Window) -> GridStats {
        GridStats {
            origin_x: self.calc_x_coord(window.col_off),
            origin_y: self.calc_y_coord(window.row_off),
            num_rows: window.num_rows,
            num_cols: window.num_cols,
            ..self.clone()
        }
    }
}
