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
use serde::{Deserialize, Serialize};

/// Constants describing one agglomeration extraction.
///
/// The pipeline takes these as an explicit parameter so tests can run it
/// on synthetic bounding boxes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgglomConfig {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,

    //CRS kept as a plain string so both outputs get tagged identically,
    //whatever the input dataset declares
    pub crs: String,

    /// Attribute carrying the LULC code in the cadastre layer
    pub lulc_field: String,

    /// LULC codes counting as built-up for the footprint criterion
    pub urban_classes: Vec<u8>,

    pub water_class: u8,

    /// Minimum connected-component size kept by the sieve, in cells
    pub sieve_size: usize,
}

impl Default for AgglomConfig {
    fn default() -> Self {
        //bounding box extracted from the Swiss GMB agglomeration boundaries
        AgglomConfig {
            west: 2512518.0,
            south: 1146825.0,
            east: 2558887.0,
            north: 1177123.0,
            crs: "EPSG:2056".to_string(),
            lulc_field: "GENRE".to_string(),
            urban_classes: (0..8).collect(),
            water_class: 14,
            sieve_size: 10,
        }
    }
}
