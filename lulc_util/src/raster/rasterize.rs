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
use std::path::Path;

use anyhow::{bail, Context, Result};
use gdal::raster::rasterize;
use gdal::spatial_ref::SpatialRef;
use gdal::vector::LayerAccess;
use gdal::{Dataset, DriverManager};
use log::debug;
use ndarray::Array2;

use crate::config::AgglomConfig;
use crate::raster::GridStats;

/// Maps a raw cadastre LULC code to the grid value.  Negative codes become
/// nodata; codes of 9 and above shift down one slot to close the gap left
/// by a code removed from the nomenclature.
pub fn reclassify(value: i64, no_data_value: u8) -> u8 {
    if value < 0 {
        return no_data_value;
    }
    if value >= 9 {
        (value - 1) as u8
    } else {
        value as u8
    }
}

/// Reads the cadastre features intersecting the agglomeration bounding box
/// and burns their reclassified LULC codes into a uint8 grid.  Later
/// features overwrite earlier ones where parcels overlap.
pub fn rasterize_cadastre(
    cadastre_path: &Path,
    config: &AgglomConfig,
    dst_res: u32,
    dst_nodata_val: u8,
) -> Result<(Array2<u8>, GridStats)> {
    let stats = GridStats::from_bounds(config, dst_res, dst_nodata_val);

    let dataset = Dataset::open(cadastre_path)
        .with_context(|| format!("cannot open cadastre dataset {:?}", cadastre_path))?;
    let mut layer = dataset.layer(0)?;
    layer.set_spatial_filter_rect(config.west, config.south, config.east, config.north);

    let mut geometries = Vec::new();
    let mut burn_values = Vec::new();
    for feature in layer.features() {
        let value = feature
            .field_as_integer64_by_name(&config.lulc_field)?
            .with_context(|| format!("cadastre feature without a {} attribute", config.lulc_field))?;

        let geometry = match feature.geometry() {
            Some(g) => g.clone(),
            None => bail!("cadastre feature without geometry"),
        };

        geometries.push(geometry);
        burn_values.push(reclassify(value, dst_nodata_val) as f64);
    }

    if geometries.is_empty() {
        bail!(
            "no cadastre features within the agglomeration bounding box in {:?}",
            cadastre_path
        );
    }
    debug!("burning {} cadastre features", geometries.len());

    let drv = DriverManager::get_driver_by_name("MEM")?;
    let mut ds = drv.create_with_band_type::<u8, _>(
        "",
        stats.num_cols as usize,
        stats.num_rows as usize,
        1,
    )?;
    ds.set_geo_transform(&stats.geo_transform())?;
    ds.set_spatial_ref(&SpatialRef::from_definition(&stats.projection)?)?;

    {
        let mut band = ds.rasterband(1)?;
        band.set_no_data_value(Some(dst_nodata_val as f64))?;
        band.fill(dst_nodata_val as f64, None)?;
    }

    rasterize(&mut ds, &[1], &geometries, &burn_values, None)?;

    let band = ds.rasterband(1)?;
    let buf = band.read_as::<u8>(
        (0, 0),
        (stats.num_cols, stats.num_rows),
        (stats.num_cols, stats.num_rows),
        None,
    )?;

    let (_, buf_data) = buf.into_shape_and_vec();
    let grid = Array2::from_shape_vec((stats.num_rows, stats.num_cols), buf_data)
        .context("rasterized buffer does not match the expected grid shape")?;

    Ok((grid, stats))
}
