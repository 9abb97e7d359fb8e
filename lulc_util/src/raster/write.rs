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
use std::fs::create_dir_all;
use std::path::Path;

use anyhow::Result;
use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::DriverManager;
use log::debug;
use ndarray::Array2;

use crate::raster::GridStats;

/// Writes a single-band uint8 GeoTIFF with the grid's transform, nodata
/// value and CRS definition string
pub fn write_geotiff(raster_path: &Path, grid: &Array2<u8>, stats: &GridStats) -> Result<()> {
    if let Some(parent) = raster_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            create_dir_all(parent)?;
        }
    }

    let (num_rows, num_cols) = grid.dim();

    debug!("creating output tif {:?} with stats {}", raster_path, stats);

    let drv = DriverManager::get_driver_by_name("GTiff")?;
    let mut ds =
        drv.create_with_band_type::<u8, _>(raster_path, num_cols as usize, num_rows as usize, 1)?;

    //because y is the top not the bottom
    assert!(stats.pixel_height < 0.0);
    ds.set_geo_transform(&stats.geo_transform())?;
    ds.set_spatial_ref(&SpatialRef::from_definition(&stats.projection)?)?;

    let mut band = ds.rasterband(1)?;
    band.set_no_data_value(Some(stats.no_data_value as f64))?;

    let mut buffer = Buffer::new((num_cols, num_rows), grid.iter().copied().collect());
    band.write((0, 0), (num_cols, num_rows), &mut buffer)?;

    Ok(())
}
