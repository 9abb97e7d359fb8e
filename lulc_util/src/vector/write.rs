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
use gdal::spatial_ref::SpatialRef;
use gdal::vector::{LayerAccess, LayerOptions, OGRwkbGeometryType};
use gdal::DriverManager;
use geo::Polygon;
use log::debug;

use crate::vector::ToGdal;

/// Writes the extent polygons to an ESRI Shapefile, one feature per
/// polygon, tagged with the given CRS definition string
pub fn write_extent_shapefile(shp_path: &Path, polygons: &[Polygon<f64>], crs: &str) -> Result<()> {
    if let Some(parent) = shp_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            create_dir_all(parent)?;
        }
    }

    debug!("writing {} extent geometries to {:?}", polygons.len(), shp_path);

    let drv = DriverManager::get_driver_by_name("ESRI Shapefile")?;
    let mut ds = drv.create_vector_only(shp_path)?;

    let srs = SpatialRef::from_definition(crs)?;
    let mut layer = ds.create_layer(LayerOptions {
        name: "agglom_extent",
        srs: Some(&srs),
        ty: OGRwkbGeometryType::wkbPolygon,
        options: None,
    })?;

    for polygon in polygons {
        layer.create_feature(polygon.to_gdal()?)?;
    }

    Ok(())
}
