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
use anyhow::Result;
use gdal::vector::{Geometry as GdalGeometry, OGRwkbGeometryType};
use geo::{LineString, Polygon};

/// Convert object to a GDAL geometry
pub trait ToGdal {
    fn to_gdal(&self) -> Result<GdalGeometry>;
}

fn geometry_with_points(
    wkb_type: OGRwkbGeometryType::Type,
    points: &LineString<f64>,
) -> Result<GdalGeometry> {
    let mut geom = GdalGeometry::empty(wkb_type)?;
    for (i, coordinate) in points.0.iter().enumerate() {
        geom.set_point_2d(i, (coordinate.x, coordinate.y));
    }
    Ok(geom)
}

impl ToGdal for LineString<f64> {
    fn to_gdal(&self) -> Result<GdalGeometry> {
        geometry_with_points(OGRwkbGeometryType::wkbLineString, self)
    }
}

impl ToGdal for Polygon<f64> {
    fn to_gdal(&self) -> Result<GdalGeometry> {
        let mut geom = GdalGeometry::empty(OGRwkbGeometryType::wkbPolygon)?;
        geom.add_geometry(geometry_with_points(
            OGRwkbGeometryType::wkbLinearRing,
            self.exterior(),
        )?)?;
        for ring in self.interiors().iter() {
            geom.add_geometry(geometry_with_points(
                OGRwkbGeometryType::wkbLinearRing,
                ring,
            )?)?;
        }
        Ok(geom)
    }
}
