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
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Result};
use geo::Polygon;
use log::{debug, info};
use ndarray::Array2;
use structopt::StructOpt;

use lulc_util::config::AgglomConfig;
use lulc_util::raster::{
    crop_grid, crop_mask, data_window, label_components, largest_polygon_by_vertex_count,
    mask_where, rasterize_cadastre, sieve, trace_mask_polygons, write_geotiff, BitGrid, GridStats,
    UrbanFootprinter, Window, EIGHT_CONNECTED,
};
use lulc_util::util::format_duration;
use lulc_util::vector::write_extent_shapefile;

#[derive(StructOpt)]
pub struct MakeLulcArgs {
    #[structopt(parse(from_os_str), help = "Cadastre vector dataset")]
    pub cadastre_filepath: PathBuf,

    #[structopt(parse(from_os_str), help = "Destination GeoTIFF")]
    pub dst_tif_filepath: PathBuf,

    #[structopt(
        parse(from_os_str),
        help = "Destination shapefile; omit or pass an empty string to skip the vector output"
    )]
    pub dst_shp_filepath: Option<PathBuf>,

    #[structopt(long, default_value = "10", help = "Grid resolution in map units/pixel")]
    pub dst_res: u32,

    #[structopt(long, default_value = "1", help = "Number of urban clusters kept")]
    pub num_patches: usize,

    #[structopt(long, default_value = "500", help = "Footprint kernel radius in map units")]
    pub kernel_radius: u32,

    #[structopt(long, default_value = "0.15", help = "Urban density threshold")]
    pub urban_threshold: f64,

    #[structopt(long, default_value = "1000", help = "Outward buffer distance in map units")]
    pub buffer_dist: u32,

    #[structopt(long, default_value = "255")]
    pub dst_nodata_val: u8,
}

/// Result of the in-memory stages between the cadastre read and the file
/// writes, so the pipeline is testable on synthetic grids
struct ComputedExtent {
    window: Window,
    dst_stats: GridStats,
    dst_arr: Array2<u8>,
    //full-size lake component, the vector stage windows it separately
    lake_mask: BitGrid,
}

pub fn make_agglom_lulc(args: &MakeLulcArgs) -> Result<()> {
    let now = Instant::now();

    let config = AgglomConfig::default();

    info!(
        "preparing raster agglomeration LULC from {:?}",
        args.cadastre_filepath
    );

    let (cadastre_arr, cadastre_stats) = rasterize_cadastre(
        &args.cadastre_filepath,
        &config,
        args.dst_res,
        args.dst_nodata_val,
    )?;
    info!(
        "rasterized cadastre vector LULC dataset to shape {:?}",
        cadastre_stats.shape()
    );

    let computed = compute_extent(&cadastre_arr, &cadastre_stats, &config, args)?;

    write_geotiff(&args.dst_tif_filepath, &computed.dst_arr, &computed.dst_stats)?;
    info!("dumped rasterized dataset to {:?}", args.dst_tif_filepath);

    let shp_filepath = args
        .dst_shp_filepath
        .as_ref()
        .filter(|p| !p.as_os_str().is_empty());
    if let Some(shp_filepath) = shp_filepath {
        let urban_geom = urban_extent_geometry(&computed)?;
        let lake_geom = lake_extent_geometry(&computed.lake_mask, &cadastre_stats, &config)?;

        write_extent_shapefile(shp_filepath, &[urban_geom, lake_geom], &config.crs)?;
        info!("dumped extent geometry to {:?}", shp_filepath);
    }

    debug!("finished in {}", format_duration(now.elapsed()));

    Ok(())
}

/// Urban footprint, lake exclusion and extent windowing on the rasterized
/// cadastre grid
fn compute_extent(
    cadastre_arr: &Array2<u8>,
    cadastre_stats: &GridStats,
    config: &AgglomConfig,
    args: &MakeLulcArgs,
) -> Result<ComputedExtent> {
    //urban extent according to the criteria used in the "Atlas of Urban
    //Expansion, The 2016 Edition" by Angel, S. et al.
    let footprinter = UrbanFootprinter::new(cadastre_arr, &config.urban_classes, args.dst_res);
    let urban_mask = footprinter.compute_footprint_mask(
        args.kernel_radius,
        args.urban_threshold,
        args.num_patches,
        args.buffer_dist,
    );
    info!(
        "obtained extent of the {} largest urban cluster(s) ({} pixels)",
        args.num_patches,
        urban_mask.count_ones()
    );

    let (refined_mask, lake_mask) = exclude_lake(cadastre_arr, &urban_mask, config)?;

    let window = data_window(&refined_mask)?;
    let dst_stats = cadastre_stats.window(&window);
    let dst_arr = crop_grid(
        &mask_where(&refined_mask, cadastre_arr, args.dst_nodata_val),
        &window,
    );

    Ok(ComputedExtent {
        window,
        dst_stats,
        dst_arr,
        lake_mask,
    })
}

/// Removes the largest connected water body from the urban mask and sieves
/// out the small groups left behind
fn exclude_lake(
    cadastre_arr: &Array2<u8>,
    urban_mask: &BitGrid,
    config: &AgglomConfig,
) -> Result<(BitGrid, BitGrid)> {
    let (num_rows, num_cols) = cadastre_arr.dim();

    let water = BitGrid::from_fn(num_rows, num_cols, |r, c| {
        cadastre_arr[[r, c]] == config.water_class
    });

    let labels = label_components(&water, EIGHT_CONNECTED);
    let lake_label = match labels.largest() {
        Some(label) => label,
        None => bail!("no water-class cells in the rasterized cadastre, cannot exclude the lake"),
    };
    let lake_mask = labels.mask_of(lake_label);

    let refined = sieve(&urban_mask.and_not(&lake_mask), config.sieve_size);

    Ok((refined, lake_mask))
}

fn urban_extent_geometry(computed: &ComputedExtent) -> Result<Polygon<f64>> {
    let valid = BitGrid::from_fn(
        computed.window.num_rows,
        computed.window.num_cols,
        |r, c| computed.dst_arr[[r, c]] != computed.dst_stats.no_data_value,
    );

    extent_geometry(&valid, &computed.dst_stats)
}

/// The lake gets its own window and transform before tracing
fn lake_extent_geometry(
    lake_mask: &BitGrid,
    cadastre_stats: &GridStats,
    config: &AgglomConfig,
) -> Result<Polygon<f64>> {
    let lake_sieved = sieve(lake_mask, config.sieve_size);
    let lake_window = data_window(&lake_sieved)?;
    let lake_stats = cadastre_stats.window(&lake_window);

    extent_geometry(&crop_mask(&lake_sieved, &lake_window), &lake_stats)
}

fn extent_geometry(mask: &BitGrid, stats: &GridStats) -> Result<Polygon<f64>> {
    let polygons = trace_mask_polygons(mask, stats);
    match largest_polygon_by_vertex_count(polygons) {
        Some(polygon) => Ok(polygon),
        None => bail!("extent mask traced to no polygons"),
    }
}
