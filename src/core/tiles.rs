//! XYZ tile pyramid generation.
//!
//! The canonical raster is reduced to an 8-bit RGB composite, virtually
//! warped to Web Mercator at the resolution of the deepest zoom level, and
//! cut into `{z}/{x}/{y}.png` tiles. Tiles are grouped into regions (one row
//! of one zoom level) which are rendered on a fixed-size worker pool; every
//! tile is an independent toolkit invocation reading the same warped source.
use std::f64::consts::PI;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::core::bounds::raster_corners;
use crate::core::params::PipelineConfig;
use crate::core::render::RenderContext;
use crate::core::sensor::{SensorProfile, ZoomPolicy};
use crate::error::{Error, Result};
use crate::io::scratch::remove_tree_quietly;
use crate::io::toolkit::{RasterToolkit, TranslateOptions, WarpOptions};
use crate::types::{BoundingPolygon, StretchRange, ZoomRange};

/// Equatorial circumference of the WGS84 ellipsoid in meters
pub const EARTH_CIRCUMFERENCE: f64 = 40_075_016.686;
/// Half the Web Mercator world width in meters
pub const ORIGIN_SHIFT: f64 = PI * 6_378_137.0;

/// Ground resolution upper bounds (m/px) and the deepest zoom they support
const MAX_ZOOM_TABLE: [(f64, u8); 6] = [
    (2.5, 16),
    (5.0, 15),
    (10.0, 14),
    (20.0, 13),
    (60.0, 12),
    (250.0, 10),
];
const COARSEST_MAX_ZOOM: u8 = 8;

/// Deepest useful zoom level for a ground resolution in meters per pixel
pub fn max_zoom_for_resolution(resolution: f64) -> u8 {
    MAX_ZOOM_TABLE
        .iter()
        .find(|(limit, _)| resolution <= *limit)
        .map(|(_, zoom)| *zoom)
        .unwrap_or(COARSEST_MAX_ZOOM)
}

/// Shallowest zoom level at which the raster spans a meaningful share of the world
pub fn min_zoom_for_extent(resolution: f64, width: usize) -> u8 {
    let ground_width = resolution * width as f64;
    if !(ground_width.is_finite() && ground_width > 0.0) {
        return 1;
    }
    let zoom = (EARTH_CIRCUMFERENCE / ground_width).log2().round();
    zoom.clamp(1.0, u8::MAX as f64) as u8
}

/// Zoom range of a raster under a profile's zoom policy
pub fn zoom_range(policy: ZoomPolicy, resolution: f64, width: usize) -> ZoomRange {
    match policy {
        ZoomPolicy::Fixed(range) => range,
        ZoomPolicy::FromResolution => {
            let max = max_zoom_for_resolution(resolution);
            let min = min_zoom_for_extent(resolution, width).min(max);
            ZoomRange::new(min, max)
        }
    }
}

/// Web Mercator meters per pixel at `zoom`
pub fn mercator_resolution(zoom: u8, tile_size: usize) -> f64 {
    2.0 * ORIGIN_SHIFT / (tile_size as f64 * 2f64.powi(zoom as i32))
}

/// Mercator bounds of an XYZ tile as [ulx, uly, lrx, lry]
pub fn tile_bounds(z: u8, x: u32, y: u32) -> [f64; 4] {
    let span = 2.0 * ORIGIN_SHIFT / 2f64.powi(z as i32);
    let ulx = -ORIGIN_SHIFT + x as f64 * span;
    let uly = ORIGIN_SHIFT - y as f64 * span;
    [ulx, uly, ulx + span, uly - span]
}

/// Mercator envelope as (min_x, min_y, max_x, max_y)
pub type Extent = (f64, f64, f64, f64);

/// Inclusive XYZ index ranges ((x0, x1), (y0, y1)) of the tiles intersecting `extent`
pub fn tile_index_range(extent: Extent, z: u8) -> ((u32, u32), (u32, u32)) {
    let (min_x, min_y, max_x, max_y) = extent;
    let n = 2f64.powi(z as i32);
    let span = 2.0 * ORIGIN_SHIFT / n;
    let last = n - 1.0;
    let index = |v: f64| v.floor().clamp(0.0, last) as u32;
    // shrink the far edge so a boundary exactly on a tile edge stays exclusive
    let eps = 1e-9;
    let x0 = index((min_x + ORIGIN_SHIFT) / span);
    let x1 = index((max_x + ORIGIN_SHIFT) / span - eps);
    let y0 = index((ORIGIN_SHIFT - max_y) / span);
    let y1 = index((ORIGIN_SHIFT - min_y) / span - eps);
    ((x0, x1.max(x0)), (y0, y1.max(y0)))
}

/// One row of tiles at one zoom level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRegion {
    pub z: u8,
    pub y: u32,
    pub x0: u32,
    pub x1: u32,
}

impl TileRegion {
    pub fn tile_count(&self) -> usize {
        (self.x1 - self.x0 + 1) as usize
    }
}

/// Regions covering `extent` for every level of `zoom`
pub fn plan_regions(extent: Extent, zoom: ZoomRange) -> Vec<TileRegion> {
    let mut regions = Vec::new();
    for z in zoom.levels() {
        let ((x0, x1), (y0, y1)) = tile_index_range(extent, z);
        for y in y0..=y1 {
            regions.push(TileRegion { z, y, x0, x1 });
        }
    }
    regions
}

/// A rendered pyramid
#[derive(Debug, Clone, PartialEq)]
pub struct TilePyramid {
    pub url_template: String,
    pub zoom: ZoomRange,
    pub directory: PathBuf,
    pub tile_count: usize,
}

/// Render the pyramid of `name` into `{tiles_dir}/{name}`.
///
/// Tiles are written to a staging tree next to the published one, which is
/// only replaced once every tile rendered. Any failing toolkit invocation
/// aborts generation, removes the staging tree and leaves a previously
/// published pyramid untouched.
pub fn generate_tiles<T: RasterToolkit + ?Sized>(
    ctx: &RenderContext<'_, T>,
    zoom: ZoomRange,
    stretch: StretchRange,
) -> Result<TilePyramid> {
    let (toolkit, profile, name, config) = (ctx.toolkit, ctx.profile, ctx.name, ctx.config);
    let bands = ctx.composite_bands();
    if bands != profile.rgb_bands {
        warn!(
            "Raster has {} bands, rendering bands {:?} instead of {:?}",
            ctx.band_count, bands, profile.rgb_bands
        );
    }

    let composite = ctx.scratch.join(&format!("{}_tiles_rgb.vrt", name));
    let composite_opts = TranslateOptions::new("VRT")
        .bands(&bands)
        .byte_stretch(stretch)
        .resampling(profile.composite_resampling)
        .nodata(profile.nodata());
    toolkit.translate(ctx.canonical, &composite, &composite_opts)?;

    let mercator = ctx.scratch.join(&format!("{}_3857.vrt", name));
    let warp_opts = WarpOptions::web_mercator(
        profile.tile_resampling,
        mercator_resolution(zoom.max, config.tile_size),
        profile.nodata(),
    );
    toolkit.warp(&composite, &mercator, &warp_opts)?;

    let warped = toolkit.describe(&mercator)?;
    let extent = BoundingPolygon::from_corners(raster_corners(
        &warped.geo_transform,
        warped.width,
        warped.height,
    ))
    .envelope();
    debug!("Mercator extent: {:?}", extent);

    let regions = plan_regions(extent, zoom);
    let tile_count: usize = regions.iter().map(TileRegion::tile_count).sum();
    info!(
        "Rendering {} tiles in {} regions, zoom {}, {} workers",
        tile_count,
        regions.len(),
        zoom,
        config.tile_workers
    );

    let directory = config.tiles_dir.join(name);
    let staging = config.tiles_dir.join(format!(".{}.partial", name));
    remove_tree_quietly(&staging);
    std::fs::create_dir_all(&staging)?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.tile_workers)
        .build()
        .map_err(|e| Error::Configuration(format!("cannot build tile worker pool: {}", e)))?;

    let rendered = pool
        .install(|| {
            regions.par_iter().try_for_each(|region| {
                render_region(toolkit, &mercator, &staging, region, profile, config.tile_size)
            })
        })
        .and_then(|()| swap_into_place(&staging, &directory, name, config));
    if let Err(e) = rendered {
        remove_tree_quietly(&staging);
        return Err(e);
    }

    info!("Tile pyramid written to {:?}", directory);
    Ok(TilePyramid {
        url_template: config.tile_url_template(name),
        zoom,
        directory,
        tile_count,
    })
}

/// Replace `directory` with the rendered `staging` tree. The previous tree
/// is moved aside first and restored if the swap fails.
fn swap_into_place(
    staging: &Path,
    directory: &Path,
    name: &str,
    config: &PipelineConfig,
) -> Result<()> {
    let retired = config.tiles_dir.join(format!(".{}.old", name));
    remove_tree_quietly(&retired);
    let had_previous = directory.exists();
    if had_previous {
        std::fs::rename(directory, &retired)?;
    }
    if let Err(e) = std::fs::rename(staging, directory) {
        if had_previous {
            if let Err(restore) = std::fs::rename(&retired, directory) {
                warn!("Cannot restore previous pyramid {:?}: {}", directory, restore);
            }
        }
        return Err(e.into());
    }
    remove_tree_quietly(&retired);
    Ok(())
}

fn render_region<T: RasterToolkit + ?Sized>(
    toolkit: &T,
    source: &Path,
    directory: &Path,
    region: &TileRegion,
    profile: &SensorProfile,
    tile_size: usize,
) -> Result<()> {
    let row = directory.join(region.z.to_string());
    for x in region.x0..=region.x1 {
        let column = row.join(x.to_string());
        std::fs::create_dir_all(&column)?;
        let tile = column.join(format!("{}.png", region.y));
        let opts = TranslateOptions::new("PNG")
            .projwin(tile_bounds(region.z, x, region.y))
            .out_size(tile_size, tile_size)
            .resampling(profile.tile_resampling);
        toolkit.translate(source, &tile, &opts)?;
    }
    Ok(())
}
