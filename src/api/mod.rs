//! High-level library API: single and batch ingestion of header/image pairs,
//! plus maintenance operations on already-ingested records. Prefer these
//! entrypoints over the individual `core` stages when embedding SPECTILE.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::core::assemble::{AssetParts, assemble};
use crate::core::bounds::{compute_bounds, ground_resolution};
use crate::core::convert::{Rectification, convert};
use crate::core::params::PipelineConfig;
use crate::core::render::RenderContext;
use crate::core::sensor::{SensorProfile, classify, profile_by_code};
use crate::core::stretch;
use crate::core::thumbnail::generate_thumbnail;
use crate::core::tiles::{generate_tiles, zoom_range};
use crate::error::{Degradation, Error, Result};
use crate::io::gdal::GdalToolkit;
use crate::io::header;
use crate::io::scratch::ScratchDir;
use crate::io::store::{AssetStore, UpsertOutcome};
use crate::io::toolkit::RasterToolkit;
use crate::types::{RasterAsset, SourceFiles, StretchRange};

/// Extension of header files paired by [`ingest_directory`]
pub const HEADER_EXTENSION: &str = "hdr";
/// Extension of raw image files paired by [`ingest_directory`]
pub const IMAGE_EXTENSION: &str = "img";

/// Result of one successful ingestion run
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub asset: RasterAsset,
    pub upsert: UpsertOutcome,
    /// Recoverable failures met during the run, in pipeline order
    pub degradations: Vec<Degradation>,
}

/// Validate the configuration and check that the GDAL utilities can be
/// launched. Run once before any processing.
pub fn prepare_toolkit(config: &PipelineConfig) -> Result<GdalToolkit> {
    config.validate()?;
    let toolkit = GdalToolkit::new(config.toolkit.clone());
    toolkit
        .probe()
        .map_err(|e| Error::Configuration(format!("GDAL utilities unavailable: {}", e)))?;
    Ok(toolkit)
}

/// Base name shared by a header/image pair
pub fn base_name(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidArgument {
            arg: "image",
            value: path.display().to_string(),
        })
}

/// Run the full pipeline on one header/image pair and upsert the record.
///
/// Fatal failures (unreadable raster, failed conversion or tile rendering,
/// persistence) return an error and commit nothing. Everything else
/// degrades and is reported in [`IngestOutcome::degradations`].
pub fn ingest<T, S>(
    header_path: &Path,
    image: &Path,
    config: &PipelineConfig,
    toolkit: &T,
    store: &S,
) -> Result<IngestOutcome>
where
    T: RasterToolkit + ?Sized,
    S: AssetStore + ?Sized,
{
    let name = base_name(image)?;
    if base_name(header_path).ok().as_deref() != Some(name.as_str()) {
        warn!("Header {:?} does not share the base name {}", header_path, name);
    }
    let profile = classify(&name);
    info!("Ingesting {} as {}", name, profile.code);

    let mut degradations = Vec::new();
    let header = header::read(header_path);
    degradations.extend(header.issues.iter().cloned().map(Degradation::Header));

    let scratch = ScratchDir::new(config.scratch_dir.as_deref(), &format!("spectile_{}_", name))?;
    let canonical = convert(
        toolkit,
        image,
        &name,
        header.has_geolocation_model,
        &scratch,
    )?;
    if let Rectification::Failed(d) = &canonical.rectification {
        degradations.push(d.clone());
    }
    let info = &canonical.info;

    let resolution = ground_resolution(&info.geo_transform, info.projection.as_deref());
    let bounds = compute_bounds(
        toolkit,
        &info.geo_transform,
        info.width,
        info.height,
        info.projection.as_deref(),
        profile,
    );
    degradations.extend(bounds.degradations.iter().cloned());

    let zoom = zoom_range(profile.zoom, resolution, info.width);
    info!("Resolution {:.3} m/px, zoom {}", resolution, zoom);

    let (tile_stretch, thumbnail_stretch) =
        resolve_stretches(toolkit, &canonical.path, info.band_count, profile, &mut degradations);

    let render = RenderContext {
        toolkit,
        canonical: &canonical.path,
        band_count: info.band_count,
        profile,
        name: &name,
        config,
        scratch: &scratch,
    };
    let pyramid = generate_tiles(&render, zoom, tile_stretch)?;

    let thumbnail = match generate_thumbnail(&render, thumbnail_stretch) {
        Ok(reference) => Some(reference),
        Err(d) => {
            degradations.push(d);
            None
        }
    };

    let asset = assemble(
        AssetParts {
            name: &name,
            profile,
            resolution,
            coordinate_system: bounds.crs_name,
            bounds: bounds.polygon,
            center_point: bounds.centroid,
            band_count: info.band_count,
            wavelength: header.wavelength,
            tile_url: pyramid.url_template,
            zoom: pyramid.zoom,
            thumbnail,
            rectified: canonical.rectified(),
            source: SourceFiles {
                header: header_path.to_path_buf(),
                image: image.to_path_buf(),
            },
        },
        &mut degradations,
    );

    let upsert = store.upsert(&asset)?;
    info!(
        "Stored {} ({:?}, {} degradations)",
        asset.name,
        upsert,
        degradations.len()
    );
    Ok(IngestOutcome {
        asset,
        upsert,
        degradations,
    })
}

fn resolve_stretches<T: RasterToolkit + ?Sized>(
    toolkit: &T,
    raster: &Path,
    band_count: usize,
    profile: &SensorProfile,
    degradations: &mut Vec<Degradation>,
) -> (StretchRange, StretchRange) {
    let tiles = stretch::resolve(toolkit, raster, band_count, profile.tile_stretch, degradations);
    let thumbnails = if profile.thumbnail_stretch == profile.tile_stretch {
        tiles
    } else {
        stretch::resolve(
            toolkit,
            raster,
            band_count,
            profile.thumbnail_stretch,
            degradations,
        )
    };
    (tiles, thumbnails)
}

/// Batch ingestion report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub processed: usize,
    /// Files without their header or image counterpart
    pub skipped: usize,
    pub errors: usize,
    /// Successful runs that reported at least one degradation
    pub degraded: usize,
}

/// Header/image pairs of `input_dir` keyed by base name, and the number of
/// files whose counterpart is missing
pub fn pair_inputs(input_dir: &Path) -> Result<(Vec<(PathBuf, PathBuf)>, usize)> {
    let mut found: BTreeMap<String, (Option<PathBuf>, Option<PathBuf>)> = BTreeMap::new();
    for entry in std::fs::read_dir(input_dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        let Ok(stem) = base_name(&path) else {
            continue;
        };
        let slot = found.entry(stem).or_default();
        match ext.to_ascii_lowercase().as_str() {
            HEADER_EXTENSION => slot.0 = Some(path),
            IMAGE_EXTENSION => slot.1 = Some(path),
            _ => {}
        }
    }

    let mut pairs = Vec::new();
    let mut incomplete = 0;
    for (stem, slot) in found {
        match slot {
            (Some(h), Some(i)) => pairs.push((h, i)),
            (None, None) => {}
            _ => {
                warn!("Skipping {}: header/image pair incomplete", stem);
                incomplete += 1;
            }
        }
    }
    Ok((pairs, incomplete))
}

/// Ingest every complete header/image pair in `input_dir`.
/// If `continue_on_error` is true, failures are counted and processing
/// continues; otherwise the first error is returned.
pub fn ingest_directory<T, S>(
    input_dir: &Path,
    config: &PipelineConfig,
    toolkit: &T,
    store: &S,
    continue_on_error: bool,
) -> Result<BatchReport>
where
    T: RasterToolkit + ?Sized,
    S: AssetStore + ?Sized,
{
    let (pairs, skipped) = pair_inputs(input_dir)?;
    let mut report = BatchReport {
        skipped,
        ..BatchReport::default()
    };
    info!("Found {} header/image pairs in {:?}", pairs.len(), input_dir);

    for (header_path, image) in pairs {
        match ingest(&header_path, &image, config, toolkit, store) {
            Ok(outcome) => {
                report.processed += 1;
                if !outcome.degradations.is_empty() {
                    report.degraded += 1;
                }
            }
            Err(e) => {
                report.errors += 1;
                error!("Failed to ingest {:?}: {}", image, e);
                if !continue_on_error {
                    return Err(e);
                }
            }
        }
    }

    info!(
        "Batch complete: processed={} skipped={} errors={} degraded={}",
        report.processed, report.skipped, report.errors, report.degraded
    );
    Ok(report)
}

/// Report of a maintenance operation over stored records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

fn stored_profile(asset: &RasterAsset) -> &'static SensorProfile {
    profile_by_code(&asset.sensor).unwrap_or_else(|| classify(&asset.name))
}

/// Re-render the thumbnail of every stored asset from its raw image
pub fn regenerate_thumbnails<T, S>(
    config: &PipelineConfig,
    toolkit: &T,
    store: &S,
) -> Result<MaintenanceReport>
where
    T: RasterToolkit + ?Sized,
    S: AssetStore + ?Sized,
{
    let mut report = MaintenanceReport::default();
    for mut asset in store.list()? {
        if !asset.source.image.is_file() {
            warn!(
                "Skipping {}: raw image {:?} not found",
                asset.name, asset.source.image
            );
            report.skipped += 1;
            continue;
        }
        let profile = stored_profile(&asset);
        let scratch = ScratchDir::new(
            config.scratch_dir.as_deref(),
            &format!("spectile_thumb_{}_", asset.name),
        )?;
        let canonical = match convert(toolkit, &asset.source.image, &asset.name, false, &scratch) {
            Ok(c) => c,
            Err(e) => {
                warn!("ThumbnailError: cannot convert {}: {}", asset.name, e);
                report.failed += 1;
                continue;
            }
        };
        let mut degradations = Vec::new();
        let range = stretch::resolve(
            toolkit,
            &canonical.path,
            canonical.info.band_count,
            profile.thumbnail_stretch,
            &mut degradations,
        );
        let render = RenderContext {
            toolkit,
            canonical: &canonical.path,
            band_count: canonical.info.band_count,
            profile,
            name: &asset.name,
            config,
            scratch: &scratch,
        };
        match generate_thumbnail(&render, range) {
            Ok(reference) => {
                asset.thumbnail = Some(reference);
                store.upsert(&asset)?;
                report.updated += 1;
            }
            Err(_) => report.failed += 1,
        }
    }
    info!(
        "Thumbnails regenerated: updated={} skipped={} failed={}",
        report.updated, report.skipped, report.failed
    );
    Ok(report)
}

/// Exchange the axes of the stored bounds and centroid of every asset whose
/// profile stores coordinates as (northing, easting). Each call flips the
/// stored order once.
pub fn swap_axis_order<S: AssetStore + ?Sized>(store: &S) -> Result<MaintenanceReport> {
    let mut report = MaintenanceReport::default();
    for mut asset in store.list()? {
        if !stored_profile(&asset).axis_order_swapped {
            report.skipped += 1;
            continue;
        }
        asset.bounds = asset.bounds.swapped();
        asset.center_point = asset.center_point.swapped();
        store.upsert(&asset)?;
        info!("Swapped axis order of {}", asset.name);
        report.updated += 1;
    }
    Ok(report)
}
