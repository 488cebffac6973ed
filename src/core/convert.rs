//! Conversion of a raw image into the canonical tiled/compressed GeoTIFF,
//! with an optional rectification pass driven by the onboard geolocation model.
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{Degradation, Error, Result};
use crate::io::scratch::{ScratchDir, remove_quietly};
use crate::io::toolkit::{RasterInfo, RasterToolkit, TranslateOptions, WarpOptions};

/// Outcome of the rectification pass
#[derive(Debug, Clone, PartialEq)]
pub enum Rectification {
    /// No geolocation model announced by the header
    Skipped,
    Applied,
    /// Attempted and failed; the unrectified raster was kept
    Failed(Degradation),
}

/// Canonical raster living in a scratch directory
#[derive(Debug, Clone)]
pub struct CanonicalRaster {
    pub path: PathBuf,
    pub info: RasterInfo,
    pub rectification: Rectification,
}

impl CanonicalRaster {
    pub fn rectified(&self) -> bool {
        self.rectification == Rectification::Applied
    }
}

/// Convert `image` into `{scratch}/{name}.tif`.
///
/// Failing to open or translate the source is fatal. A failed rectification
/// is logged, its partial output removed, and the unrectified raster kept.
pub fn convert<T: RasterToolkit + ?Sized>(
    toolkit: &T,
    image: &Path,
    name: &str,
    has_geolocation_model: bool,
    scratch: &ScratchDir,
) -> Result<CanonicalRaster> {
    let source = toolkit
        .describe(image)
        .map_err(|e| Error::format(image, e))?;
    info!(
        "Source raster {:?}: {}x{}, {} bands",
        image, source.width, source.height, source.band_count
    );

    let canonical = scratch.join(&format!("{}.tif", name));
    toolkit.translate(image, &canonical, &TranslateOptions::canonical_geotiff())?;

    let rectification = if has_geolocation_model {
        rectify(toolkit, &canonical, scratch, name)
    } else {
        info!("No geolocation model, skipping rectification");
        Rectification::Skipped
    };

    let info = toolkit
        .describe(&canonical)
        .map_err(|e| Error::format(&canonical, e))?;

    Ok(CanonicalRaster {
        path: canonical,
        info,
        rectification,
    })
}

fn rectify<T: RasterToolkit + ?Sized>(
    toolkit: &T,
    canonical: &Path,
    scratch: &ScratchDir,
    name: &str,
) -> Rectification {
    let warped = scratch.join(&format!("{}_warp.tif", name));
    info!("Applying RPC rectification to {:?}", canonical);
    let result = toolkit
        .warp(canonical, &warped, &WarpOptions::rectification())
        .map_err(|e| e.to_string())
        .and_then(|_| std::fs::rename(&warped, canonical).map_err(|e| e.to_string()));
    match result {
        Ok(()) => {
            info!("Rectification applied");
            Rectification::Applied
        }
        Err(reason) => {
            remove_quietly(&warped);
            let d = Degradation::Rectification(reason);
            warn!("{}", d);
            Rectification::Failed(d)
        }
    }
}
