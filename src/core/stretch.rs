use std::path::Path;

use tracing::{debug, warn};

use crate::error::Degradation;
use crate::io::toolkit::RasterToolkit;
use crate::types::{Stretch, StretchRange};

/// Range used when dynamic statistics are unavailable
pub const FALLBACK_RANGE: StretchRange = StretchRange::new(0.0, 255.0);

/// Resolve a profile stretch against a concrete raster.
///
/// Dynamic stretching spans the min/max statistics of the first two bands
/// (only the first when the raster has one band). A statistics failure
/// falls back to [`FALLBACK_RANGE`] and records a degradation.
pub fn resolve<T: RasterToolkit + ?Sized>(
    toolkit: &T,
    raster: &Path,
    band_count: usize,
    stretch: Stretch,
    degradations: &mut Vec<Degradation>,
) -> StretchRange {
    match stretch {
        Stretch::Fixed(range) => range,
        Stretch::Dynamic => match dynamic_range(toolkit, raster, band_count) {
            Ok(range) => {
                debug!("Dynamic stretch: {} to {}", range.min, range.max);
                range
            }
            Err(reason) => {
                let d = Degradation::Statistics(reason);
                warn!("{}", d);
                degradations.push(d);
                FALLBACK_RANGE
            }
        },
    }
}

fn dynamic_range<T: RasterToolkit + ?Sized>(
    toolkit: &T,
    raster: &Path,
    band_count: usize,
) -> Result<StretchRange, String> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for band in 1..=band_count.clamp(1, 2) {
        let (lo, hi) = toolkit
            .band_range(raster, band)
            .map_err(|e| format!("band {}: {}", band, e))?;
        min = min.min(lo);
        max = max.max(hi);
    }
    if !min.is_finite() || !max.is_finite() || max <= min {
        return Err(format!("degenerate band range {} to {}", min, max));
    }
    Ok(StretchRange::new(min, max))
}
