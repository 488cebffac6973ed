//! Derivation of the remaining record fields (acquisition date, band
//! descriptions) and assembly of the final [`RasterAsset`].
use chrono::{Local, NaiveDate};
use tracing::warn;

use crate::core::sensor::{BandLabels, SensorProfile};
use crate::error::Degradation;
use crate::types::{BoundingPolygon, GeoPoint, RasterAsset, SourceFiles, WavelengthInfo, ZoomRange};

/// Acquisition date from the first `_`-separated token that starts with a
/// valid `YYYYMMDD` date
pub fn acquisition_date(name: &str) -> Option<NaiveDate> {
    name.split('_').find_map(|token| {
        let head = token.get(..8)?;
        if !head.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        NaiveDate::parse_from_str(head, "%Y%m%d").ok()
    })
}

/// Exactly `band_count` labels following the profile's labelling scheme
pub fn band_descriptions(
    profile: &SensorProfile,
    band_count: usize,
    wavelength: Option<&WavelengthInfo>,
) -> Vec<String> {
    (1..=band_count)
        .map(|i| match profile.band_labels {
            BandLabels::Fixed(labels) => labels
                .get(i - 1)
                .map(|l| l.to_string())
                .unwrap_or_else(|| generic_label(i)),
            BandLabels::Spectral => match wavelength.and_then(|w| w.wavelengths.get(i - 1)) {
                Some(wl) => format!("Band {} ({:.2} nm)", i, wl),
                None => generic_label(i),
            },
        })
        .collect()
}

fn generic_label(i: usize) -> String {
    format!("Band {}", i)
}

/// Everything derived by the earlier pipeline stages
#[derive(Debug, Clone)]
pub struct AssetParts<'a> {
    pub name: &'a str,
    pub profile: &'a SensorProfile,
    pub resolution: f64,
    pub coordinate_system: String,
    pub bounds: BoundingPolygon,
    pub center_point: GeoPoint,
    pub band_count: usize,
    pub wavelength: Option<WavelengthInfo>,
    pub tile_url: String,
    pub zoom: ZoomRange,
    pub thumbnail: Option<String>,
    pub rectified: bool,
    pub source: SourceFiles,
}

/// Bundle the parts into a record. A name without a date falls back to
/// today and records a degradation.
pub fn assemble(parts: AssetParts<'_>, degradations: &mut Vec<Degradation>) -> RasterAsset {
    let acquisition_date = acquisition_date(parts.name).unwrap_or_else(|| {
        let d = Degradation::AcquisitionDate(parts.name.to_string());
        warn!("{}", d);
        degradations.push(d);
        Local::now().date_naive()
    });
    let band_descriptions =
        band_descriptions(parts.profile, parts.band_count, parts.wavelength.as_ref());

    RasterAsset {
        name: parts.name.to_string(),
        sensor: parts.profile.code.to_string(),
        acquisition_date,
        resolution: parts.resolution,
        coordinate_system: parts.coordinate_system,
        bounds: parts.bounds,
        center_point: parts.center_point,
        band_count: parts.band_count,
        band_descriptions,
        wavelength: parts.wavelength,
        tile_url: parts.tile_url,
        zoom: parts.zoom,
        thumbnail: parts.thumbnail,
        rectified: parts.rectified,
        source: parts.source,
    }
}
