//! Sensor profiles and the classifier mapping asset names onto them.
//!
//! Every per-sensor rendering or geometry quirk is data on a [`SensorProfile`];
//! the classifier is the only place where an asset name is inspected to pick
//! one. Adding a sensor means adding a registry entry.
use serde::{Deserialize, Serialize};

use crate::types::{Resampling, Stretch, StretchRange, ZoomRange};

/// Zoom range policy of a profile
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ZoomPolicy {
    Fixed(ZoomRange),
    /// Derived from ground resolution and raster extent
    FromResolution,
}

/// How band descriptions are produced
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum BandLabels {
    /// Constant labels of a sensor with standard band semantics
    Fixed(&'static [&'static str]),
    /// `Band i (<wavelength> nm)` when the header carries wavelengths
    Spectral,
}

/// Immutable rendering and geometry policy of one sensor class
#[derive(Debug, PartialEq)]
pub struct SensorProfile {
    pub code: &'static str,
    /// Name prefix identifying the sensor; empty for the default profile
    pub prefix: &'static str,
    /// 1-based red, green, blue band indices for tiles and thumbnails
    pub rgb_bands: [usize; 3],
    pub tile_stretch: Stretch,
    pub thumbnail_stretch: Stretch,
    /// Resampling used when building the 8-bit tile composite
    pub composite_resampling: Resampling,
    /// Resampling used when rendering pyramid tiles
    pub tile_resampling: Resampling,
    pub thumbnail_resampling: Resampling,
    /// Treat zero as no-data in tiles and thumbnails
    pub zero_is_nodata: bool,
    pub zoom: ZoomPolicy,
    /// Header coordinates are stored as (northing, easting)
    pub axis_order_swapped: bool,
    pub band_labels: BandLabels,
}

impl SensorProfile {
    pub fn nodata(&self) -> Option<f64> {
        self.zero_is_nodata.then_some(0.0)
    }
}

const SENTINEL2_BANDS: &[&str] = &[
    "Band 1 - Coastal aerosol",
    "Band 2 - Blue",
    "Band 3 - Green",
    "Band 4 - Red",
    "Band 5 - Vegetation Red Edge",
    "Band 6 - Vegetation Red Edge",
    "Band 7 - Vegetation Red Edge",
    "Band 8 - NIR",
    "Band 8A - Vegetation Red Edge",
    "Band 9 - Water vapour",
    "Band 10 - SWIR/Cirrus",
    "Band 11 - SWIR",
    "Band 12 - SWIR",
];

const ASTER_BANDS: &[&str] = &[
    "VNIR Band 1 (Green)",
    "VNIR Band 2 (Red)",
    "VNIR Band 3N (NIR)",
    "SWIR Band 4",
    "SWIR Band 5",
    "SWIR Band 6",
    "SWIR Band 7",
    "SWIR Band 8",
    "SWIR Band 9",
    "TIR Band 10",
    "TIR Band 11",
    "TIR Band 12",
    "TIR Band 13",
    "TIR Band 14",
];

const DN_4096: Stretch = Stretch::Fixed(StretchRange::new(0.0, 4096.0));
const DN_4000: Stretch = Stretch::Fixed(StretchRange::new(0.0, 4000.0));

pub static SENTINEL2: SensorProfile = SensorProfile {
    code: "S2",
    prefix: "S2",
    rgb_bands: [4, 3, 2],
    tile_stretch: DN_4096,
    thumbnail_stretch: DN_4000,
    composite_resampling: Resampling::Bilinear,
    tile_resampling: Resampling::Bilinear,
    thumbnail_resampling: Resampling::Bilinear,
    zero_is_nodata: false,
    zoom: ZoomPolicy::FromResolution,
    axis_order_swapped: false,
    band_labels: BandLabels::Fixed(SENTINEL2_BANDS),
};

pub static GF5: SensorProfile = SensorProfile {
    code: "GF5",
    prefix: "GF5",
    // ~630 nm, ~550 nm, ~450 nm
    rgb_bands: [29, 20, 11],
    tile_stretch: DN_4096,
    thumbnail_stretch: Stretch::Fixed(StretchRange::new(0.0, 2000.0)),
    composite_resampling: Resampling::Cubic,
    tile_resampling: Resampling::Cubic,
    thumbnail_resampling: Resampling::Bilinear,
    zero_is_nodata: true,
    zoom: ZoomPolicy::Fixed(ZoomRange::new(8, 12)),
    axis_order_swapped: true,
    band_labels: BandLabels::Spectral,
};

pub static ASTER: SensorProfile = SensorProfile {
    code: "ASTER",
    prefix: "AST",
    rgb_bands: [3, 2, 1],
    tile_stretch: Stretch::Dynamic,
    thumbnail_stretch: Stretch::Dynamic,
    composite_resampling: Resampling::Average,
    tile_resampling: Resampling::Nearest,
    thumbnail_resampling: Resampling::Nearest,
    zero_is_nodata: true,
    zoom: ZoomPolicy::Fixed(ZoomRange::new(10, 14)),
    axis_order_swapped: false,
    band_labels: BandLabels::Fixed(ASTER_BANDS),
};

pub static PRISMA: SensorProfile = SensorProfile {
    code: "PRISMA",
    prefix: "PRS",
    rgb_bands: [29, 20, 11],
    tile_stretch: DN_4096,
    thumbnail_stretch: DN_4000,
    composite_resampling: Resampling::Average,
    tile_resampling: Resampling::Average,
    thumbnail_resampling: Resampling::Average,
    zero_is_nodata: true,
    zoom: ZoomPolicy::Fixed(ZoomRange::new(8, 12)),
    axis_order_swapped: false,
    band_labels: BandLabels::Spectral,
};

/// Returned when no registered prefix matches
pub static GENERIC: SensorProfile = SensorProfile {
    code: "GENERIC",
    prefix: "",
    rgb_bands: [4, 3, 2],
    tile_stretch: DN_4096,
    thumbnail_stretch: DN_4000,
    composite_resampling: Resampling::Bilinear,
    tile_resampling: Resampling::Bilinear,
    thumbnail_resampling: Resampling::Bilinear,
    zero_is_nodata: false,
    zoom: ZoomPolicy::FromResolution,
    axis_order_swapped: false,
    band_labels: BandLabels::Spectral,
};

/// Registered sensor profiles, excluding the default
pub static REGISTRY: [&SensorProfile; 4] = [&SENTINEL2, &GF5, &ASTER, &PRISMA];

/// Pick the profile whose prefix is the longest prefix of `base_name`
pub fn classify(base_name: &str) -> &'static SensorProfile {
    REGISTRY
        .iter()
        .copied()
        .filter(|p| !p.prefix.is_empty() && base_name.starts_with(p.prefix))
        .max_by_key(|p| p.prefix.len())
        .unwrap_or(&GENERIC)
}

/// Look a profile up by its stored code
pub fn profile_by_code(code: &str) -> Option<&'static SensorProfile> {
    REGISTRY
        .iter()
        .copied()
        .chain(std::iter::once(&GENERIC))
        .find(|p| p.code == code)
}

/// Profile bands, falling back to the first bands when the raster has too few
pub fn composite_bands(profile: &SensorProfile, band_count: usize) -> [usize; 3] {
    if profile.rgb_bands.iter().all(|&b| b >= 1 && b <= band_count) {
        profile.rgb_bands
    } else if band_count >= 3 {
        [1, 2, 3]
    } else {
        [1, 1, 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_registered_prefix_selects_its_profile() {
        for profile in REGISTRY {
            let name = format!("{}_20230615_scene", profile.prefix);
            assert_eq!(classify(&name).code, profile.code);
        }
    }

    #[test]
    fn unknown_prefix_selects_default() {
        assert_eq!(classify("XYZ_20230615_001").code, "GENERIC");
        assert_eq!(classify("").code, "GENERIC");
        assert_eq!(classify("s2a_lowercase").code, "GENERIC");
    }

    #[test]
    fn real_product_names() {
        assert_eq!(classify("S2A_MSIL2A_20230615T030521_N0509").code, "S2");
        assert_eq!(classify("GF5_AHSI_E116.5_N40.1_20190312_004583").code, "GF5");
        assert_eq!(classify("AST_L1T_00306152023031521_20230616").code, "ASTER");
        assert_eq!(classify("PRS_L2D_STD_20230615101234_0001").code, "PRISMA");
    }

    #[test]
    fn prefixes_are_distinct() {
        for (i, a) in REGISTRY.iter().enumerate() {
            for b in REGISTRY.iter().skip(i + 1) {
                assert_ne!(a.prefix, b.prefix);
                assert_ne!(a.code, b.code);
            }
        }
    }

    #[test]
    fn only_gf5_swaps_axes() {
        let swapped: Vec<_> = REGISTRY
            .iter()
            .filter(|p| p.axis_order_swapped)
            .map(|p| p.code)
            .collect();
        assert_eq!(swapped, vec!["GF5"]);
        assert!(!GENERIC.axis_order_swapped);
    }

    #[test]
    fn codes_round_trip() {
        for profile in REGISTRY.iter().copied().chain(std::iter::once(&GENERIC)) {
            assert_eq!(profile_by_code(profile.code), Some(profile));
        }
        assert_eq!(profile_by_code("LANDSAT"), None);
    }

    #[test]
    fn composite_bands_fall_back_for_small_rasters() {
        assert_eq!(composite_bands(&GF5, 330), [29, 20, 11]);
        assert_eq!(composite_bands(&GF5, 4), [1, 2, 3]);
        assert_eq!(composite_bands(&SENTINEL2, 2), [1, 1, 1]);
    }
}
