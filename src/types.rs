//! Shared types used across SPECTILE.
//! Includes geodetic geometry (`GeoPoint`, `BoundingPolygon`), rendering
//! policy primitives (`Resampling`, `Stretch`, `ZoomRange`) and the
//! `RasterAsset` record produced by every ingestion run.
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A point in WGS84 longitude/latitude order (x = longitude, y = latitude)
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub x: f64,
    pub y: f64,
}

impl GeoPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Same point with its two axes exchanged
    pub fn swapped(self) -> Self {
        Self {
            x: self.y,
            y: self.x,
        }
    }
}

/// Closed five-point ring: top-left, top-right, bottom-right, bottom-left, top-left
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingPolygon {
    pub points: [GeoPoint; 5],
}

impl BoundingPolygon {
    /// Build a ring from four corners, repeating the first to close it
    pub fn from_corners(corners: [GeoPoint; 4]) -> Self {
        Self {
            points: [corners[0], corners[1], corners[2], corners[3], corners[0]],
        }
    }

    pub fn is_closed(&self) -> bool {
        self.points[0] == self.points[4]
    }

    /// Area-weighted centroid of the ring. Degenerate (zero-area) rings
    /// fall back to the mean of the four distinct vertices.
    ///
    /// Sums are taken relative to the first vertex so small footprints far
    /// from the origin keep their precision.
    pub fn centroid(&self) -> GeoPoint {
        let origin = self.points[0];
        let mut twice_area = 0.0;
        let mut cx = 0.0;
        let mut cy = 0.0;
        for pair in self.points.windows(2) {
            let (ax, ay) = (pair[0].x - origin.x, pair[0].y - origin.y);
            let (bx, by) = (pair[1].x - origin.x, pair[1].y - origin.y);
            let cross = ax * by - bx * ay;
            twice_area += cross;
            cx += (ax + bx) * cross;
            cy += (ay + by) * cross;
        }
        let (min_x, min_y, max_x, max_y) = self.envelope();
        let envelope_area = (max_x - min_x) * (max_y - min_y);
        if !(twice_area.abs() > envelope_area * 1e-12) {
            let n = 4.0;
            let sx: f64 = self.points[..4].iter().map(|p| p.x).sum();
            let sy: f64 = self.points[..4].iter().map(|p| p.y).sum();
            return GeoPoint::new(sx / n, sy / n);
        }
        GeoPoint::new(
            origin.x + cx / (3.0 * twice_area),
            origin.y + cy / (3.0 * twice_area),
        )
    }

    /// Axis-aligned envelope as (min_x, min_y, max_x, max_y)
    pub fn envelope(&self) -> (f64, f64, f64, f64) {
        self.points.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(min_x, min_y, max_x, max_y), p| {
                (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
            },
        )
    }

    /// Same ring with every point's axes exchanged
    pub fn swapped(&self) -> Self {
        Self {
            points: self.points.map(GeoPoint::swapped),
        }
    }
}

/// Resampling algorithms understood by the raster toolkit
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Resampling {
    Nearest,
    Bilinear,
    Cubic,
    Average,
}

impl Resampling {
    /// Name as accepted by GDAL's `-r` option
    pub fn as_gdal(&self) -> &'static str {
        match self {
            Resampling::Nearest => "near",
            Resampling::Bilinear => "bilinear",
            Resampling::Cubic => "cubic",
            Resampling::Average => "average",
        }
    }
}

impl std::fmt::Display for Resampling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_gdal())
    }
}

/// Input value range mapped onto 0..255 when building 8-bit composites
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct StretchRange {
    pub min: f64,
    pub max: f64,
}

impl StretchRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Stretch policy of a sensor profile
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum Stretch {
    Fixed(StretchRange),
    /// Computed from the min/max statistics of bands 1 and 2
    Dynamic,
}

/// Inclusive zoom level range of a tile pyramid
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ZoomRange {
    pub min: u8,
    pub max: u8,
}

impl ZoomRange {
    pub const fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    pub fn levels(&self) -> impl Iterator<Item = u8> {
        self.min..=self.max
    }
}

impl std::fmt::Display for ZoomRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Wavelength centres, always stored in nanometers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WavelengthInfo {
    pub wavelengths: Vec<f64>,
    pub units: String,
}

pub const NANOMETERS: &str = "Nanometers";

/// Paths of the raw header/image pair an asset was ingested from
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceFiles {
    pub header: PathBuf,
    pub image: PathBuf,
}

/// Metadata record produced by one ingestion run, keyed by `name`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RasterAsset {
    pub name: String,
    pub sensor: String,
    pub acquisition_date: NaiveDate,
    /// Ground resolution in meters per pixel
    pub resolution: f64,
    pub coordinate_system: String,
    pub bounds: BoundingPolygon,
    pub center_point: GeoPoint,
    pub band_count: usize,
    pub band_descriptions: Vec<String>,
    pub wavelength: Option<WavelengthInfo>,
    pub tile_url: String,
    pub zoom: ZoomRange,
    pub thumbnail: Option<String>,
    pub rectified: bool,
    pub source: SourceFiles,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> BoundingPolygon {
        BoundingPolygon::from_corners([
            GeoPoint::new(x0, y0),
            GeoPoint::new(x1, y0),
            GeoPoint::new(x1, y1),
            GeoPoint::new(x0, y1),
        ])
    }

    #[test]
    fn ring_is_closed() {
        assert!(rect(0.0, 10.0, 5.0, 2.0).is_closed());
    }

    #[test]
    fn centroid_of_rectangle_is_its_center() {
        let c = rect(100.0, 40.0, 102.0, 38.0).centroid();
        assert_relative_eq!(c.x, 101.0, epsilon = 1e-9);
        assert_relative_eq!(c.y, 39.0, epsilon = 1e-9);
    }

    #[test]
    fn small_footprint_far_from_origin_keeps_precision() {
        let c = rect(116.0, 40.001, 116.001, 40.0).centroid();
        assert_relative_eq!(c.x, 116.0005, epsilon = 1e-11);
        assert_relative_eq!(c.y, 40.0005, epsilon = 1e-11);
    }

    #[test]
    fn degenerate_ring_centroid_uses_vertex_mean() {
        let c = rect(3.0, 3.0, 3.0, 3.0).centroid();
        assert_eq!(c, GeoPoint::new(3.0, 3.0));

        let line = BoundingPolygon::from_corners([
            GeoPoint::new(116.0, 40.0),
            GeoPoint::new(116.5, 40.5),
            GeoPoint::new(117.0, 41.0),
            GeoPoint::new(116.5, 40.5),
        ])
        .centroid();
        assert_relative_eq!(line.x, 116.5, epsilon = 1e-12);
        assert_relative_eq!(line.y, 40.5, epsilon = 1e-12);
    }

    #[test]
    fn envelope_covers_all_points() {
        assert_eq!(rect(1.0, 9.0, 4.0, -2.0).envelope(), (1.0, -2.0, 4.0, 9.0));
    }
}
