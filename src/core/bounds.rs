//! Geodetic footprint of a raster: corner derivation from the affine
//! transform, reprojection into WGS84 with per-profile axis order, and
//! ground-resolution helpers.
use tracing::{debug, info, warn};

use crate::core::sensor::SensorProfile;
use crate::error::Degradation;
use crate::io::toolkit::{CoordinateTransforms, PointTransform, WGS84};
use crate::types::{BoundingPolygon, GeoPoint};

/// Meters per degree along the WGS84 equator
pub const METERS_PER_DEGREE: f64 = 111_319.490_793_273_57;

/// Output of [`compute_bounds`]
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    pub polygon: BoundingPolygon,
    pub centroid: GeoPoint,
    /// Display name of the CRS the corners were read in
    pub crs_name: String,
    pub degradations: Vec<Degradation>,
}

/// Top-left, top-right, bottom-right, bottom-left corners in source CRS units
pub fn raster_corners(gt: &[f64; 6], width: usize, height: usize) -> [GeoPoint; 4] {
    let at = |px: f64, py: f64| {
        GeoPoint::new(
            gt[0] + px * gt[1] + py * gt[2],
            gt[3] + px * gt[4] + py * gt[5],
        )
    };
    let (w, h) = (width as f64, height as f64);
    [at(0.0, 0.0), at(w, 0.0), at(w, h), at(0.0, h)]
}

/// Compute the closed WGS84 ring and centroid of a raster.
///
/// An absent or unparseable `source_crs` falls back to WGS84; a corner whose
/// transformation fails keeps its (possibly swapped) input coordinate. Neither
/// case aborts the computation.
pub fn compute_bounds<C: CoordinateTransforms + ?Sized>(
    crs: &C,
    gt: &[f64; 6],
    width: usize,
    height: usize,
    source_crs: Option<&str>,
    profile: &SensorProfile,
) -> Bounds {
    let mut degradations = Vec::new();
    let (crs_name, transform) = resolve_transform(crs, source_crs, &mut degradations);

    let corners = raster_corners(gt, width, height);
    let mut projected = [GeoPoint::new(0.0, 0.0); 4];
    for (i, corner) in corners.iter().enumerate() {
        let input = if profile.axis_order_swapped {
            corner.swapped()
        } else {
            *corner
        };
        let result = match &transform {
            Some(t) => t.transform(input.x, input.y).map_err(|e| e.to_string()),
            None => Err("no usable coordinate transformation".to_string()),
        };
        projected[i] = match result {
            Ok((lon, lat)) => GeoPoint::new(lon, lat),
            Err(reason) => {
                let d = Degradation::Geometry { corner: i, reason };
                warn!("{}", d);
                degradations.push(d);
                input
            }
        };
    }

    let polygon = BoundingPolygon::from_corners(projected);
    let centroid = polygon.centroid();
    info!("Source corners: {:?}", corners);
    info!("Geodetic bounds: {:?}", polygon.points);
    debug!("Centroid: ({:.8}, {:.8})", centroid.x, centroid.y);

    Bounds {
        polygon,
        centroid,
        crs_name,
        degradations,
    }
}

fn resolve_transform<C: CoordinateTransforms + ?Sized>(
    crs: &C,
    source_crs: Option<&str>,
    degradations: &mut Vec<Degradation>,
) -> (String, Option<Box<dyn PointTransform>>) {
    let source = source_crs.map(str::trim).filter(|s| !s.is_empty());
    if let Some(def) = source {
        match crs.geodetic_transform(def) {
            Ok(t) => return (crs_display_name(Some(def)), Some(t)),
            Err(e) => {
                let d = Degradation::Projection {
                    crs: crs_display_name(Some(def)),
                    reason: e.to_string(),
                };
                warn!("{}", d);
                degradations.push(d);
            }
        }
    } else {
        let d = Degradation::Projection {
            crs: "<none>".into(),
            reason: "raster carries no projection".into(),
        };
        warn!("{}", d);
        degradations.push(d);
    }

    match crs.geodetic_transform(WGS84) {
        Ok(t) => (crs_display_name(None), Some(t)),
        Err(e) => {
            warn!("WGS84 transformation unavailable: {}", e);
            (crs_display_name(None), None)
        }
    }
}

/// Human-readable CRS name: the first quoted name in WKT, the definition
/// itself for authority codes, `WGS84` when absent
pub fn crs_display_name(definition: Option<&str>) -> String {
    let Some(def) = definition.map(str::trim).filter(|s| !s.is_empty()) else {
        return "WGS84".to_string();
    };
    if let Some(start) = def.find('"') {
        if let Some(len) = def[start + 1..].find('"') {
            return def[start + 1..start + 1 + len].to_string();
        }
    }
    def.to_string()
}

/// Whether a CRS definition is geographic (degrees); absent counts as WGS84
pub fn is_geographic(definition: Option<&str>) -> bool {
    match definition.map(str::trim).filter(|s| !s.is_empty()) {
        None => true,
        Some(def) => {
            let upper = def.to_ascii_uppercase();
            upper.starts_with("GEOGCS")
                || upper.starts_with("GEOGCRS")
                || upper.starts_with("GEODCRS")
                || upper == WGS84
        }
    }
}

/// Ground resolution in meters per pixel from the affine pixel width
pub fn ground_resolution(gt: &[f64; 6], definition: Option<&str>) -> f64 {
    let res = gt[1].abs();
    if is_geographic(definition) {
        res * METERS_PER_DEGREE
    } else {
        res
    }
}
