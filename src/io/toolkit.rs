//! Narrow capability interface over the external raster-processing toolkit.
//!
//! Every pipeline stage talks to rasters through [`RasterToolkit`] so that the
//! control logic can be driven by a fake in tests. All operations block until
//! the underlying work has finished and report failure through [`ToolkitError`].
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::{Resampling, StretchRange};

/// Geodetic WGS84 as accepted by [`CoordinateTransforms::geodetic_transform`]
pub const WGS84: &str = "EPSG:4326";
/// Spherical Web Mercator used by XYZ tile pyramids
pub const WEB_MERCATOR: &str = "EPSG:3857";

/// Errors reported by toolkit operations
#[derive(Debug, Error)]
pub enum ToolkitError {
    #[error("failed to launch {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: String,
        stderr: String,
    },
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
    #[error("CRS error: {0}")]
    Crs(String),
    #[error("expected output missing: {0:?}")]
    MissingOutput(PathBuf),
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// Introspected properties of a raster
#[derive(Debug, Clone, PartialEq)]
pub struct RasterInfo {
    pub width: usize,
    pub height: usize,
    pub band_count: usize,
    /// Affine geotransform coefficients ([origin_x, pixel_width, rot_x, origin_y, rot_y, pixel_height])
    pub geo_transform: [f64; 6],
    /// Projection as WKT, `None` when the raster carries no CRS
    pub projection: Option<String>,
}

/// Captured output of an external program
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Options of a format translation (band subset, stretch, resize, window)
#[derive(Debug, Clone, PartialEq)]
pub struct TranslateOptions {
    pub format: &'static str,
    pub output_type: Option<&'static str>,
    pub bands: Vec<usize>,
    pub scale: Option<StretchRange>,
    pub resampling: Option<Resampling>,
    pub out_size: Option<(usize, usize)>,
    pub nodata: Option<f64>,
    /// Source window as [ulx, uly, lrx, lry] in source CRS units
    pub projwin: Option<[f64; 4]>,
    pub creation_options: Vec<String>,
}

impl TranslateOptions {
    pub fn new(format: &'static str) -> Self {
        Self {
            format,
            output_type: None,
            bands: Vec::new(),
            scale: None,
            resampling: None,
            out_size: None,
            nodata: None,
            projwin: None,
            creation_options: Vec::new(),
        }
    }

    /// Tiled, LZW-compressed GeoTIFF
    pub fn canonical_geotiff() -> Self {
        let mut opts = Self::new("GTiff");
        opts.creation_options = canonical_creation_options();
        opts
    }

    /// 8-bit output stretched from `range` onto 0..255
    pub fn byte_stretch(mut self, range: StretchRange) -> Self {
        self.output_type = Some("Byte");
        self.scale = Some(range);
        self
    }

    pub fn bands(mut self, bands: &[usize]) -> Self {
        self.bands = bands.to_vec();
        self
    }

    pub fn resampling(mut self, alg: Resampling) -> Self {
        self.resampling = Some(alg);
        self
    }

    pub fn out_size(mut self, width: usize, height: usize) -> Self {
        self.out_size = Some((width, height));
        self
    }

    pub fn nodata(mut self, value: Option<f64>) -> Self {
        self.nodata = value;
        self
    }

    pub fn projwin(mut self, window: [f64; 4]) -> Self {
        self.projwin = Some(window);
        self
    }
}

/// Options of a warp / rectification pass
#[derive(Debug, Clone, PartialEq)]
pub struct WarpOptions {
    pub format: &'static str,
    pub target_crs: &'static str,
    pub resampling: Resampling,
    /// Use the onboard rational polynomial geolocation model
    pub use_rpc: bool,
    pub polynomial_order: Option<u8>,
    pub error_threshold: Option<f64>,
    pub target_resolution: Option<f64>,
    pub src_nodata: Option<f64>,
    pub dst_alpha: bool,
    pub creation_options: Vec<String>,
}

impl WarpOptions {
    /// First-order polynomial RPC rectification to geodetic WGS84
    pub fn rectification() -> Self {
        Self {
            format: "GTiff",
            target_crs: WGS84,
            resampling: Resampling::Bilinear,
            use_rpc: true,
            polynomial_order: Some(1),
            error_threshold: Some(0.5),
            target_resolution: None,
            src_nodata: None,
            dst_alpha: false,
            creation_options: canonical_creation_options(),
        }
    }

    /// Virtual reprojection into Web Mercator at a fixed resolution
    pub fn web_mercator(resampling: Resampling, resolution: f64, src_nodata: Option<f64>) -> Self {
        Self {
            format: "VRT",
            target_crs: WEB_MERCATOR,
            resampling,
            use_rpc: false,
            polynomial_order: None,
            error_threshold: None,
            target_resolution: Some(resolution),
            src_nodata,
            dst_alpha: true,
            creation_options: Vec::new(),
        }
    }
}

fn canonical_creation_options() -> Vec<String> {
    ["COMPRESS=LZW", "TILED=YES", "BIGTIFF=IF_NEEDED"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Transforms single points from a source CRS into geodetic WGS84 (lon, lat)
pub trait PointTransform {
    fn transform(&self, x: f64, y: f64) -> Result<(f64, f64), ToolkitError>;
}

/// Coordinate-reference-system parsing and transformation
pub trait CoordinateTransforms {
    /// Transform from `source_crs` (WKT or authority code) into WGS84 lon/lat
    fn geodetic_transform(&self, source_crs: &str)
    -> Result<Box<dyn PointTransform>, ToolkitError>;
}

/// Blocking raster-processing primitives consumed by the pipeline
pub trait RasterToolkit: CoordinateTransforms + Send + Sync {
    /// Open a raster and report its size, band count, affine transform and CRS
    fn describe(&self, path: &Path) -> Result<RasterInfo, ToolkitError>;

    /// Minimum and maximum of a band (1-based)
    fn band_range(&self, path: &Path, band: usize) -> Result<(f64, f64), ToolkitError>;

    fn translate(
        &self,
        src: &Path,
        dst: &Path,
        opts: &TranslateOptions,
    ) -> Result<ToolOutput, ToolkitError>;

    fn warp(&self, src: &Path, dst: &Path, opts: &WarpOptions) -> Result<ToolOutput, ToolkitError>;

    /// Virtual composite selecting `bands` (1-based, in order) as separate layers
    fn build_composite(
        &self,
        src: &Path,
        dst: &Path,
        bands: [usize; 3],
    ) -> Result<ToolOutput, ToolkitError>;
}
