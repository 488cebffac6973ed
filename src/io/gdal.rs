use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

use gdal::Dataset;
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use tracing::{debug, warn};

use crate::core::params::ToolkitConfig;
use crate::io::toolkit::{
    CoordinateTransforms, PointTransform, RasterInfo, RasterToolkit, ToolOutput, ToolkitError,
    TranslateOptions, WarpOptions,
};

/// Production toolkit: introspection, statistics and CRS work go through the
/// GDAL binding, translation/warping/composites through the GDAL utilities.
#[derive(Debug, Clone)]
pub struct GdalToolkit {
    config: ToolkitConfig,
}

impl GdalToolkit {
    pub fn new(config: ToolkitConfig) -> Self {
        Self { config }
    }

    /// Check that every GDAL utility can be launched
    pub fn probe(&self) -> Result<(), ToolkitError> {
        for program in [
            &self.config.gdal_translate,
            &self.config.gdalwarp,
            &self.config.gdalbuildvrt,
        ] {
            let out = self.run(program.as_os_str(), &["--version".to_string()])?;
            debug!("{}: {}", program.display(), out.stdout.trim());
        }
        Ok(())
    }

    fn run(&self, program: &OsStr, args: &[String]) -> Result<ToolOutput, ToolkitError> {
        let tool = program.to_string_lossy().into_owned();
        debug!("Running {} {}", tool, args.join(" "));
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(data) = &self.config.gdal_data {
            cmd.env("GDAL_DATA", data);
        }
        if let Some(proj) = &self.config.proj_lib {
            cmd.env("PROJ_LIB", proj);
            cmd.env("PROJ_DATA", proj);
        }
        let output = cmd
            .output()
            .map_err(|source| ToolkitError::Spawn {
                tool: tool.clone(),
                source,
            })?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(ToolkitError::Failed {
                tool,
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }
        if !stderr.trim().is_empty() {
            warn!("{} reported: {}", tool, stderr.trim());
        }
        Ok(ToolOutput { stdout, stderr })
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn expect_output(dst: &Path, out: ToolOutput) -> Result<ToolOutput, ToolkitError> {
    if dst.exists() {
        Ok(out)
    } else {
        Err(ToolkitError::MissingOutput(dst.to_path_buf()))
    }
}

/// Command line of `gdal_translate` for the given options
pub fn translate_args(src: &Path, dst: &Path, opts: &TranslateOptions) -> Vec<String> {
    let mut args: Vec<String> = vec!["-of".into(), opts.format.into()];
    if let Some(ot) = opts.output_type {
        args.extend(["-ot".into(), ot.into()]);
    }
    for b in &opts.bands {
        args.extend(["-b".into(), b.to_string()]);
    }
    if let Some(range) = opts.scale {
        args.extend([
            "-scale".into(),
            range.min.to_string(),
            range.max.to_string(),
            "0".into(),
            "255".into(),
        ]);
    }
    if let Some(alg) = opts.resampling {
        args.extend(["-r".into(), alg.as_gdal().into()]);
    }
    if let Some((w, h)) = opts.out_size {
        args.extend(["-outsize".into(), w.to_string(), h.to_string()]);
    }
    if let Some(nodata) = opts.nodata {
        args.extend(["-a_nodata".into(), nodata.to_string()]);
    }
    if let Some([ulx, uly, lrx, lry]) = opts.projwin {
        args.push("-projwin".into());
        args.extend([ulx, uly, lrx, lry].iter().map(|v| v.to_string()));
    }
    for co in &opts.creation_options {
        args.extend(["-co".into(), co.clone()]);
    }
    args.push(path_arg(src));
    args.push(path_arg(dst));
    args
}

/// Command line of `gdalwarp` for the given options
pub fn warp_args(src: &Path, dst: &Path, opts: &WarpOptions) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-of".into(),
        opts.format.into(),
        "-overwrite".into(),
        "-r".into(),
        opts.resampling.as_gdal().into(),
        "-t_srs".into(),
        opts.target_crs.into(),
    ];
    if opts.use_rpc {
        args.push("-rpc".into());
    }
    if let Some(order) = opts.polynomial_order {
        args.extend(["-order".into(), order.to_string()]);
    }
    if let Some(et) = opts.error_threshold {
        args.extend(["-et".into(), et.to_string()]);
    }
    if let Some(res) = opts.target_resolution {
        args.extend(["-tr".into(), res.to_string(), res.to_string()]);
    }
    if let Some(nodata) = opts.src_nodata {
        args.extend(["-srcnodata".into(), nodata.to_string()]);
    }
    if opts.dst_alpha {
        args.push("-dstalpha".into());
    }
    for co in &opts.creation_options {
        args.extend(["-co".into(), co.clone()]);
    }
    args.push(path_arg(src));
    args.push(path_arg(dst));
    args
}

/// Command line of `gdalbuildvrt` selecting three bands as separate layers
pub fn composite_args(src: &Path, dst: &Path, bands: [usize; 3]) -> Vec<String> {
    let mut args: Vec<String> = vec!["-overwrite".into(), "-separate".into()];
    for b in bands {
        args.extend(["-b".into(), b.to_string()]);
    }
    args.push(path_arg(dst));
    args.push(path_arg(src));
    args
}

impl RasterToolkit for GdalToolkit {
    fn describe(&self, path: &Path) -> Result<RasterInfo, ToolkitError> {
        let dataset = Dataset::open(path)?;
        let (width, height) = dataset.raster_size();
        let band_count = dataset.raster_count() as usize;
        if band_count == 0 {
            return Err(ToolkitError::Unsupported("No raster bands found".into()));
        }
        let geo_transform = match dataset.geo_transform() {
            Ok(gt) => gt,
            Err(_) => [0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        };
        let mut proj = dataset.projection();
        if proj.is_empty() {
            // Fallback to GCP projection if available
            if let Some(gcp_proj) = dataset.gcp_projection() {
                proj = gcp_proj;
            }
        }
        Ok(RasterInfo {
            width: width as usize,
            height: height as usize,
            band_count,
            geo_transform,
            projection: if proj.trim().is_empty() { None } else { Some(proj) },
        })
    }

    fn band_range(&self, path: &Path, band: usize) -> Result<(f64, f64), ToolkitError> {
        let dataset = Dataset::open(path)?;
        let band = dataset.rasterband(band)?;
        match band.get_statistics(true, true)? {
            Some(stats) => Ok((stats.min, stats.max)),
            None => Err(ToolkitError::Unsupported(format!(
                "no statistics available for {}",
                path.display()
            ))),
        }
    }

    fn translate(
        &self,
        src: &Path,
        dst: &Path,
        opts: &TranslateOptions,
    ) -> Result<ToolOutput, ToolkitError> {
        let out = self.run(
            self.config.gdal_translate.as_os_str(),
            &translate_args(src, dst, opts),
        )?;
        expect_output(dst, out)
    }

    fn warp(&self, src: &Path, dst: &Path, opts: &WarpOptions) -> Result<ToolOutput, ToolkitError> {
        let out = self.run(self.config.gdalwarp.as_os_str(), &warp_args(src, dst, opts))?;
        expect_output(dst, out)
    }

    fn build_composite(
        &self,
        src: &Path,
        dst: &Path,
        bands: [usize; 3],
    ) -> Result<ToolOutput, ToolkitError> {
        let out = self.run(
            self.config.gdalbuildvrt.as_os_str(),
            &composite_args(src, dst, bands),
        )?;
        expect_output(dst, out)
    }
}

impl CoordinateTransforms for GdalToolkit {
    fn geodetic_transform(
        &self,
        source_crs: &str,
    ) -> Result<Box<dyn PointTransform>, ToolkitError> {
        let mut src = SpatialRef::from_definition(source_crs)
            .map_err(|e| ToolkitError::Crs(format!("cannot parse source CRS: {}", e)))?;
        let mut dst = SpatialRef::from_epsg(4326)?;
        // Force (x=lon/easting, y=lat/northing) on both sides regardless of authority axis order
        src.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
        dst.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
        let transform = CoordTransform::new(&src, &dst)?;
        Ok(Box::new(GdalPointTransform { transform }))
    }
}

struct GdalPointTransform {
    transform: CoordTransform,
}

impl PointTransform for GdalPointTransform {
    fn transform(&self, x: f64, y: f64) -> Result<(f64, f64), ToolkitError> {
        let mut xs = [x];
        let mut ys = [y];
        self.transform
            .transform_coords(&mut xs, &mut ys, &mut [])?;
        if !xs[0].is_finite() || !ys[0].is_finite() {
            return Err(ToolkitError::Crs(format!(
                "point ({}, {}) has no finite geodetic image",
                x, y
            )));
        }
        Ok((xs[0], ys[0]))
    }
}
