#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use spectile::PipelineConfig;
use spectile::io::toolkit::{
    CoordinateTransforms, PointTransform, RasterInfo, RasterToolkit, ToolOutput, ToolkitError,
    TranslateOptions, WarpOptions,
};

/// Toolkit operation recorded by [`FakeToolkit`]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Describe(PathBuf),
    BandRange(PathBuf, usize),
    Translate {
        src: PathBuf,
        dst: PathBuf,
        opts: TranslateOptions,
    },
    Warp {
        src: PathBuf,
        dst: PathBuf,
        opts: WarpOptions,
    },
    Composite {
        src: PathBuf,
        dst: PathBuf,
        bands: [usize; 3],
    },
}

/// In-process stand-in for GDAL: records every call, writes placeholder
/// outputs and transforms coordinates with the identity
pub struct FakeToolkit {
    pub source: RasterInfo,
    /// Warped Web Mercator raster reported for `*_3857.vrt`
    pub mercator: RasterInfo,
    pub band_range: Option<(f64, f64)>,
    /// Operations whose destination file name contains one of these fail
    pub fail_outputs: Vec<&'static str>,
    pub calls: Mutex<Vec<Call>>,
}

impl FakeToolkit {
    pub fn new(source: RasterInfo) -> Self {
        Self {
            source,
            mercator: RasterInfo {
                width: 100,
                height: 100,
                band_count: 4,
                geo_transform: [0.0, 10.0, 0.0, 1000.0, 0.0, -10.0],
                projection: Some("EPSG:3857".into()),
            },
            band_range: Some((12.0, 3400.0)),
            fail_outputs: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, pattern: &'static str) -> Self {
        self.fail_outputs.push(pattern);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn warps(&self) -> Vec<WarpOptions> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Warp { opts, .. } => Some(opts),
                _ => None,
            })
            .collect()
    }

    pub fn translates_to(&self, suffix: &str) -> Vec<TranslateOptions> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Translate { dst, opts, .. } if dst.to_string_lossy().ends_with(suffix) => {
                    Some(opts)
                }
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn produce(&self, tool: &str, dst: &Path) -> Result<ToolOutput, ToolkitError> {
        let file = dst.file_name().unwrap().to_string_lossy().into_owned();
        if self.fail_outputs.iter().any(|p| file.contains(p)) {
            std::fs::write(dst, b"partial").unwrap();
            return Err(ToolkitError::Failed {
                tool: tool.into(),
                status: "exit status: 1".into(),
                stderr: format!("ERROR 1: cannot write {}", file),
            });
        }
        std::fs::write(dst, b"placeholder").unwrap();
        Ok(ToolOutput::default())
    }
}

impl RasterToolkit for FakeToolkit {
    fn describe(&self, path: &Path) -> Result<RasterInfo, ToolkitError> {
        self.record(Call::Describe(path.to_path_buf()));
        if !path.exists() {
            return Err(ToolkitError::Unsupported(format!(
                "{} not recognized as a supported file format",
                path.display()
            )));
        }
        if path.to_string_lossy().ends_with("_3857.vrt") {
            Ok(self.mercator.clone())
        } else {
            Ok(self.source.clone())
        }
    }

    fn band_range(&self, path: &Path, band: usize) -> Result<(f64, f64), ToolkitError> {
        self.record(Call::BandRange(path.to_path_buf(), band));
        self.band_range
            .ok_or_else(|| ToolkitError::Unsupported("no statistics".into()))
    }

    fn translate(
        &self,
        src: &Path,
        dst: &Path,
        opts: &TranslateOptions,
    ) -> Result<ToolOutput, ToolkitError> {
        self.record(Call::Translate {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
            opts: opts.clone(),
        });
        self.produce("gdal_translate", dst)
    }

    fn warp(&self, src: &Path, dst: &Path, opts: &WarpOptions) -> Result<ToolOutput, ToolkitError> {
        self.record(Call::Warp {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
            opts: opts.clone(),
        });
        self.produce("gdalwarp", dst)
    }

    fn build_composite(
        &self,
        src: &Path,
        dst: &Path,
        bands: [usize; 3],
    ) -> Result<ToolOutput, ToolkitError> {
        self.record(Call::Composite {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
            bands,
        });
        self.produce("gdalbuildvrt", dst)
    }
}

struct Identity;

impl PointTransform for Identity {
    fn transform(&self, x: f64, y: f64) -> Result<(f64, f64), ToolkitError> {
        Ok((x, y))
    }
}

impl CoordinateTransforms for FakeToolkit {
    fn geodetic_transform(&self, source_crs: &str) -> Result<Box<dyn PointTransform>, ToolkitError> {
        if source_crs.contains("garbage") {
            return Err(ToolkitError::Crs(format!("cannot parse {}", source_crs)));
        }
        Ok(Box::new(Identity))
    }
}

/// 1000x1000 geographic raster of ~11 m pixels at (116 E, 40 N)
pub fn geographic_raster(band_count: usize) -> RasterInfo {
    RasterInfo {
        width: 1000,
        height: 1000,
        band_count,
        geo_transform: [116.0, 0.0001, 0.0, 40.0, 0.0, -0.0001],
        projection: Some(r#"GEOGCS["WGS 84",DATUM["WGS_1984"]]"#.into()),
    }
}

/// Input directory holding `{name}.hdr` / `{name}.img` and output roots under one temp dir
pub struct Workspace {
    pub root: tempfile::TempDir,
    pub config: PipelineConfig,
}

impl Workspace {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            tiles_dir: root.path().join("tiles"),
            thumbnails_dir: root.path().join("thumbnails"),
            catalog_dir: root.path().join("catalog"),
            scratch_dir: Some(root.path().join("scratch")),
            tile_workers: 2,
            ..PipelineConfig::default()
        };
        std::fs::create_dir_all(root.path().join("input")).unwrap();
        Self { root, config }
    }

    pub fn input_dir(&self) -> PathBuf {
        self.root.path().join("input")
    }

    /// Write a header/image pair and return their paths
    pub fn scene(&self, name: &str, header: &str) -> (PathBuf, PathBuf) {
        let hdr = self.input_dir().join(format!("{}.hdr", name));
        let img = self.input_dir().join(format!("{}.img", name));
        std::fs::write(&hdr, header).unwrap();
        std::fs::write(&img, vec![0u8; 64]).unwrap();
        (hdr, img)
    }

    /// Whether every per-run scratch directory has been removed
    pub fn scratch_is_clean(&self) -> bool {
        match std::fs::read_dir(self.root.path().join("scratch")) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }
}

pub const PLAIN_HEADER: &str = "ENVI
samples = 1000
lines = 1000
bands = 4
data type = 12
interleave = bsq
";

pub const GF5_HEADER: &str = "ENVI
samples = 1000
lines = 1000
bands = 3
wavelength units = Micrometers
wavelength = {
 0.39, 0.3943,
 0.3986}
rpc info = {
 LINE_OFF: 1050.0, SAMP_OFF: 1024.0}
";
