use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Locations of the GDAL utility programs and their data directories.
/// The data directories are handed to each child process through its own
/// environment; the host process environment is never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    pub gdal_translate: PathBuf,
    pub gdalwarp: PathBuf,
    pub gdalbuildvrt: PathBuf,
    pub gdal_data: Option<PathBuf>,
    pub proj_lib: Option<PathBuf>,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            gdal_translate: PathBuf::from("gdal_translate"),
            gdalwarp: PathBuf::from("gdalwarp"),
            gdalbuildvrt: PathBuf::from("gdalbuildvrt"),
            gdal_data: None,
            proj_lib: None,
        }
    }
}

/// Pipeline configuration, built once per invocation and passed explicitly
/// to every stage. Suitable for JSON config files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub toolkit: ToolkitConfig,
    /// Root of the `{name}/{z}/{x}/{y}.png` tile trees
    pub tiles_dir: PathBuf,
    pub thumbnails_dir: PathBuf,
    /// Directory of the JSON asset catalog
    pub catalog_dir: PathBuf,
    /// Parent for per-run scratch directories; system temp dir when `None`
    pub scratch_dir: Option<PathBuf>,
    /// Public prefix of tile URLs
    pub tile_url_prefix: String,
    /// Public prefix of thumbnail references
    pub thumbnail_prefix: String,
    /// Fixed size of the tile rendering worker pool
    pub tile_workers: usize,
    pub tile_size: usize,
    pub thumbnail_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            toolkit: ToolkitConfig::default(),
            tiles_dir: PathBuf::from("static/tiles"),
            thumbnails_dir: PathBuf::from("media/thumbnails"),
            catalog_dir: PathBuf::from("catalog"),
            scratch_dir: None,
            tile_url_prefix: "/tiles".to_string(),
            thumbnail_prefix: "thumbnails".to_string(),
            tile_workers: 4,
            tile_size: 256,
            thumbnail_size: 256,
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file; absent fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read config {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            Error::Configuration(format!("invalid config {}: {}", path.display(), e))
        })
    }

    /// Static checks that do not need the external toolkit
    pub fn validate(&self) -> Result<()> {
        if self.tile_workers == 0 {
            return Err(Error::Configuration("tile_workers must be > 0".into()));
        }
        if self.tile_size == 0 || self.thumbnail_size == 0 {
            return Err(Error::Configuration(
                "tile_size and thumbnail_size must be > 0".into(),
            ));
        }
        if let Some(proj) = &self.toolkit.proj_lib {
            if !proj.join("proj.db").is_file() {
                return Err(Error::Configuration(format!(
                    "PROJ database not found in {}",
                    proj.display()
                )));
            }
        }
        if let Some(data) = &self.toolkit.gdal_data {
            if !data.is_dir() {
                return Err(Error::Configuration(format!(
                    "GDAL data directory not found: {}",
                    data.display()
                )));
            }
        }
        Ok(())
    }

    /// Public URL template of an asset's tile pyramid
    pub fn tile_url_template(&self, name: &str) -> String {
        format!(
            "{}/{}/{{z}}/{{x}}/{{y}}.png",
            self.tile_url_prefix.trim_end_matches('/'),
            name
        )
    }

    pub fn thumbnail_path(&self, name: &str) -> PathBuf {
        self.thumbnails_dir.join(thumbnail_file_name(name))
    }

    /// Reference stored on the record for an asset's thumbnail
    pub fn thumbnail_reference(&self, name: &str) -> String {
        format!(
            "{}/{}",
            self.thumbnail_prefix.trim_end_matches('/'),
            thumbnail_file_name(name)
        )
    }
}

fn thumbnail_file_name(name: &str) -> String {
    format!("{}_thumb.png", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_template_follows_zxy_layout() {
        let cfg = PipelineConfig::default();
        assert_eq!(
            cfg.tile_url_template("S2A_20230615"),
            "/tiles/S2A_20230615/{z}/{x}/{y}.png"
        );
    }

    #[test]
    fn thumbnail_names() {
        let cfg = PipelineConfig {
            thumbnails_dir: PathBuf::from("/srv/media/thumbnails"),
            ..PipelineConfig::default()
        };
        assert_eq!(
            cfg.thumbnail_path("GF5_1"),
            PathBuf::from("/srv/media/thumbnails/GF5_1_thumb.png")
        );
        assert_eq!(cfg.thumbnail_reference("GF5_1"), "thumbnails/GF5_1_thumb.png");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: PipelineConfig =
            serde_json::from_str(r#"{"tile_workers": 8, "toolkit": {"gdalwarp": "/opt/gdal/bin/gdalwarp"}}"#)
                .unwrap();
        assert_eq!(cfg.tile_workers, 8);
        assert_eq!(cfg.toolkit.gdalwarp, PathBuf::from("/opt/gdal/bin/gdalwarp"));
        assert_eq!(cfg.toolkit.gdal_translate, PathBuf::from("gdal_translate"));
        assert_eq!(cfg.tile_size, 256);
    }

    #[test]
    fn validate_rejects_missing_proj_db() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = PipelineConfig::default();
        cfg.toolkit.proj_lib = Some(dir.path().to_path_buf());
        assert!(matches!(cfg.validate(), Err(Error::Configuration(_))));
        std::fs::write(dir.path().join("proj.db"), b"").unwrap();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let cfg = PipelineConfig {
            tile_workers: 0,
            ..PipelineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
