//! Crate-level error type and `Result` alias.
//! `Error` carries only the failures that abort an ingestion run; the
//! recoverable ones are modelled as `Degradation` values which are logged
//! and reported back to the caller without stopping the pipeline.
use std::path::PathBuf;

use thiserror::Error;

use crate::io::toolkit::ToolkitError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Format error: cannot read raster {path:?}: {reason}")]
    Format { path: PathBuf, reason: String },

    #[error("Tool invocation error: {0}")]
    ToolInvocation(#[from] ToolkitError),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },
}

impl Error {
    pub fn format<E: std::fmt::Display>(path: impl Into<PathBuf>, e: E) -> Self {
        Error::Format {
            path: path.into(),
            reason: e.to_string(),
        }
    }

    pub fn persistence<E: std::fmt::Display>(e: E) -> Self {
        Error::Persistence(e.to_string())
    }
}

/// A recoverable failure contained at a component boundary
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Degradation {
    #[error("HeaderError: {0}")]
    Header(String),

    #[error("ProjectionError: {crs}: {reason}; using WGS84")]
    Projection { crs: String, reason: String },

    #[error("GeometryError: corner {corner} kept untransformed: {reason}")]
    Geometry { corner: usize, reason: String },

    #[error("RectificationError: {0}; keeping unrectified raster")]
    Rectification(String),

    #[error("StatisticsError: {0}; using default stretch")]
    Statistics(String),

    #[error("ThumbnailError: {0}")]
    Thumbnail(String),

    #[error("AcquisitionDateError: no YYYYMMDD token in {0:?}; using current date")]
    AcquisitionDate(String),
}
