//! I/O layer: the raster toolkit interface and its GDAL implementation,
//! the header reader, scratch directories and the asset catalog.
pub mod header;
pub mod scratch;
pub mod store;
pub mod toolkit;
pub use toolkit::{RasterToolkit, ToolkitError};

pub mod gdal;
pub use self::gdal::GdalToolkit;
