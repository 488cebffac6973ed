#![doc = r#"
SPECTILE: ingestion of multi-sensor remote-sensing rasters into web-mappable artifacts.

This crate turns raw ENVI-style header + binary image pairs from heterogeneous satellite
sensors (Sentinel-2, GF-5, ASTER, PRISMA, or anything else) into a canonical tiled GeoTIFF,
a geodetic bounding polygon, an XYZ tile pyramid, a thumbnail, and a structured metadata
record that is upserted by name into an asset catalog. It powers the SPECTILE CLI and can be
embedded in your own Rust applications.

Requirements
------------
- GDAL development headers and runtime available on your system.
- The GDAL utilities `gdal_translate`, `gdalwarp` and `gdalbuildvrt` on `PATH`
  (or configured explicitly in [`PipelineConfig`]).
- Rust 2024 edition toolchain.

Quick start: ingest one scene
-----------------------------
```rust,no_run
use std::path::Path;
use spectile::{JsonCatalog, PipelineConfig, ingest, prepare_toolkit};

fn main() -> spectile::Result<()> {
    let config = PipelineConfig::default();
    let toolkit = prepare_toolkit(&config)?;
    let catalog = JsonCatalog::open(&config.catalog_dir)?;

    let outcome = ingest(
        Path::new("/data/GF5_AHSI_20190312_004583.hdr"),
        Path::new("/data/GF5_AHSI_20190312_004583.img"),
        &config,
        &toolkit,
        &catalog,
    )?;

    println!("{} -> {}", outcome.asset.name, outcome.asset.tile_url);
    for d in &outcome.degradations {
        println!("degraded: {d}");
    }
    Ok(())
}
```

Batch ingestion
---------------
```rust,no_run
use std::path::Path;
use spectile::{JsonCatalog, PipelineConfig, ingest_directory, prepare_toolkit};

fn main() -> spectile::Result<()> {
    let config = PipelineConfig {
        tile_workers: 8,
        ..PipelineConfig::default()
    };
    let toolkit = prepare_toolkit(&config)?;
    let catalog = JsonCatalog::open(&config.catalog_dir)?;

    let report = ingest_directory(
        Path::new("/data/incoming"),
        &config,
        &toolkit,
        &catalog,
        true, // continue_on_error
    )?;

    println!("processed={} skipped={} errors={}", report.processed, report.skipped, report.errors);
    Ok(())
}
```

Error handling
--------------
All public functions return `spectile::Result<T>`. Only failures that abort a run are
errors; recoverable ones (unparseable CRS, failed rectification, failed thumbnail, ...)
are returned as [`Degradation`] values alongside the stored record.

```rust,no_run
use std::path::Path;
use spectile::{Error, MemoryCatalog, PipelineConfig, ingest, prepare_toolkit};

fn main() {
    let config = PipelineConfig::default();
    let store = MemoryCatalog::new();
    let toolkit = match prepare_toolkit(&config) {
        Ok(t) => t,
        Err(e) => return eprintln!("{e}"),
    };
    match ingest(Path::new("/bad/x.hdr"), Path::new("/bad/x.img"), &config, &toolkit, &store) {
        Ok(_) => {}
        Err(Error::Format { path, reason }) => eprintln!("unreadable {path:?}: {reason}"),
        Err(Error::ToolInvocation(e)) => eprintln!("GDAL utility failed: {e}"),
        Err(other) => eprintln!("Other error: {other}"),
    }
}
```

Useful modules
--------------
- [`api`]: high-level ingestion and maintenance entry points.
- [`core`]: the individual pipeline stages and sensor profiles.
- [`io`]: toolkit interface and GDAL implementation, header reader, catalog.
- [`types`]: geometry and record types.
- [`error`]: crate-level `Error`, `Degradation` and `Result`.
"#]

// Core modules (public)
pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod types;

// Curated public API surface
// Types
pub use crate::core::params::{PipelineConfig, ToolkitConfig};
pub use crate::core::sensor::{SensorProfile, classify};
pub use error::{Degradation, Error, Result};
pub use types::{BoundingPolygon, GeoPoint, RasterAsset, WavelengthInfo, ZoomRange};

// Toolkit and persistence
pub use io::gdal::GdalToolkit;
pub use io::store::{AssetStore, JsonCatalog, MemoryCatalog, UpsertOutcome};
pub use io::toolkit::{RasterToolkit, ToolkitError};

// High-level API re-exports
pub use api::{
    BatchReport, IngestOutcome, MaintenanceReport, ingest, ingest_directory, prepare_toolkit,
    regenerate_thumbnails, swap_axis_order,
};
