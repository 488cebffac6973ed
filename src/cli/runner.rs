use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use spectile::{
    AssetStore, JsonCatalog, PipelineConfig, ingest, ingest_directory, prepare_toolkit,
    regenerate_thumbnails, swap_axis_order,
};

use super::args::{CliArgs, Command};
use super::errors::AppError;

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Configuration file (or defaults) with command-line overrides applied
fn load_config(args: &CliArgs) -> Result<PipelineConfig, AppError> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = &args.tiles_dir {
        config.tiles_dir = dir.clone();
    }
    if let Some(dir) = &args.thumbnails_dir {
        config.thumbnails_dir = dir.clone();
    }
    if let Some(dir) = &args.catalog_dir {
        config.catalog_dir = dir.clone();
    }
    if let Some(workers) = args.workers {
        if workers == 0 {
            return Err(AppError::InvalidOption {
                arg: "workers",
                reason: "must be greater than 0".into(),
            });
        }
        config.tile_workers = workers;
    }
    Ok(config)
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(args.log);

    let config = load_config(&args)?;
    let catalog = JsonCatalog::open(&config.catalog_dir)?;

    match args.command {
        Command::Ingest { header, image } => {
            let toolkit = prepare_toolkit(&config)?;
            let outcome = ingest(&header, &image, &config, &toolkit, &catalog)?;
            for d in &outcome.degradations {
                warn!("{}", d);
            }
            info!(
                "Successfully ingested {} ({:?}) -> {}",
                outcome.asset.name, outcome.upsert, outcome.asset.tile_url
            );
        }
        Command::IngestDir { input_dir, batch } => {
            let toolkit = prepare_toolkit(&config)?;
            info!("Starting batch ingestion from directory: {:?}", input_dir);
            let report = ingest_directory(&input_dir, &config, &toolkit, &catalog, batch)?;
            info!("Processed: {}", report.processed);
            info!("Skipped: {}", report.skipped);
            info!("Errors: {}", report.errors);
            info!("Degraded: {}", report.degraded);
            if report.errors > 0 {
                return Err(AppError::BatchFailures {
                    errors: report.errors,
                }
                .into());
            }
        }
        Command::RegenerateThumbnails => {
            let toolkit = prepare_toolkit(&config)?;
            let report = regenerate_thumbnails(&config, &toolkit, &catalog)?;
            info!(
                "Thumbnails: updated={} skipped={} failed={}",
                report.updated, report.skipped, report.failed
            );
        }
        Command::FixAxisOrder => {
            let report = swap_axis_order(&catalog)?;
            info!(
                "Axis order: updated={} skipped={}",
                report.updated, report.skipped
            );
        }
        Command::Show { name } => {
            let json = match name {
                Some(name) => {
                    let asset = catalog
                        .get(&name)?
                        .ok_or(AppError::UnknownAsset { name })?;
                    serde_json::to_string_pretty(&asset)?
                }
                None => serde_json::to_string_pretty(&catalog.list()?)?,
            };
            println!("{}", json);
        }
    }

    Ok(())
}
