use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "spectile", version, about = "SPECTILE CLI")]
pub struct CliArgs {
    /// JSON pipeline configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging (otherwise RUST_LOG, default info)
    #[arg(long, global = true, default_value_t = false)]
    pub log: bool,

    /// Root directory of the tile pyramids
    #[arg(long, global = true)]
    pub tiles_dir: Option<PathBuf>,

    /// Directory receiving thumbnails
    #[arg(long, global = true)]
    pub thumbnails_dir: Option<PathBuf>,

    /// Directory of the JSON asset catalog
    #[arg(long, global = true)]
    pub catalog_dir: Option<PathBuf>,

    /// Number of tile rendering workers
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Ingest one header/image pair
    Ingest {
        /// ENVI-style header file
        #[arg(long)]
        header: PathBuf,

        /// Raw image file sharing the header's base name
        #[arg(long)]
        image: PathBuf,
    },

    /// Ingest every .hdr/.img pair of a directory
    IngestDir {
        #[arg(long)]
        input_dir: PathBuf,

        /// Batch mode: continue with the remaining pairs when one fails
        #[arg(long, default_value_t = false)]
        batch: bool,
    },

    /// Re-render thumbnails of all catalogued assets from their raw images
    RegenerateThumbnails,

    /// Swap the stored axis order of assets whose sensor stores (northing, easting)
    FixAxisOrder,

    /// Print catalog records as JSON
    Show {
        /// Asset name; all records when omitted
        name: Option<String>,
    },
}
