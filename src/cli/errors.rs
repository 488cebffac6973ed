use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Asset not found in catalog: {name}")]
    UnknownAsset { name: String },

    #[error("Batch finished with {errors} failed ingestion(s)")]
    BatchFailures { errors: usize },

    #[error("Invalid option --{arg}: {reason}")]
    InvalidOption { arg: &'static str, reason: String },

    #[error(transparent)]
    Spectile(#[from] spectile::Error),
}
