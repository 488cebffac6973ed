//! Command Line Interface (CLI) layer for SPECTILE.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`) for ingestion, batch ingestion
//! and catalog maintenance commands. It wires user-provided options to the
//! library functionality exposed via `spectile::api`.
//!
//! If you are embedding SPECTILE into another application, prefer using
//! the high-level `spectile::api` module instead of calling the CLI code.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
