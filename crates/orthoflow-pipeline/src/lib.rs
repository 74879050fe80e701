#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Run configuration loaded from a JSON file.
pub mod config;

/// The sequential per-image pipeline driver.
pub mod runner;

pub use config::{Config, OracleConfig};
pub use runner::{Pipeline, RunSummary};

/// Errors terminating a pipeline run.
///
/// Per-image problems (bad metadata, rejected solves, degenerate DEMs)
/// never surface here; they are logged and the stream continues.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The configuration file is inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to access the image directory or an output file.
    #[error("failed to access pipeline file")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON.
    #[error("failed to parse configuration")]
    Json(#[from] serde_json::Error),

    /// The georeferencing controller failed fatally.
    #[error(transparent)]
    Georef(#[from] orthoflow_georef::GeorefError),

    /// An image or raster could not be read or written.
    #[error(transparent)]
    Image(#[from] orthoflow_io::IoError),
}
