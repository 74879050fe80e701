#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Controller state machine dispatching per-image solve strategies.
pub mod controller;

/// Bundle adjustment oracle contract and implementations.
pub mod oracle;

/// Append-only exterior orientation reference log.
pub mod reflog;

/// Per-run persisted state: window, cache and accumulated cloud.
pub mod session;

/// Bounded sliding window over the most recent captures.
pub mod window;

pub use controller::{
    CameraSolution, Controller, ControllerConfig, GeorefMode, Outcome, Rejection, SensorModel,
};
pub use oracle::{BundleOracle, CommandOracle, ScriptedOracle};
pub use reflog::{ReferenceLog, ReferenceRecord};
pub use session::Session;
pub use window::{Capture, Phase, SlidingWindow};

/// Errors produced by the georeferencing controller and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum GeorefError {
    /// The configured coordinate system is not supported.
    #[error(transparent)]
    Crs(#[from] orthoflow_core::crs::CrsError),

    /// The external solve process could not be run or returned garbage.
    ///
    /// Recoverable: the controller converts this into a rejected solve
    /// and the stream continues.
    #[error("bundle adjustment oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// The sliding window capacity is below the supported minimum.
    #[error("window size must be at least 3, got {0}")]
    WindowTooSmall(usize),

    /// Failed to access the reference log or another controller file.
    #[error("failed to access controller state file")]
    Io(#[from] std::io::Error),

    /// A reference log row does not have the expected column count.
    #[error("malformed reference log row: {0}")]
    MalformedLogRow(String),

    /// Failed to write a point cloud artifact.
    #[error(transparent)]
    Ply(#[from] orthoflow_dem::ply::PlyError),
}
