#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Point cloud container and ground classification contract.
pub mod cloud;

mod delaunay;

/// Regular-grid elevation surface and linear interpolation.
pub mod grid;

/// Binary PLY point-cloud artifact I/O.
pub mod ply;

pub use cloud::{CsfParams, GroundFilter, PassthroughFilter, PointCloud, TerrainRigidity};
pub use grid::{interpolate_dem, BoundingBox, DemGrid};

/// Errors produced while generating an elevation surface.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DemError {
    /// The point cloud has fewer points than a triangulation needs.
    #[error("point cloud has {0} points, at least 3 are required")]
    NotEnoughPoints(usize),

    /// All points are collinear, no surface can be interpolated.
    #[error("point cloud is degenerate, all points are collinear")]
    DegenerateCloud,

    /// The requested cell spacing is not positive.
    #[error("grid spacing must be > 0, got {0}")]
    InvalidSpacing(f64),
}
