#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Image footprint projection onto the ground plane.
pub mod footprint;

/// The per-cell back-projection kernel.
pub mod kernel;

pub use footprint::plane_bbox;
pub use kernel::{rectify_dem, rectify_plane, OrthoChannels};
