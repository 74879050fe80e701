#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Gimbal angle conventions and conversion to omega-phi-kappa.
pub mod angles;

/// Coordinate reference systems and geodetic conversions.
pub mod crs;

/// Exterior orientation parameters.
pub mod eop;

/// Rotation matrix construction and decomposition.
pub mod rotation;
