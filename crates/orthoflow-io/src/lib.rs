#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for the io module.
pub mod error;

/// A minimal interleaved 8-bit image container.
pub mod image;

/// JPEG reading and writing.
pub mod jpeg;

/// Drone capture metadata extraction.
pub mod metadata;

/// Orthophoto raster and world-file output.
pub mod raster;

pub use error::IoError;
pub use image::RgbImage;
