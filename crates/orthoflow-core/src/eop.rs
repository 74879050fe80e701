use serde::{Deserialize, Serialize};

use crate::rotation::{opk_to_matrix, Mat3};

/// Exterior orientation parameters of one camera: position in the target
/// CRS and omega-phi-kappa orientation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Eop {
    /// Easting, northing and height in the target CRS, meters.
    pub position: [f64; 3],
    /// Omega in degrees.
    pub omega: f64,
    /// Phi in degrees.
    pub phi: f64,
    /// Kappa in degrees.
    pub kappa: f64,
}

impl Eop {
    /// Create exterior orientation parameters.
    pub fn new(position: [f64; 3], omega: f64, phi: f64, kappa: f64) -> Self {
        Self {
            position,
            omega,
            phi,
            kappa,
        }
    }

    /// The world-to-camera rotation matrix for this orientation.
    pub fn rotation_matrix(&self) -> Mat3 {
        opk_to_matrix(
            self.omega.to_radians(),
            self.phi.to_radians(),
            self.kappa.to_radians(),
        )
    }

    /// Euclidean distance between this position and another, meters.
    pub fn distance_to(&self, other: &[f64; 3]) -> f64 {
        let dx = self.position[0] - other[0];
        let dy = self.position[1] - other[1];
        let dz = self.position[2] - other[2];
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Derive the ground sampling distance from the flying height over ground.
///
/// # Arguments
///
/// * `pixel_size` - Sensor pixel pitch in meters.
/// * `altitude` - Camera height in the target CRS, meters.
/// * `ground_height` - Mean ground height under the image, meters.
/// * `focal_length` - Focal length in meters.
///
/// # Returns
///
/// The ground-projected size of one pixel in meters.
pub fn ground_sampling_distance(
    pixel_size: f64,
    altitude: f64,
    ground_height: f64,
    focal_length: f64,
) -> f64 {
    pixel_size * (altitude - ground_height) / focal_length
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn distance_is_euclidean() {
        let eop = Eop::new([1.0, 2.0, 3.0], 0.0, 0.0, 0.0);
        assert_relative_eq!(eop.distance_to(&[4.0, 6.0, 3.0]), 5.0);
    }

    #[test]
    fn gsd_scales_with_height() {
        // 4.4 um pixels, 8.8 mm lens, 100 m over the ground -> 5 cm/px
        let gsd = ground_sampling_distance(4.4e-6, 120.0, 20.0, 8.8e-3);
        assert_relative_eq!(gsd, 0.05, epsilon = 1e-12);
    }

    #[test]
    fn rotation_uses_degrees() {
        let eop = Eop::new([0.0; 3], 0.0, 0.0, 90.0);
        let r = eop.rotation_matrix();
        assert_relative_eq!(r[0][0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(r[0][1], 1.0, epsilon = 1e-12);
    }
}
