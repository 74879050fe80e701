use serde::{Deserialize, Serialize};

/// Gimbal attitude conventions found in drone image metadata.
///
/// The roll/pitch/yaw triple written by the flight controller is not a
/// photogrammetric rotation; each maker encodes the gimbal attitude
/// slightly differently and must be mapped to omega-phi-kappa before any
/// back-projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RpyConvention {
    /// DJI gimbal convention: pitch is -90 degrees when looking straight
    /// down, yaw is the compass heading of the airframe.
    #[default]
    Dji,
    /// Variant used by makers that swap the roll/pitch roles and reference
    /// kappa 90 degrees off the heading.
    Maker,
}

/// Angular distance from the gimbal-flip singularity at which the roll
/// reading is clamped to zero, in degrees.
const ROLL_FLIP_TOLERANCE_DEG: f64 = 0.1;

/// Convert a gimbal roll/pitch/yaw reading to omega-phi-kappa.
///
/// All angles are in degrees. For [`RpyConvention::Dji`] the raw omega is
/// `90 + pitch` and the raw phi is the roll, except within
/// 0.1 degrees of the gimbal-flip singularity at |roll| = 180 where the
/// roll reading is unreliable and is clamped to zero. The raw
/// (omega, phi) pair is then rotated by the yaw so the result is expressed
/// against grid north, and kappa opposes the yaw.
///
/// # Arguments
///
/// * `roll` - Gimbal roll in degrees.
/// * `pitch` - Gimbal pitch in degrees (-90 at nadir for DJI).
/// * `yaw` - Gimbal yaw in degrees, clockwise from north.
/// * `convention` - The maker convention of the metadata.
///
/// # Returns
///
/// `[omega, phi, kappa]` in degrees.
pub fn rpy_to_opk(roll: f64, pitch: f64, yaw: f64, convention: RpyConvention) -> [f64; 3] {
    let (omega_raw, phi_raw, kappa) = match convention {
        RpyConvention::Dji => {
            let phi_raw = if 180.0 - roll.abs() <= ROLL_FLIP_TOLERANCE_DEG {
                0.0
            } else {
                roll
            };
            (90.0 + pitch, phi_raw, -yaw)
        }
        RpyConvention::Maker => {
            let omega_raw = if 180.0 - pitch.abs() <= ROLL_FLIP_TOLERANCE_DEG {
                0.0
            } else {
                pitch
            };
            (90.0 + roll, omega_raw, -yaw - 90.0)
        }
    };

    let (s, c) = yaw.to_radians().sin_cos();
    let omega = c * omega_raw + s * phi_raw;
    let phi = -s * omega_raw + c * phi_raw;

    [omega, phi, kappa]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::{mat_t_mul_vec, opk_to_matrix};
    use approx::assert_relative_eq;

    #[test]
    fn nadir_reduces_to_pure_kappa() {
        let [omega, phi, kappa] = rpy_to_opk(0.0, -90.0, 35.0, RpyConvention::Dji);
        assert_relative_eq!(omega, 0.0);
        assert_relative_eq!(phi, 0.0);
        assert_relative_eq!(kappa, -35.0);
    }

    #[test]
    fn gimbal_flip_clamps_roll() {
        let clamped = rpy_to_opk(179.95, -90.0, 0.0, RpyConvention::Dji);
        let clean = rpy_to_opk(0.0, -90.0, 0.0, RpyConvention::Dji);
        assert_relative_eq!(clamped[0], clean[0]);
        assert_relative_eq!(clamped[1], clean[1]);
        // just outside the tolerance the roll passes through
        let raw = rpy_to_opk(179.0, -90.0, 0.0, RpyConvention::Dji);
        assert_relative_eq!(raw[1], 179.0);
    }

    #[test]
    fn yaw_rotates_the_tilt_plane() {
        // a forward-tilted camera yawed by 90 degrees tilts sideways
        let [omega, phi, _] = rpy_to_opk(0.0, -60.0, 90.0, RpyConvention::Dji);
        assert_relative_eq!(omega, 0.0, epsilon = 1e-12);
        assert_relative_eq!(phi, -30.0, epsilon = 1e-12);
    }

    #[test]
    fn nadir_boresight_points_down_for_any_yaw() {
        // round-trip: the converted angles fed through the rotation matrix
        // must reproduce the pointing direction of the gimbal reading
        for &yaw in &[0.0, 10.0, 87.3, 180.0, -135.0] {
            let [omega, phi, kappa] = rpy_to_opk(0.0, -90.0, yaw, RpyConvention::Dji);
            let r = opk_to_matrix(
                omega.to_radians(),
                phi.to_radians(),
                kappa.to_radians(),
            );
            let boresight = mat_t_mul_vec(&r, &[0.0, 0.0, -1.0]);
            assert_relative_eq!(boresight[0], 0.0, epsilon = 1e-9);
            assert_relative_eq!(boresight[1], 0.0, epsilon = 1e-9);
            assert_relative_eq!(boresight[2], -1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn maker_convention_offsets_kappa() {
        let dji = rpy_to_opk(0.0, -90.0, 40.0, RpyConvention::Dji);
        let maker = rpy_to_opk(-90.0, 0.0, 40.0, RpyConvention::Maker);
        assert_relative_eq!(maker[2], dji[2] - 90.0);
    }
}
