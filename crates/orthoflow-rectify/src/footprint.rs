use orthoflow_core::eop::Eop;
use orthoflow_core::rotation::mat_t_mul_vec;
use orthoflow_dem::BoundingBox;

/// Camera-frame rays through the four image corners, in meters on the
/// focal plane.
///
/// ```text
/// (1) ------------ (2)
///  |     image      |
///  |                |
/// (4) ------------ (3)
/// ```
pub fn image_vertices(
    width: usize,
    height: usize,
    pixel_size: f64,
    focal_length: f64,
) -> [[f64; 3]; 4] {
    let half_w = width as f64 * pixel_size / 2.0;
    let half_h = height as f64 * pixel_size / 2.0;

    [
        [-half_w, half_h, -focal_length],
        [half_w, half_h, -focal_length],
        [half_w, -half_h, -focal_length],
        [-half_w, -half_h, -focal_length],
    ]
}

/// Ground bounding box of an image projected onto a flat plane.
///
/// Each corner ray is rotated into the ground frame and intersected with
/// the horizontal plane at `ground_height`; the box is the axis-aligned
/// hull of the four intersections. This bounds the direct (single-image)
/// rectification path where no DEM exists yet.
///
/// # Arguments
///
/// * `width`, `height` - Image shape in pixels.
/// * `eop` - Camera exterior orientation in the target CRS.
/// * `pixel_size` - Sensor pixel pitch in meters.
/// * `focal_length` - Focal length in meters.
/// * `ground_height` - Plane height in the target CRS, meters.
pub fn plane_bbox(
    width: usize,
    height: usize,
    eop: &Eop,
    pixel_size: f64,
    focal_length: f64,
    ground_height: f64,
) -> BoundingBox {
    let rotation = eop.rotation_matrix();

    let mut bbox = BoundingBox {
        x_min: f64::MAX,
        x_max: f64::MIN,
        y_min: f64::MAX,
        y_max: f64::MIN,
    };

    for vertex in image_vertices(width, height, pixel_size, focal_length) {
        let ground_ray = mat_t_mul_vec(&rotation, &vertex);
        let scale = (ground_height - eop.position[2]) / ground_ray[2];
        let x = scale * ground_ray[0] + eop.position[0];
        let y = scale * ground_ray[1] + eop.position[1];

        bbox.x_min = bbox.x_min.min(x);
        bbox.x_max = bbox.x_max.max(x);
        bbox.y_min = bbox.y_min.min(y);
        bbox.y_max = bbox.y_max.max(y);
    }

    bbox
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn nadir_footprint_is_centered_on_the_camera() {
        // 10x10 px, 1 mm pixels, 10 mm focal length, 100 m up:
        // half footprint = (5 mm / 10 mm) * 100 m = 50 m
        let eop = Eop::new([500.0, 700.0, 100.0], 0.0, 0.0, 0.0);
        let bbox = plane_bbox(10, 10, &eop, 1e-3, 1e-2, 0.0);

        assert_relative_eq!(bbox.x_min, 450.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.x_max, 550.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.y_min, 650.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.y_max, 750.0, epsilon = 1e-9);
    }

    #[test]
    fn footprint_scales_with_height_over_ground() {
        let eop = Eop::new([0.0, 0.0, 100.0], 0.0, 0.0, 0.0);
        let low = plane_bbox(10, 10, &eop, 1e-3, 1e-2, 50.0);
        let high = plane_bbox(10, 10, &eop, 1e-3, 1e-2, 0.0);
        assert_relative_eq!(
            (high.x_max - high.x_min) / (low.x_max - low.x_min),
            2.0,
            epsilon = 1e-9
        );
    }
}
