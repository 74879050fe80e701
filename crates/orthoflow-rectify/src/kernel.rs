use rayon::prelude::*;

use orthoflow_core::eop::Eop;
use orthoflow_core::rotation::{mat_mul_vec, Mat3};
use orthoflow_dem::{BoundingBox, DemGrid};
use orthoflow_io::RgbImage;

/// Planar B, G, R, A channels of an orthophoto raster.
#[derive(Debug, Clone, PartialEq)]
pub struct OrthoChannels {
    /// Blue channel, row-major.
    pub b: Vec<u8>,
    /// Green channel, row-major.
    pub g: Vec<u8>,
    /// Red channel, row-major.
    pub r: Vec<u8>,
    /// Alpha channel, 255 where a source pixel was sampled.
    pub a: Vec<u8>,
    /// Raster width in cells.
    pub width: usize,
    /// Raster height in cells.
    pub height: usize,
}

/// Rectify a source image over an elevation grid.
///
/// For every DEM cell the ground point is back-projected into the source
/// image: the ground-to-camera vector is rotated into the camera frame,
/// perspective-divided by `camera z / -focal length`, converted from
/// focal-plane meters to pixel offsets, and sampled nearest-neighbor at
/// the image center plus that offset. Cells that project outside the
/// image, behind the camera, or onto a NaN DEM cell stay transparent.
///
/// Cells are mutually independent; rows are processed in parallel with
/// no shared mutable state.
pub fn rectify_dem(
    dem: &DemGrid,
    eop: &Eop,
    focal_length: f64,
    pixel_size: f64,
    image: &RgbImage,
) -> OrthoChannels {
    let rotation = eop.rotation_matrix();
    rectify_surface(
        dem.rows(),
        dem.cols(),
        |row, col| [dem.x_at(col), dem.y_at(row), dem.z_at(row, col)],
        eop,
        &rotation,
        focal_length,
        pixel_size,
        image,
    )
}

/// Rectify a source image onto a flat plane at a fixed ground height.
///
/// The direct-georeferencing path: the surface is the horizontal plane
/// bounded by the back-projected image corners, sampled at `gsd`.
pub fn rectify_plane(
    bbox: &BoundingBox,
    gsd: f64,
    eop: &Eop,
    ground_height: f64,
    focal_length: f64,
    pixel_size: f64,
    image: &RgbImage,
) -> OrthoChannels {
    let rotation = eop.rotation_matrix();
    let (rows, cols) = bbox.grid_shape(gsd);
    rectify_surface(
        rows,
        cols,
        |row, col| {
            [
                bbox.x_min + col as f64 * gsd,
                bbox.y_max - row as f64 * gsd,
                ground_height,
            ]
        },
        eop,
        &rotation,
        focal_length,
        pixel_size,
        image,
    )
}

#[allow(clippy::too_many_arguments)]
fn rectify_surface(
    rows: usize,
    cols: usize,
    surface: impl Fn(usize, usize) -> [f64; 3] + Send + Sync,
    eop: &Eop,
    rotation: &Mat3,
    focal_length: f64,
    pixel_size: f64,
    image: &RgbImage,
) -> OrthoChannels {
    let mut b = vec![0u8; rows * cols];
    let mut g = vec![0u8; rows * cols];
    let mut r = vec![0u8; rows * cols];
    let mut a = vec![0u8; rows * cols];

    let img_cols = image.width() as f64;
    let img_rows = image.height() as f64;

    b.par_chunks_exact_mut(cols)
        .zip(g.par_chunks_exact_mut(cols))
        .zip(r.par_chunks_exact_mut(cols))
        .zip(a.par_chunks_exact_mut(cols))
        .enumerate()
        .for_each(|(row, (((b_row, g_row), r_row), a_row))| {
            for col in 0..cols {
                let ground = surface(row, col);
                if !ground[2].is_finite() {
                    continue;
                }

                // ground-to-camera vector in the target CRS
                let delta = [
                    ground[0] - eop.position[0],
                    ground[1] - eop.position[1],
                    ground[2] - eop.position[2],
                ];

                // back-projection into the camera frame, unit: m
                let cam = mat_mul_vec(rotation, &delta);
                let scale = cam[2] / (-focal_length);
                if scale <= 0.0 {
                    // behind the projection center
                    continue;
                }

                // focal-plane meters to pixel offsets
                let px = (cam[0] / scale) / pixel_size;
                let py = -(cam[1] / scale) / pixel_size;

                // nearest-neighbor resample around the image center
                let u = img_cols / 2.0 + px;
                let v = img_rows / 2.0 + py;
                if u < 0.0 || u >= img_cols || v < 0.0 || v >= img_rows {
                    continue;
                }

                let pixel = image.pixel(v as usize, u as usize);
                r_row[col] = pixel[0];
                g_row[col] = pixel[1];
                b_row[col] = pixel[2];
                a_row[col] = 255;
            }
        });

    OrthoChannels {
        b,
        g,
        r,
        a,
        width: cols,
        height: rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orthoflow_dem::interpolate_dem;

    fn gradient_image(width: usize, height: usize) -> RgbImage {
        let mut data = Vec::with_capacity(width * height * 3);
        for row in 0..height {
            for col in 0..width {
                data.extend_from_slice(&[(10 * row + col) as u8, 128, 255]);
            }
        }
        RgbImage::new(width, height, data).unwrap()
    }

    fn flat_dem() -> DemGrid {
        let mut points = Vec::new();
        for i in 0..=10 {
            for j in 0..=10 {
                points.push([i as f64, j as f64, 0.0]);
            }
        }
        interpolate_dem(&points, 1.0).unwrap()
    }

    #[test]
    fn nadir_camera_maps_center_pixel_to_footprint_center() {
        let dem = flat_dem();
        // 1 mm pixels at 20 mm focal from 10 m: half footprint = 2.5 m
        let eop = Eop::new([5.0, 5.0, 10.0], 0.0, 0.0, 0.0);
        let image = gradient_image(10, 10);
        let out = rectify_dem(&dem, &eop, 0.02, 0.001, &image);

        // cell (row 5, col 5) sits at ground (5, 5), directly under the camera
        let center = 5 * out.width + 5;
        assert_eq!(out.a[center], 255);
        let expected = image.pixel(5, 5);
        assert_eq!(out.r[center], expected[0]);
        assert_eq!(out.g[center], expected[1]);
        assert_eq!(out.b[center], expected[2]);
    }

    #[test]
    fn off_footprint_cells_are_transparent() {
        let dem = flat_dem();
        let eop = Eop::new([5.0, 5.0, 10.0], 0.0, 0.0, 0.0);
        let image = gradient_image(10, 10);
        let out = rectify_dem(&dem, &eop, 0.02, 0.001, &image);

        // footprint spans 2.5 m around (5, 5); the corner cell is far outside
        assert_eq!(out.a[0], 0);
        assert_eq!(out.b[0], 0);
        let last = out.width * out.height - 1;
        assert_eq!(out.a[last], 0);

        // every opaque cell lies inside the footprint square
        for row in 0..out.height {
            for col in 0..out.width {
                if out.a[row * out.width + col] == 255 {
                    let x = dem.x_at(col);
                    let y = dem.y_at(row);
                    assert!((x - 5.0).abs() <= 2.5 + 1e-9, "x = {x}");
                    assert!((y - 5.0).abs() <= 2.5 + 1e-9, "y = {y}");
                }
            }
        }
    }

    #[test]
    fn plane_mode_matches_flat_dem() {
        let eop = Eop::new([5.0, 5.0, 10.0], 0.0, 0.0, 0.0);
        let image = gradient_image(10, 10);

        let dem = flat_dem();
        let from_dem = rectify_dem(&dem, &eop, 0.02, 0.001, &image);
        let bbox = dem.bbox();
        let from_plane = rectify_plane(&bbox, 1.0, &eop, 0.0, 0.02, 0.001, &image);

        assert_eq!(from_dem, from_plane);
    }

    #[test]
    fn cells_behind_the_camera_are_transparent() {
        let dem = flat_dem();
        // camera below the surface looks away from every cell
        let eop = Eop::new([5.0, 5.0, -10.0], 0.0, 0.0, 0.0);
        let image = gradient_image(10, 10);
        let out = rectify_dem(&dem, &eop, 0.02, 0.001, &image);
        assert!(out.a.iter().all(|&v| v == 0));
    }
}
