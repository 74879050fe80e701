use crate::delaunay::{barycentric, triangulate};
use crate::DemError;

/// Horizontal extent of a grid, in target CRS meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Western edge.
    pub x_min: f64,
    /// Eastern edge.
    pub x_max: f64,
    /// Southern edge.
    pub y_min: f64,
    /// Northern edge.
    pub y_max: f64,
}

impl BoundingBox {
    /// Number of grid rows and columns at the given cell spacing.
    ///
    /// Rows run north to south, columns west to east; the eastern and
    /// southern edges are exclusive.
    pub fn grid_shape(&self, gsd: f64) -> (usize, usize) {
        let rows = ((self.y_max - self.y_min) / gsd).ceil() as usize;
        let cols = ((self.x_max - self.x_min) / gsd).ceil() as usize;
        (rows, cols)
    }
}

/// A regular elevation lattice over a bounding box.
///
/// Rows are ordered north to south (y descending), columns west to east.
/// Cells outside the convex hull of the source points hold NaN and are
/// treated as transparent downstream. The cell spacing always equals the
/// GSD the rectification kernel uses for the same image.
#[derive(Debug, Clone, PartialEq)]
pub struct DemGrid {
    z: Vec<f64>,
    rows: usize,
    cols: usize,
    gsd: f64,
    bbox: BoundingBox,
}

impl DemGrid {
    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Cell spacing in meters.
    #[inline]
    pub fn gsd(&self) -> f64 {
        self.gsd
    }

    /// Horizontal extent of the grid.
    #[inline]
    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    /// Easting of a column center.
    #[inline]
    pub fn x_at(&self, col: usize) -> f64 {
        self.bbox.x_min + col as f64 * self.gsd
    }

    /// Northing of a row center.
    #[inline]
    pub fn y_at(&self, row: usize) -> f64 {
        self.bbox.y_max - row as f64 * self.gsd
    }

    /// Elevation of a cell; NaN outside the interpolated surface.
    #[inline]
    pub fn z_at(&self, row: usize, col: usize) -> f64 {
        self.z[row * self.cols + col]
    }

    /// The raw elevation buffer in row-major order.
    pub fn as_slice(&self) -> &[f64] {
        &self.z
    }
}

/// Resample scattered ground points onto a regular lattice.
///
/// The points are triangulated in the horizontal plane and each lattice
/// cell takes the barycentric (linear) interpolation of the triangle it
/// falls in, matching a triangulation-based `griddata` resampling. That
/// is the only interpolation method supported.
///
/// # Arguments
///
/// * `points` - Ground-classified points in the target CRS.
/// * `gsd` - Cell spacing in meters; also the downstream orthophoto GSD.
///
/// # Returns
///
/// The elevation grid spanning the bounding box of the input points.
pub fn interpolate_dem(points: &[[f64; 3]], gsd: f64) -> Result<DemGrid, DemError> {
    if !(gsd > 0.0) {
        return Err(DemError::InvalidSpacing(gsd));
    }
    if points.len() < 3 {
        return Err(DemError::NotEnoughPoints(points.len()));
    }

    let mut bbox = BoundingBox {
        x_min: f64::MAX,
        x_max: f64::MIN,
        y_min: f64::MAX,
        y_max: f64::MIN,
    };
    for p in points {
        bbox.x_min = bbox.x_min.min(p[0]);
        bbox.x_max = bbox.x_max.max(p[0]);
        bbox.y_min = bbox.y_min.min(p[1]);
        bbox.y_max = bbox.y_max.max(p[1]);
    }

    let flat: Vec<[f64; 2]> = points.iter().map(|p| [p[0], p[1]]).collect();
    let triangles = triangulate(&flat);
    if triangles.is_empty() {
        return Err(DemError::DegenerateCloud);
    }
    log::debug!(
        "interpolating {} points over {} triangles at {gsd} m",
        points.len(),
        triangles.len()
    );

    let (rows, cols) = bbox.grid_shape(gsd);
    let mut z = vec![f64::NAN; rows * cols];

    // rasterize triangle by triangle so each cell is visited O(1) times
    for tri in &triangles {
        let xs = [flat[tri[0]][0], flat[tri[1]][0], flat[tri[2]][0]];
        let ys = [flat[tri[0]][1], flat[tri[1]][1], flat[tri[2]][1]];
        let tx_min = xs.iter().fold(f64::MAX, |a, &b| a.min(b));
        let tx_max = xs.iter().fold(f64::MIN, |a, &b| a.max(b));
        let ty_min = ys.iter().fold(f64::MAX, |a, &b| a.min(b));
        let ty_max = ys.iter().fold(f64::MIN, |a, &b| a.max(b));

        let col_lo = ((tx_min - bbox.x_min) / gsd).ceil().max(0.0) as usize;
        let col_hi = (((tx_max - bbox.x_min) / gsd).floor() as isize).min(cols as isize - 1);
        let row_lo = ((bbox.y_max - ty_max) / gsd).ceil().max(0.0) as usize;
        let row_hi = (((bbox.y_max - ty_min) / gsd).floor() as isize).min(rows as isize - 1);
        if col_hi < 0 || row_hi < 0 {
            continue;
        }

        for row in row_lo..=row_hi as usize {
            let y = bbox.y_max - row as f64 * gsd;
            for col in col_lo..=col_hi as usize {
                let x = bbox.x_min + col as f64 * gsd;
                if let Some(w) = barycentric(&flat, tri, [x, y]) {
                    const EPS: f64 = 1e-12;
                    if w.iter().all(|&v| v >= -EPS) {
                        z[row * cols + col] = w[0] * points[tri[0]][2]
                            + w[1] * points[tri[1]][2]
                            + w[2] * points[tri[2]][2];
                    }
                }
            }
        }
    }

    Ok(DemGrid {
        z,
        rows,
        cols,
        gsd,
        bbox,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn plane_cloud(height: f64) -> Vec<[f64; 3]> {
        let mut points = Vec::new();
        for i in 0..=10 {
            for j in 0..=10 {
                points.push([i as f64, j as f64, height]);
            }
        }
        points
    }

    #[test]
    fn plane_interpolates_to_plane() -> Result<(), DemError> {
        // a cloud sampled from z = 5 must interpolate to 5 everywhere
        let grid = interpolate_dem(&plane_cloud(5.0), 1.0)?;
        assert_eq!(grid.rows(), 10);
        assert_eq!(grid.cols(), 10);
        for row in 0..grid.rows() {
            for col in 0..grid.cols() {
                assert_relative_eq!(grid.z_at(row, col), 5.0, epsilon = 1e-9);
            }
        }
        Ok(())
    }

    #[test]
    fn rows_run_north_to_south() -> Result<(), DemError> {
        let grid = interpolate_dem(&plane_cloud(0.0), 1.0)?;
        assert_relative_eq!(grid.y_at(0), 10.0);
        assert_relative_eq!(grid.y_at(9), 1.0);
        assert_relative_eq!(grid.x_at(0), 0.0);
        assert!(grid.y_at(0) > grid.y_at(grid.rows() - 1));
        Ok(())
    }

    #[test]
    fn sloped_plane_is_linear() -> Result<(), DemError> {
        let points: Vec<[f64; 3]> = plane_cloud(0.0)
            .into_iter()
            .map(|p| [p[0], p[1], 2.0 * p[0] + 0.5 * p[1]])
            .collect();
        let grid = interpolate_dem(&points, 0.5)?;
        for row in 0..grid.rows() {
            for col in 0..grid.cols() {
                let expected = 2.0 * grid.x_at(col) + 0.5 * grid.y_at(row);
                assert_relative_eq!(grid.z_at(row, col), expected, epsilon = 1e-9);
            }
        }
        Ok(())
    }

    #[test]
    fn spacing_matches_gsd() -> Result<(), DemError> {
        let grid = interpolate_dem(&plane_cloud(1.0), 0.25)?;
        assert_relative_eq!(grid.x_at(1) - grid.x_at(0), 0.25);
        assert_relative_eq!(grid.y_at(0) - grid.y_at(1), 0.25);
        Ok(())
    }

    #[test]
    fn too_few_points_is_an_error() {
        let points = [[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]];
        assert_eq!(
            interpolate_dem(&points, 1.0),
            Err(DemError::NotEnoughPoints(2))
        );
    }

    #[test]
    fn collinear_cloud_is_an_error() {
        let points = [[0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [2.0, 2.0, 0.0]];
        assert_eq!(interpolate_dem(&points, 1.0), Err(DemError::DegenerateCloud));
    }

    #[test]
    fn invalid_spacing_is_an_error() {
        assert_eq!(
            interpolate_dem(&plane_cloud(0.0), 0.0),
            Err(DemError::InvalidSpacing(0.0))
        );
    }
}
