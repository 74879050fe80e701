//! Bowyer-Watson Delaunay triangulation of scattered 2-D points.
//!
//! Backs the linear DEM interpolation: ground points are triangulated in
//! the horizontal plane and elevations are read off the triangles
//! barycentrically.

/// A triangle as three indices into the point list, oriented
/// counter-clockwise.
pub(crate) type Triangle = [usize; 3];

/// Triangulate a set of 2-D points.
///
/// Returns an empty list when every point is collinear. Duplicate points
/// are tolerated; degenerate zero-area triangles are never emitted.
pub(crate) fn triangulate(points: &[[f64; 2]]) -> Vec<Triangle> {
    if points.len() < 3 {
        return Vec::new();
    }

    // a super-triangle generously enclosing the bounding box
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
    for p in points {
        min_x = min_x.min(p[0]);
        min_y = min_y.min(p[1]);
        max_x = max_x.max(p[0]);
        max_y = max_y.max(p[1]);
    }
    let span = (max_x - min_x).max(max_y - min_y).max(1.0);
    let mid_x = (min_x + max_x) / 2.0;
    let mid_y = (min_y + max_y) / 2.0;

    let mut verts: Vec<[f64; 2]> = points.to_vec();
    let super_base = verts.len();
    verts.push([mid_x - 20.0 * span, mid_y - span]);
    verts.push([mid_x + 20.0 * span, mid_y - span]);
    verts.push([mid_x, mid_y + 20.0 * span]);

    let mut triangles: Vec<Triangle> = vec![ccw(&verts, [super_base, super_base + 1, super_base + 2])];

    for idx in 0..points.len() {
        let p = verts[idx];

        // triangles whose circumcircle contains the new point
        let mut bad = Vec::new();
        for (t, tri) in triangles.iter().enumerate() {
            if in_circumcircle(&verts, tri, p) {
                bad.push(t);
            }
        }

        // boundary of the cavity: edges of bad triangles not shared twice
        let mut boundary: Vec<(usize, usize)> = Vec::new();
        for &t in &bad {
            let [a, b, c] = triangles[t];
            for edge in [(a, b), (b, c), (c, a)] {
                if let Some(pos) = boundary
                    .iter()
                    .position(|&(x, y)| (x, y) == (edge.1, edge.0))
                {
                    boundary.swap_remove(pos);
                } else {
                    boundary.push(edge);
                }
            }
        }

        for &t in bad.iter().rev() {
            triangles.swap_remove(t);
        }

        for (a, b) in boundary {
            let tri = ccw(&verts, [a, b, idx]);
            if area2(&verts, &tri).abs() > f64::EPSILON {
                triangles.push(tri);
            }
        }
    }

    triangles.retain(|tri| tri.iter().all(|&v| v < super_base));
    triangles
}

/// Twice the signed area of a triangle.
fn area2(verts: &[[f64; 2]], tri: &Triangle) -> f64 {
    let [a, b, c] = *tri;
    (verts[b][0] - verts[a][0]) * (verts[c][1] - verts[a][1])
        - (verts[b][1] - verts[a][1]) * (verts[c][0] - verts[a][0])
}

/// Reorder the triangle counter-clockwise.
fn ccw(verts: &[[f64; 2]], tri: Triangle) -> Triangle {
    if area2(verts, &tri) < 0.0 {
        [tri[0], tri[2], tri[1]]
    } else {
        tri
    }
}

/// Whether `p` lies strictly inside the circumcircle of a CCW triangle.
fn in_circumcircle(verts: &[[f64; 2]], tri: &Triangle, p: [f64; 2]) -> bool {
    let [a, b, c] = *tri;
    let ax = verts[a][0] - p[0];
    let ay = verts[a][1] - p[1];
    let bx = verts[b][0] - p[0];
    let by = verts[b][1] - p[1];
    let cx = verts[c][0] - p[0];
    let cy = verts[c][1] - p[1];

    let det = (ax * ax + ay * ay) * (bx * cy - cx * by)
        - (bx * bx + by * by) * (ax * cy - cx * ay)
        + (cx * cx + cy * cy) * (ax * by - bx * ay);

    det > 0.0
}

/// Barycentric coordinates of `p` in the given triangle, or `None` when
/// the triangle is degenerate.
pub(crate) fn barycentric(
    verts: &[[f64; 2]],
    tri: &Triangle,
    p: [f64; 2],
) -> Option<[f64; 3]> {
    let denom = area2(verts, tri);
    if denom.abs() < f64::EPSILON {
        return None;
    }
    let [a, b, c] = *tri;
    let w0 = ((verts[b][0] - p[0]) * (verts[c][1] - p[1])
        - (verts[b][1] - p[1]) * (verts[c][0] - p[0]))
        / denom;
    let w1 = ((verts[c][0] - p[0]) * (verts[a][1] - p[1])
        - (verts[c][1] - p[1]) * (verts[a][0] - p[0]))
        / denom;
    Some([w0, w1, 1.0 - w0 - w1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn square_splits_into_two_triangles() {
        let points = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let tris = triangulate(&points);
        assert_eq!(tris.len(), 2);
        let area: f64 = tris.iter().map(|t| area2(&points, t) / 2.0).sum();
        assert_relative_eq!(area, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn collinear_points_produce_nothing() {
        let points = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        assert!(triangulate(&points).is_empty());
    }

    #[test]
    fn triangulation_is_delaunay() {
        // no vertex may fall inside any triangle's circumcircle
        let points = [
            [0.0, 0.0],
            [2.5, 0.3],
            [4.9, 0.1],
            [0.4, 2.6],
            [2.2, 2.4],
            [5.1, 2.8],
            [0.1, 5.0],
            [2.7, 4.7],
            [4.8, 5.2],
        ];
        let tris = triangulate(&points);
        assert!(!tris.is_empty());
        for tri in &tris {
            for (i, p) in points.iter().enumerate() {
                if tri.contains(&i) {
                    continue;
                }
                assert!(
                    !in_circumcircle(&points, tri, *p),
                    "point {i} violates the empty-circle property of {tri:?}"
                );
            }
        }
    }

    #[test]
    fn barycentric_weights_sum_to_one() {
        let points = [[0.0, 0.0], [4.0, 0.0], [0.0, 4.0]];
        let w = barycentric(&points, &[0, 1, 2], [1.0, 1.0]).unwrap();
        assert_relative_eq!(w[0] + w[1] + w[2], 1.0, epsilon = 1e-12);
        assert!(w.iter().all(|&v| v >= 0.0));
    }
}
