/// A 3x3 row-major rotation matrix.
pub type Mat3 = [[f64; 3]; 3];

/// Build the world-to-camera rotation matrix from omega, phi, kappa.
///
/// The elementary rotations follow the photogrammetric convention
///
/// ```text
///      | 1       0        0    |        | cos(ph)  0  -sin(ph) |        | cos(kp)   sin(kp)  0 |
/// Rx = | 0    cos(om)  sin(om) |   Ry = |    0     1      0    |   Rz = | -sin(kp)  cos(kp)  0 |
///      | 0   -sin(om)  cos(om) |        | sin(ph)  0   cos(ph) |        |    0         0     1 |
/// ```
///
/// and are composed as `R = Rz * Ry * Rx` (intrinsic Z-Y-X order, kappa
/// applied last in the left-multiplication sense). Multiplying a ground
/// vector by `R` expresses it in the camera frame; the transpose maps the
/// camera frame back to the ground.
///
/// # Arguments
///
/// * `omega` - Rotation about the x axis in radians.
/// * `phi` - Rotation about the y axis in radians.
/// * `kappa` - Rotation about the z axis in radians.
///
/// # Returns
///
/// The composed rotation matrix.
pub fn opk_to_matrix(omega: f64, phi: f64, kappa: f64) -> Mat3 {
    let (so, co) = omega.sin_cos();
    let (sp, cp) = phi.sin_cos();
    let (sk, ck) = kappa.sin_cos();

    [
        [ck * cp, ck * sp * so + sk * co, -ck * sp * co + sk * so],
        [-sk * cp, -sk * sp * so + ck * co, sk * sp * co + ck * so],
        [sp, -cp * so, cp * co],
    ]
}

/// Decompose a rotation matrix built by [`opk_to_matrix`] back into
/// (omega, phi, kappa) in radians.
///
/// Phi is resolved into [-pi/2, pi/2]; omega and kappa into (-pi, pi].
pub fn matrix_to_opk(r: &Mat3) -> [f64; 3] {
    let phi = r[2][0].clamp(-1.0, 1.0).asin();
    let omega = (-r[2][1]).atan2(r[2][2]);
    let kappa = (-r[1][0]).atan2(r[0][0]);
    [omega, phi, kappa]
}

/// Multiply a matrix by a column vector.
pub fn mat_mul_vec(m: &Mat3, v: &[f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

/// Multiply the transpose of a matrix by a column vector.
pub fn mat_t_mul_vec(m: &Mat3, v: &[f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[1][0] * v[1] + m[2][0] * v[2],
        m[0][1] * v[0] + m[1][1] * v[1] + m[2][1] * v[2],
        m[0][2] * v[0] + m[1][2] * v[1] + m[2][2] * v[2],
    ]
}

/// Multiply two matrices.
pub fn mat_mul(a: &Mat3, b: &Mat3) -> Mat3 {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
        }
    }
    out
}
