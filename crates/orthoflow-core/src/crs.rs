use thiserror::Error;

use crate::rotation::Mat3;

/// Errors produced when resolving or applying a coordinate reference system.
#[derive(Debug, Error, PartialEq)]
pub enum CrsError {
    /// The EPSG code is not in the supported registry.
    #[error("unsupported EPSG code: {0}")]
    UnsupportedEpsg(u32),
}

/// Reference ellipsoid parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Ellipsoid {
    /// Semi-major axis in meters.
    a: f64,
    /// Flattening.
    f: f64,
}

const WGS84: Ellipsoid = Ellipsoid {
    a: 6_378_137.0,
    f: 1.0 / 298.257_223_563,
};

const GRS80: Ellipsoid = Ellipsoid {
    a: 6_378_137.0,
    f: 1.0 / 298.257_222_101,
};

/// A projected coordinate reference system the pipeline can target.
///
/// All exterior orientation math downstream of the controller happens in
/// exactly one of these; geodetic WGS84 readings are converted on entry.
/// The registry covers the transverse-Mercator family: the Korean TM
/// belts and the WGS84 UTM zones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crs {
    epsg: u32,
    ellipsoid: Ellipsoid,
    /// Latitude of natural origin, radians.
    lat0: f64,
    /// Longitude of natural origin, radians.
    lon0: f64,
    /// Scale factor at the natural origin.
    k0: f64,
    false_easting: f64,
    false_northing: f64,
}

impl Crs {
    /// Resolve an EPSG code into a projection.
    ///
    /// Supported codes: 5185-5188 (Korea TM belts on GRS80) and
    /// 32601-32660 / 32701-32760 (WGS84 UTM north/south zones).
    pub fn from_epsg(epsg: u32) -> Result<Self, CrsError> {
        match epsg {
            // Korea TM: west, central, east, east-sea belts
            5185..=5188 => {
                let lon0 = 125.0 + 2.0 * (epsg - 5185) as f64;
                Ok(Self {
                    epsg,
                    ellipsoid: GRS80,
                    lat0: 38f64.to_radians(),
                    lon0: lon0.to_radians(),
                    k0: 1.0,
                    false_easting: 200_000.0,
                    false_northing: 600_000.0,
                })
            }
            32601..=32660 | 32701..=32760 => {
                let (zone, south) = if epsg <= 32660 {
                    (epsg - 32600, false)
                } else {
                    (epsg - 32700, true)
                };
                Ok(Self {
                    epsg,
                    ellipsoid: WGS84,
                    lat0: 0.0,
                    lon0: (zone as f64 * 6.0 - 183.0).to_radians(),
                    k0: 0.9996,
                    false_easting: 500_000.0,
                    false_northing: if south { 10_000_000.0 } else { 0.0 },
                })
            }
            _ => Err(CrsError::UnsupportedEpsg(epsg)),
        }
    }

    /// The EPSG code this projection was resolved from.
    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    /// Project a geodetic WGS84 position to easting/northing.
    ///
    /// Transverse Mercator forward projection (Snyder 1987, eq. 8-9..8-13).
    ///
    /// # Arguments
    ///
    /// * `lon` - Longitude in degrees.
    /// * `lat` - Latitude in degrees.
    ///
    /// # Returns
    ///
    /// `(easting, northing)` in meters.
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let lat = lat.to_radians();
        let lon = lon.to_radians();

        let e2 = self.ellipsoid.f * (2.0 - self.ellipsoid.f);
        let ep2 = e2 / (1.0 - e2);

        let sin_lat = lat.sin();
        let cos_lat = lat.cos();
        let tan_lat = lat.tan();

        let n = self.ellipsoid.a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let t = tan_lat * tan_lat;
        let c = ep2 * cos_lat * cos_lat;
        let a = (lon - self.lon0) * cos_lat;

        let m = self.meridian_arc(lat);
        let m0 = self.meridian_arc(self.lat0);

        let a2 = a * a;
        let a3 = a2 * a;
        let a4 = a3 * a;
        let a5 = a4 * a;
        let a6 = a5 * a;

        let x = self.k0
            * n
            * (a + (1.0 - t + c) * a3 / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a5 / 120.0);
        let y = self.k0
            * (m - m0
                + n * tan_lat
                    * (a2 / 2.0
                        + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                        + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a6 / 720.0));

        (x + self.false_easting, y + self.false_northing)
    }

    /// Meridian arc length from the equator (Snyder 1987, eq. 3-21).
    fn meridian_arc(&self, lat: f64) -> f64 {
        let e2 = self.ellipsoid.f * (2.0 - self.ellipsoid.f);
        let e4 = e2 * e2;
        let e6 = e4 * e2;

        self.ellipsoid.a
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
    }
}

/// Convert a geodetic WGS84 position to earth-centered earth-fixed.
///
/// # Arguments
///
/// * `lon` - Longitude in degrees.
/// * `lat` - Latitude in degrees.
/// * `height` - Ellipsoidal height in meters.
pub fn geodetic_to_ecef(lon: f64, lat: f64, height: f64) -> [f64; 3] {
    let lat = lat.to_radians();
    let lon = lon.to_radians();
    let e2 = WGS84.f * (2.0 - WGS84.f);
    let n = WGS84.a / (1.0 - e2 * lat.sin().powi(2)).sqrt();

    [
        (n + height) * lat.cos() * lon.cos(),
        (n + height) * lat.cos() * lon.sin(),
        (n * (1.0 - e2) + height) * lat.sin(),
    ]
}

/// Rotation from the ECEF frame to the local east-north-up tangent frame
/// at the given geodetic position (degrees).
pub fn enu_rotation(lon: f64, lat: f64) -> Mat3 {
    let lat = lat.to_radians();
    let lon = lon.to_radians();
    let (sl, cl) = lon.sin_cos();
    let (sp, cp) = lat.sin_cos();

    [
        [-sl, cl, 0.0],
        [-sp * cl, -sp * sl, cp],
        [cp * cl, cp * sl, sp],
    ]
}

/// Per-axis 1-sigma uncertainties in the local east-north-up frame from an
/// ECEF position covariance at the given geodetic position (degrees).
pub fn enu_sigmas(cov_ecef: &Mat3, lon: f64, lat: f64) -> [f64; 3] {
    let r = enu_rotation(lon, lat);
    let c = crate::rotation::mat_mul(&crate::rotation::mat_mul(&r, cov_ecef), &transpose(&r));
    [c[0][0].max(0.0).sqrt(), c[1][1].max(0.0).sqrt(), c[2][2].max(0.0).sqrt()]
}

/// Rotate an ECEF covariance into the local east-north-up frame.
pub fn enu_covariance(cov_ecef: &Mat3, lon: f64, lat: f64) -> Mat3 {
    let r = enu_rotation(lon, lat);
    crate::rotation::mat_mul(&crate::rotation::mat_mul(&r, cov_ecef), &transpose(&r))
}

fn transpose(m: &Mat3) -> Mat3 {
    [
        [m[0][0], m[1][0], m[2][0]],
        [m[0][1], m[1][1], m[2][1]],
        [m[0][2], m[1][2], m[2][2]],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn korea_tm_natural_origin() -> Result<(), CrsError> {
        let crs = Crs::from_epsg(5186)?;
        let (x, y) = crs.project(127.0, 38.0);
        assert_relative_eq!(x, 200_000.0, epsilon = 1e-6);
        assert_relative_eq!(y, 600_000.0, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn utm_central_meridian_is_false_easting() -> Result<(), CrsError> {
        // zone 52N covers 126E..132E, central meridian 129E
        let crs = Crs::from_epsg(32652)?;
        let (x, _) = crs.project(129.0, 35.0);
        assert_relative_eq!(x, 500_000.0, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn northing_grows_with_latitude() -> Result<(), CrsError> {
        let crs = Crs::from_epsg(5186)?;
        let (_, y0) = crs.project(127.1, 37.5);
        let (_, y1) = crs.project(127.1, 37.6);
        assert!(y1 > y0);
        // one degree of latitude is about 111 km
        let (_, y2) = crs.project(127.0, 39.0);
        assert_relative_eq!(y2 - 600_000.0, 111_006.0, epsilon = 50.0);
        Ok(())
    }

    #[test]
    fn unknown_epsg_is_rejected() {
        assert_eq!(Crs::from_epsg(99999), Err(CrsError::UnsupportedEpsg(99999)));
        assert_eq!(Crs::from_epsg(4326), Err(CrsError::UnsupportedEpsg(4326)));
    }

    #[test]
    fn ecef_on_the_equator() {
        let p = geodetic_to_ecef(0.0, 0.0, 0.0);
        assert_relative_eq!(p[0], 6_378_137.0, epsilon = 1e-6);
        assert_relative_eq!(p[1], 0.0, epsilon = 1e-6);
        assert_relative_eq!(p[2], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn enu_sigmas_of_diagonal_covariance() {
        // an isotropic covariance is invariant under the tangent rotation
        let cov = [[4.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 4.0]];
        let sigmas = enu_sigmas(&cov, 127.0, 37.0);
        for s in sigmas {
            assert_relative_eq!(s, 2.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn enu_rotation_is_orthonormal() {
        let r = enu_rotation(127.3, 36.4);
        for i in 0..3 {
            let norm: f64 = r[i].iter().map(|v| v * v).sum();
            assert_relative_eq!(norm, 1.0, epsilon = 1e-12);
        }
        let dot: f64 = (0..3).map(|k| r[0][k] * r[1][k]).sum();
        assert_relative_eq!(dot, 0.0, epsilon = 1e-12);
    }
}
