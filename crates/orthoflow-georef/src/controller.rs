use std::path::Path;

use serde::{Deserialize, Serialize};

use orthoflow_core::angles::{rpy_to_opk, RpyConvention};
use orthoflow_core::crs::enu_covariance;
use orthoflow_core::eop::Eop;
use orthoflow_core::rotation::matrix_to_opk;
use orthoflow_dem::PointCloud;

use crate::oracle::{BundleOracle, CameraPrior, SolveRequest, SolvedTransform};
use crate::reflog::ReferenceRecord;
use crate::session::Session;
use crate::window::{Capture, Phase};
use crate::GeorefError;

/// Accuracy weight pinning a camera in place, meters.
const PINNED_ACCURACY_M: f64 = 0.001;

/// Accuracy weight leaving a camera free to move, meters.
const LOOSE_ACCURACY_M: f64 = 10.0;

/// Rotation accuracy weight applied to every prior, degrees.
const ROTATION_ACCURACY_DEG: f64 = 0.01;

/// How the older window cameras are weighted on incremental solves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeorefMode {
    /// Older cameras pinned at their last solved pose; only the newest
    /// camera is free.
    Fixed,
    /// Older cameras loose, priors re-imported from the raw sensor
    /// readings on every step.
    NonfixedInitial,
    /// Older cameras loose, priors taken from their previously solved
    /// poses. The most accurate variant and the default.
    #[default]
    NonfixedEstimated,
}

/// Camera intrinsics used by direct georeferencing and the rectifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorModel {
    /// Focal length in meters.
    pub focal_length: f64,
    /// Pixel pitch in meters.
    pub pixel_size: f64,
}

/// Configuration of the georeferencing controller, constant for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Prior weighting mode for incremental solves.
    pub mode: GeorefMode,
    /// Sliding window capacity, at least 3.
    pub window_size: usize,
    /// EPSG code of the target CRS.
    pub epsg: u32,
    /// Feature matching accuracy level passed to the oracle.
    pub matching_accuracy: u32,
    /// Fallback ground height in the target CRS, meters.
    pub ground_height: f64,
    /// Divergence gate on the prior-to-solved distance, meters.
    pub position_error_threshold: f64,
    /// Gimbal angle convention of the capture metadata.
    pub convention: RpyConvention,
    /// Nominal sensor model used until a solve calibrates one.
    pub sensor: SensorModel,
}

/// The exterior orientation and intrinsics settled for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraSolution {
    /// Camera label, the image file name.
    pub name: String,
    /// Position and orientation in the target CRS.
    pub eop: Eop,
    /// Focal length in meters.
    pub focal_length: f64,
    /// Pixel pitch in meters.
    pub pixel_size: f64,
    /// Scene ground height under this image, meters.
    pub ground_height: f64,
}

/// Why a solve outcome was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// The oracle reported no transform for the newest camera.
    Unregistered,
    /// The solved position moved too far from its prior.
    Divergent {
        /// Distance between prior and solved position, meters.
        error: f64,
    },
    /// The oracle process failed or returned garbage.
    OracleUnavailable(String),
}

/// Result of processing one capture.
#[derive(Debug)]
pub enum Outcome {
    /// Warmup image georeferenced directly from its sensor readings.
    Direct(CameraSolution),
    /// Solve accepted; the reference log and the session advanced.
    Accepted {
        /// The solved exterior orientation and intrinsics.
        solution: CameraSolution,
        /// Tie points of this solve, in the target CRS.
        cloud: PointCloud,
    },
    /// Solve rejected; persisted state unchanged, direct georeferencing
    /// keeps an orthophoto available at degraded accuracy.
    Rejected {
        /// Why the solve was not accepted.
        reason: Rejection,
        /// Direct-georeferenced fallback for this image.
        fallback: CameraSolution,
    },
}

/// The incremental georeferencing state machine.
///
/// One instance per run. Each capture is classified by the sliding
/// window into warmup, bootstrap or steady and dispatched to direct
/// georeferencing or an oracle solve; accepted solves advance the
/// session, rejected ones leave it untouched.
pub struct Controller<O> {
    config: ControllerConfig,
    oracle: O,
    session: Session,
}

impl<O: BundleOracle> Controller<O> {
    /// Create a controller with a fresh session.
    pub fn new(
        config: ControllerConfig,
        oracle: O,
        log_path: impl AsRef<Path>,
    ) -> Result<Self, GeorefError> {
        let session = Session::new(config.window_size, config.epsg, log_path)?;
        Ok(Self {
            config,
            oracle,
            session,
        })
    }

    /// Create a controller continuing from a previous run's reference
    /// log, with the pose cache seeded from its rows.
    pub fn resume(
        config: ControllerConfig,
        oracle: O,
        log_path: impl AsRef<Path>,
    ) -> Result<Self, GeorefError> {
        let session = Session::resume(config.window_size, config.epsg, log_path)?;
        Ok(Self {
            config,
            oracle,
            session,
        })
    }

    /// The persisted session state.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The injected oracle.
    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Process one capture through the state machine.
    pub fn process(&mut self, capture: Capture) -> Result<Outcome, GeorefError> {
        let (phase, evicted) = self.session.window.push(capture.clone());
        if let Some(old) = evicted {
            self.session.eop_cache.remove(&old.name);
        }

        match phase {
            Phase::Warmup => {
                let solution = self.direct_solution(&capture);
                self.session
                    .eop_cache
                    .insert(solution.name.clone(), solution.eop);
                self.session.log.append(&ReferenceRecord {
                    name: solution.name.clone(),
                    eop: solution.eop,
                    covariance: None,
                })?;
                log::info!("{}: warmup, direct georeferencing", capture.name);
                Ok(Outcome::Direct(solution))
            }
            Phase::Bootstrap | Phase::Steady => self.solve(phase, &capture),
        }
    }

    fn solve(&mut self, phase: Phase, capture: &Capture) -> Result<Outcome, GeorefError> {
        let request = self.build_request(phase);
        let prior_position = request
            .cameras
            .last()
            .map(|camera| camera.position)
            .unwrap_or_default();

        let response = match self.oracle.solve(&request) {
            Ok(response) => response,
            Err(GeorefError::OracleUnavailable(message)) => {
                log::warn!("{}: solve unavailable: {message}", capture.name);
                return Ok(Outcome::Rejected {
                    reason: Rejection::OracleUnavailable(message),
                    fallback: self.direct_solution(capture),
                });
            }
            Err(other) => return Err(other),
        };

        let transform = response
            .cameras
            .iter()
            .find(|camera| camera.name == capture.name)
            .and_then(|camera| camera.transform.clone());
        let Some(transform) = transform else {
            log::warn!("{}: not processed, camera unregistered", capture.name);
            return Ok(Outcome::Rejected {
                reason: Rejection::Unregistered,
                fallback: self.direct_solution(capture),
            });
        };

        let eop = self.solved_eop(&transform);
        let error = eop.distance_to(&prior_position);
        if error > self.config.position_error_threshold {
            log::warn!(
                "{}: divergent solve, {error:.2} m from prior (threshold {} m)",
                capture.name,
                self.config.position_error_threshold
            );
            return Ok(Outcome::Rejected {
                reason: Rejection::Divergent { error },
                fallback: self.direct_solution(capture),
            });
        }

        // accept: refresh the cache with every registered camera
        for camera in &response.cameras {
            if let Some(t) = &camera.transform {
                self.session
                    .eop_cache
                    .insert(camera.name.clone(), self.solved_eop(t));
            }
        }
        self.session.bootstrapped = true;

        let covariance = transform
            .covariance
            .map(|cov| enu_covariance(&cov, transform.center[0], transform.center[1]));
        self.session.log.append(&ReferenceRecord {
            name: capture.name.clone(),
            eop,
            covariance,
        })?;

        let cloud = PointCloud::new(response.points.clone(), response.colors.clone());
        self.session.merged_cloud.extend(&cloud);
        let ground_height = scene_center_height(&cloud).unwrap_or(self.config.ground_height);

        log::info!(
            "{}: accepted, {error:.2} m from prior, {} tie points",
            capture.name,
            cloud.len()
        );
        Ok(Outcome::Accepted {
            solution: CameraSolution {
                name: capture.name.clone(),
                eop,
                focal_length: response.focal_length,
                pixel_size: response.pixel_size,
                ground_height,
            },
            cloud,
        })
    }

    fn build_request(&self, phase: Phase) -> SolveRequest {
        let newest = self
            .session
            .window
            .newest()
            .map(|capture| capture.name.clone())
            .unwrap_or_default();
        // a failed bootstrap leaves no match graph to reuse
        let reset_matches = phase == Phase::Bootstrap || !self.session.bootstrapped;

        let mut cameras = Vec::with_capacity(self.session.window.len());
        for capture in self.session.window.iter() {
            let raw = self.raw_prior(capture);
            let prior = if capture.name == newest || reset_matches {
                raw
            } else {
                match self.config.mode {
                    GeorefMode::Fixed => {
                        let mut prior = self.cached_prior(capture).unwrap_or(raw);
                        prior.position_accuracy = [PINNED_ACCURACY_M; 3];
                        prior
                    }
                    GeorefMode::NonfixedInitial => raw,
                    GeorefMode::NonfixedEstimated => self.cached_prior(capture).unwrap_or(raw),
                }
            };
            cameras.push(prior);
        }

        SolveRequest {
            epsg: self.config.epsg,
            reset_matches,
            matching_accuracy: self.config.matching_accuracy,
            cameras,
        }
    }

    /// Prior straight from the sensor readings: projected GPS position
    /// with the altitude replaced by relative altitude over the fallback
    /// ground, and gimbal angles mapped to omega-phi-kappa.
    fn raw_prior(&self, capture: &Capture) -> CameraPrior {
        let (x, y) = self
            .session
            .crs
            .project(capture.meta.longitude, capture.meta.latitude);
        CameraPrior {
            name: capture.name.clone(),
            path: capture.path.clone(),
            position: [x, y, self.config.ground_height + capture.meta.relative_altitude],
            position_accuracy: [LOOSE_ACCURACY_M; 3],
            orientation: rpy_to_opk(
                capture.meta.gimbal_roll,
                capture.meta.gimbal_pitch,
                capture.meta.gimbal_yaw,
                self.config.convention,
            ),
            rotation_accuracy: ROTATION_ACCURACY_DEG,
        }
    }

    fn cached_prior(&self, capture: &Capture) -> Option<CameraPrior> {
        self.session.eop_cache.get(&capture.name).map(|eop| CameraPrior {
            name: capture.name.clone(),
            path: capture.path.clone(),
            position: eop.position,
            position_accuracy: [LOOSE_ACCURACY_M; 3],
            orientation: [eop.omega, eop.phi, eop.kappa],
            rotation_accuracy: ROTATION_ACCURACY_DEG,
        })
    }

    fn direct_solution(&self, capture: &Capture) -> CameraSolution {
        let prior = self.raw_prior(capture);
        CameraSolution {
            name: capture.name.clone(),
            eop: Eop::new(
                prior.position,
                prior.orientation[0],
                prior.orientation[1],
                prior.orientation[2],
            ),
            focal_length: self.config.sensor.focal_length,
            pixel_size: self.config.sensor.pixel_size,
            ground_height: self.config.ground_height,
        }
    }

    fn solved_eop(&self, transform: &SolvedTransform) -> Eop {
        let (x, y) = self
            .session
            .crs
            .project(transform.center[0], transform.center[1]);
        let [omega, phi, kappa] = matrix_to_opk(&transform.rotation);
        Eop::new(
            [x, y, transform.center[2]],
            omega.to_degrees(),
            phi.to_degrees(),
            kappa.to_degrees(),
        )
    }
}

/// Midpoint of the cloud's height range, the scene-center height used
/// for auto GSD and the flat-plane fallback.
fn scene_center_height(cloud: &PointCloud) -> Option<f64> {
    if cloud.is_empty() {
        return None;
    }
    let mut min = f64::MAX;
    let mut max = f64::MIN;
    for point in cloud.points() {
        min = min.min(point[2]);
        max = max.max(point[2]);
    }
    Some((min + max) / 2.0)
}
