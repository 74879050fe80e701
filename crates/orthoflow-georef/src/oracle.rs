use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};

use orthoflow_core::rotation::Mat3;

use crate::GeorefError;

/// Prior pose of one camera submitted to the oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraPrior {
    /// Camera label, the image file name.
    pub name: String,
    /// Path to the image file.
    pub path: PathBuf,
    /// Prior position in the target CRS, meters.
    pub position: [f64; 3],
    /// Per-axis position accuracy weight, meters. Small values pin the
    /// camera, large values leave it free to move.
    pub position_accuracy: [f64; 3],
    /// Prior omega, phi, kappa in degrees.
    pub orientation: [f64; 3],
    /// Rotation accuracy weight in degrees.
    pub rotation_accuracy: f64,
}

/// One feature-matching and bundle adjustment request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveRequest {
    /// EPSG code of the target CRS the priors and points are expressed in.
    pub epsg: u32,
    /// Discard existing matches and re-match the whole set. Set on the
    /// bootstrap solve; incremental solves reuse the match graph.
    pub reset_matches: bool,
    /// Feature matching accuracy level, passed through to the matcher.
    pub matching_accuracy: u32,
    /// The window cameras, oldest first.
    pub cameras: Vec<CameraPrior>,
}

/// Solved pose of one camera, absent when registration failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolvedCamera {
    /// Camera label, matching the request.
    pub name: String,
    /// The solved transform, `None` when the camera stayed unregistered.
    pub transform: Option<SolvedTransform>,
}

/// A solved camera pose as the oracle reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolvedTransform {
    /// Geodetic WGS84 projection center: longitude, latitude in degrees
    /// and ellipsoidal height in meters.
    pub center: [f64; 3],
    /// World-to-camera rotation matrix in the target CRS frame.
    pub rotation: Mat3,
    /// Position covariance in the ECEF frame, when the solver exports it.
    #[serde(default)]
    pub covariance: Option<Mat3>,
}

/// Result of a bundle adjustment solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveResponse {
    /// Per-camera solved transforms, one entry per requested camera.
    pub cameras: Vec<SolvedCamera>,
    /// Sparse tie points in the target CRS.
    pub points: Vec<[f64; 3]>,
    /// Per-point RGB colors, parallel to `points`.
    #[serde(default)]
    pub colors: Option<Vec<[u8; 3]>>,
    /// Calibrated focal length in meters.
    pub focal_length: f64,
    /// Sensor pixel pitch in meters.
    pub pixel_size: f64,
}

/// The external feature-matching and bundle adjustment engine.
///
/// The solver itself is out of scope; this is only the protocol for
/// invoking it and consuming its results. The call is synchronous and a
/// failure maps to [`GeorefError::OracleUnavailable`], which the
/// controller downgrades to a rejected solve.
pub trait BundleOracle {
    /// Run one solve over the given window.
    fn solve(&mut self, request: &SolveRequest) -> Result<SolveResponse, GeorefError>;
}

/// An oracle backed by an external process speaking JSON on stdin/stdout.
#[derive(Debug, Clone)]
pub struct CommandOracle {
    program: String,
    args: Vec<String>,
}

impl CommandOracle {
    /// Create an oracle invoking `program` with the given arguments.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl BundleOracle for CommandOracle {
    fn solve(&mut self, request: &SolveRequest) -> Result<SolveResponse, GeorefError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| GeorefError::OracleUnavailable(e.to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| GeorefError::OracleUnavailable("stdin not captured".to_string()))?;
        serde_json::to_writer(stdin, request)
            .map_err(|e| GeorefError::OracleUnavailable(e.to_string()))?;

        let output = child
            .wait_with_output()
            .map_err(|e| GeorefError::OracleUnavailable(e.to_string()))?;
        if !output.status.success() {
            return Err(GeorefError::OracleUnavailable(format!(
                "solver exited with {}",
                output.status
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| GeorefError::OracleUnavailable(e.to_string()))
    }
}

/// A fake oracle replaying scripted responses, for tests.
///
/// Records every request so a test can assert on the priors and flags
/// the controller produced.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    responses: VecDeque<SolveResponse>,
    requests: Vec<SolveRequest>,
}

impl ScriptedOracle {
    /// Create a scripted oracle replaying the given responses in order.
    pub fn new(responses: Vec<SolveResponse>) -> Self {
        Self {
            responses: responses.into(),
            requests: Vec::new(),
        }
    }

    /// The requests received so far, oldest first.
    pub fn requests(&self) -> &[SolveRequest] {
        &self.requests
    }
}

impl BundleOracle for ScriptedOracle {
    fn solve(&mut self, request: &SolveRequest) -> Result<SolveResponse, GeorefError> {
        self.requests.push(request.clone());
        self.responses
            .pop_front()
            .ok_or_else(|| GeorefError::OracleUnavailable("script exhausted".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SolveRequest {
        SolveRequest {
            epsg: 5186,
            reset_matches: true,
            matching_accuracy: 1,
            cameras: vec![CameraPrior {
                name: "001.jpg".to_string(),
                path: PathBuf::from("/data/001.jpg"),
                position: [200_000.0, 600_000.0, 150.0],
                position_accuracy: [10.0, 10.0, 10.0],
                orientation: [0.0, 0.0, 0.0],
                rotation_accuracy: 0.01,
            }],
        }
    }

    #[test]
    fn scripted_oracle_replays_in_order() {
        let first = SolveResponse {
            cameras: vec![],
            points: vec![[1.0, 2.0, 3.0]],
            colors: None,
            focal_length: 0.0088,
            pixel_size: 2.4e-6,
        };
        let mut oracle = ScriptedOracle::new(vec![first.clone()]);

        let response = oracle.solve(&request()).unwrap();
        assert_eq!(response, first);
        assert_eq!(oracle.requests().len(), 1);
        assert!(oracle.requests()[0].reset_matches);

        // exhausted scripts surface as an unavailable oracle
        assert!(matches!(
            oracle.solve(&request()),
            Err(GeorefError::OracleUnavailable(_))
        ));
    }

    #[test]
    fn command_oracle_round_trips_json() {
        let reply = concat!(
            "{\"cameras\":[{\"name\":\"001.jpg\",\"transform\":null}],",
            "\"points\":[],\"focal_length\":0.0088,\"pixel_size\":2.4e-6}",
        );
        let mut oracle = CommandOracle::new(
            "sh",
            vec![
                "-c".to_string(),
                format!("cat > /dev/null; printf '%s' '{reply}'"),
            ],
        );

        let response = oracle.solve(&request()).unwrap();
        assert_eq!(response.cameras.len(), 1);
        assert!(response.cameras[0].transform.is_none());
        assert_eq!(response.colors, None);
    }

    #[test]
    fn missing_program_is_unavailable() {
        let mut oracle = CommandOracle::new("definitely-not-a-real-solver", vec![]);
        assert!(matches!(
            oracle.solve(&request()),
            Err(GeorefError::OracleUnavailable(_))
        ));
    }

    #[test]
    fn failing_program_is_unavailable() {
        let mut oracle = CommandOracle::new("sh", vec!["-c".to_string(), "exit 3".to_string()]);
        assert!(matches!(
            oracle.solve(&request()),
            Err(GeorefError::OracleUnavailable(_))
        ));
    }
}
