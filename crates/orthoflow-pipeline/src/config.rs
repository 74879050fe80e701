use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use orthoflow_core::angles::RpyConvention;
use orthoflow_georef::{ControllerConfig, GeorefMode, SensorModel};

use crate::PipelineError;

/// External bundle adjustment solver invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Program to run for each solve.
    pub program: String,
    /// Arguments passed to the program.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Pipeline run configuration.
///
/// Loaded from a JSON file; everything except the image directory, the
/// output directory, the EPSG code and the sensor model has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the geotagged images.
    pub image_path: PathBuf,
    /// Image file extension to process, compared case-insensitively.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Directory receiving orthophotos, point clouds and the log.
    pub output_path: PathBuf,
    /// Sliding window capacity, at least 3.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Prior weighting mode for incremental solves.
    #[serde(default)]
    pub mode: GeorefMode,
    /// Feature matching accuracy level passed to the oracle.
    #[serde(default = "default_matching_accuracy")]
    pub matching_accuracy: u32,
    /// EPSG code of the target CRS.
    pub epsg: u32,
    /// Orthophoto GSD in meters; 0 derives it per image from the flying
    /// height, focal length and pixel pitch.
    #[serde(default)]
    pub gsd: f64,
    /// Fallback ground height in the target CRS, meters.
    #[serde(default)]
    pub ground_height: f64,
    /// Divergence gate on the prior-to-solved distance, meters.
    #[serde(default = "default_position_error_threshold")]
    pub position_error_threshold: f64,
    /// Gimbal angle convention of the capture metadata.
    #[serde(default)]
    pub convention: RpyConvention,
    /// Nominal sensor model used until a solve calibrates one.
    pub sensor: SensorModel,
    /// External solver; absent when the run is wired up with an
    /// in-process oracle.
    #[serde(default)]
    pub oracle: Option<OracleConfig>,
}

fn default_extension() -> String {
    "JPG".to_string()
}

fn default_window_size() -> usize {
    5
}

fn default_matching_accuracy() -> u32 {
    1
}

fn default_position_error_threshold() -> f64 {
    10.0
}

impl Config {
    /// Load and validate a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let reader = BufReader::new(File::open(path)?);
        let config: Config = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the cross-field constraints.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.window_size < 3 {
            return Err(PipelineError::InvalidConfig(format!(
                "window_size must be at least 3, got {}",
                self.window_size
            )));
        }
        if self.gsd < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "gsd must not be negative, got {}",
                self.gsd
            )));
        }
        if self.sensor.focal_length <= 0.0 || self.sensor.pixel_size <= 0.0 {
            return Err(PipelineError::InvalidConfig(
                "sensor focal_length and pixel_size must be positive".to_string(),
            ));
        }
        if self.position_error_threshold <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "position_error_threshold must be positive, got {}",
                self.position_error_threshold
            )));
        }
        Ok(())
    }

    /// The controller slice of this configuration.
    pub fn controller(&self) -> ControllerConfig {
        ControllerConfig {
            mode: self.mode,
            window_size: self.window_size,
            epsg: self.epsg,
            matching_accuracy: self.matching_accuracy,
            ground_height: self.ground_height,
            position_error_threshold: self.position_error_threshold,
            convention: self.convention,
            sensor: self.sensor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> &'static str {
        r#"{
            "image_path": "/data/flight",
            "output_path": "/data/out",
            "epsg": 5186,
            "sensor": { "focal_length": 0.0088, "pixel_size": 2.4e-6 }
        }"#
    }

    #[test]
    fn defaults_are_applied() -> Result<(), PipelineError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");
        std::fs::write(&path, minimal_json())?;

        let config = Config::from_file(&path)?;
        assert_eq!(config.window_size, 5);
        assert_eq!(config.mode, GeorefMode::NonfixedEstimated);
        assert_eq!(config.extension, "JPG");
        assert_eq!(config.gsd, 0.0);
        assert_eq!(config.position_error_threshold, 10.0);
        assert_eq!(config.oracle, None);
        Ok(())
    }

    #[test]
    fn mode_names_are_kebab_case() {
        let json = minimal_json().replace(
            "\"epsg\": 5186",
            "\"epsg\": 5186, \"mode\": \"nonfixed-initial\"",
        );
        let config: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config.mode, GeorefMode::NonfixedInitial);
    }

    #[test]
    fn undersized_window_is_invalid() {
        let json = minimal_json().replace(
            "\"epsg\": 5186",
            "\"epsg\": 5186, \"window_size\": 2",
        );
        let config: Config = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn negative_gsd_is_invalid() {
        let json = minimal_json().replace("\"epsg\": 5186", "\"epsg\": 5186, \"gsd\": -0.1");
        let config: Config = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }
}
