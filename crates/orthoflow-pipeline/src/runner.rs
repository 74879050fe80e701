use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use orthoflow_core::eop::ground_sampling_distance;
use orthoflow_dem::ply::write_ply_binary;
use orthoflow_dem::{interpolate_dem, GroundFilter, PassthroughFilter, PointCloud};
use orthoflow_georef::{BundleOracle, CameraSolution, Capture, Controller, Outcome};
use orthoflow_io::jpeg::read_image_jpeg_rgb8;
use orthoflow_io::raster::write_orthophoto;

use crate::config::Config;
use crate::PipelineError;

/// Counters of one pipeline run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Images that produced an orthophoto.
    pub processed: usize,
    /// Accepted bundle adjustment solves.
    pub accepted: usize,
    /// Rejected solves that fell back to direct georeferencing.
    pub rejected: usize,
    /// Images skipped for unreadable metadata.
    pub skipped: usize,
    /// Whether the run stopped on the cancel flag.
    pub interrupted: bool,
}

/// The sequential image-to-orthophoto pipeline.
///
/// Images are processed strictly one at a time, controller to DEM to
/// rectification to writer, because the persisted solve state is a
/// single mutable resource. The only internal parallelism lives inside
/// the rectification kernel.
pub struct Pipeline<O> {
    config: Config,
    controller: Controller<O>,
    cancel: Arc<AtomicBool>,
}

impl<O: BundleOracle> Pipeline<O> {
    /// Create a pipeline, its output directories and a fresh session.
    pub fn new(config: Config, oracle: O) -> Result<Self, PipelineError> {
        config.validate()?;
        std::fs::create_dir_all(&config.output_path)?;
        std::fs::create_dir_all(config.output_path.join("pointclouds"))?;

        let controller = Controller::new(
            config.controller(),
            oracle,
            config.output_path.join("eo.txt"),
        )?;
        Ok(Self {
            config,
            controller,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The flag that stops the run between images when set.
    ///
    /// Accumulated tie points are still flushed after an interrupt.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// The georeferencing controller driving this run.
    pub fn controller(&self) -> &Controller<O> {
        &self.controller
    }

    /// Process every image in the configured directory in filename order.
    pub fn run(&mut self) -> Result<RunSummary, PipelineError> {
        let images = list_images(&self.config.image_path, &self.config.extension)?;
        log::info!(
            "processing {} images from {}",
            images.len(),
            self.config.image_path.display()
        );

        let mut summary = RunSummary::default();
        for path in images {
            if self.cancel.load(Ordering::Relaxed) {
                log::warn!("interrupted, flushing accumulated artifacts");
                summary.interrupted = true;
                break;
            }

            let capture = match Capture::from_path(&path) {
                Ok(capture) => capture,
                Err(err) => {
                    log::error!("{}: skipping, {err}", path.display());
                    summary.skipped += 1;
                    continue;
                }
            };

            let name = capture.name.clone();
            let started = Instant::now();
            let outcome = self.controller.process(capture)?;
            log::info!("{name}: georeferenced in {:.2?}", started.elapsed());

            match outcome {
                Outcome::Direct(solution) => {
                    self.write_plane_orthophoto(&path, &solution)?;
                }
                Outcome::Accepted { solution, cloud } => {
                    summary.accepted += 1;
                    let artifact = self
                        .config
                        .output_path
                        .join("pointclouds")
                        .join(format!("{}.ply", stem(&solution.name)));
                    write_ply_binary(&artifact, &cloud)
                        .map_err(orthoflow_georef::GeorefError::from)?;
                    self.write_solved_orthophoto(&path, &solution, &cloud)?;
                }
                Outcome::Rejected { reason, fallback } => {
                    summary.rejected += 1;
                    log::warn!("{name}: solve rejected ({reason:?}), direct fallback");
                    self.write_plane_orthophoto(&path, &fallback)?;
                }
            }
            summary.processed += 1;
            log::info!("{name}: orthophoto done in {:.2?}", started.elapsed());
        }

        let merged = self.config.output_path.join("pointclouds").join("merged.ply");
        self.controller
            .session()
            .flush_points(&merged)
            .map_err(PipelineError::from)?;
        log::info!(
            "run finished: {} processed, {} accepted, {} rejected, {} skipped",
            summary.processed,
            summary.accepted,
            summary.rejected,
            summary.skipped
        );
        Ok(summary)
    }

    /// Rectify over a DEM interpolated from the solve's tie points,
    /// falling back to the flat plane when the cloud cannot support one.
    fn write_solved_orthophoto(
        &self,
        path: &Path,
        solution: &CameraSolution,
        cloud: &PointCloud,
    ) -> Result<(), PipelineError> {
        let ground = cloud.select(&PassthroughFilter.classify(cloud.points()));
        let gsd = self.gsd_for(solution);

        let started = Instant::now();
        let dem = match interpolate_dem(ground.points(), gsd) {
            Ok(dem) => dem,
            Err(err) => {
                log::warn!("{}: no DEM ({err}), rectifying on the plane", solution.name);
                return self.write_plane_orthophoto(path, solution);
            }
        };
        log::debug!("{}: DEM interpolated in {:.2?}", solution.name, started.elapsed());

        let image = read_image_jpeg_rgb8(path)?;
        let rectify_started = Instant::now();
        let channels = orthoflow_rectify::rectify_dem(
            &dem,
            &solution.eop,
            solution.focal_length,
            solution.pixel_size,
            &image,
        );
        log::debug!(
            "{}: rectified in {:.2?}",
            solution.name,
            rectify_started.elapsed()
        );

        let bbox = dem.bbox();
        write_orthophoto(
            self.orthophoto_path(&solution.name),
            &channels.b,
            &channels.g,
            &channels.r,
            &channels.a,
            channels.width,
            channels.height,
            gsd,
            (bbox.x_min, bbox.y_max),
        )?;
        Ok(())
    }

    /// Rectify onto a flat plane at the scene ground height, the warmup
    /// and rejection path.
    fn write_plane_orthophoto(
        &self,
        path: &Path,
        solution: &CameraSolution,
    ) -> Result<(), PipelineError> {
        let image = read_image_jpeg_rgb8(path)?;
        let gsd = self.gsd_for(solution);
        let bbox = orthoflow_rectify::plane_bbox(
            image.width(),
            image.height(),
            &solution.eop,
            solution.pixel_size,
            solution.focal_length,
            solution.ground_height,
        );
        let channels = orthoflow_rectify::rectify_plane(
            &bbox,
            gsd,
            &solution.eop,
            solution.ground_height,
            solution.focal_length,
            solution.pixel_size,
            &image,
        );

        write_orthophoto(
            self.orthophoto_path(&solution.name),
            &channels.b,
            &channels.g,
            &channels.r,
            &channels.a,
            channels.width,
            channels.height,
            gsd,
            (bbox.x_min, bbox.y_max),
        )?;
        Ok(())
    }

    fn gsd_for(&self, solution: &CameraSolution) -> f64 {
        if self.config.gsd > 0.0 {
            self.config.gsd
        } else {
            ground_sampling_distance(
                solution.pixel_size,
                solution.eop.position[2],
                solution.ground_height,
                solution.focal_length,
            )
        }
    }

    /// Output path without extension; the writer adds `.png` and `.pgw`.
    fn orthophoto_path(&self, name: &str) -> PathBuf {
        self.config.output_path.join(stem(name))
    }
}

fn stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}

/// List the images with the configured extension, sorted by file name.
///
/// Capture order follows naming order, so this is the temporal order.
fn list_images(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, PipelineError> {
    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn images_are_listed_in_name_order() -> Result<(), PipelineError> {
        let dir = tempfile::tempdir()?;
        for name in ["010.JPG", "002.jpg", "001.JPG", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"")?;
        }

        let images = list_images(dir.path(), "JPG")?;
        let names: Vec<String> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["001.JPG", "002.jpg", "010.JPG"]);
        Ok(())
    }

    #[test]
    fn stem_drops_the_extension() {
        assert_eq!(stem("DJI_0042.JPG"), "DJI_0042");
        assert_eq!(stem("plain"), "plain");
    }
}
