use std::collections::HashMap;
use std::path::Path;

use orthoflow_core::crs::Crs;
use orthoflow_core::eop::Eop;
use orthoflow_dem::ply::write_ply_binary;
use orthoflow_dem::PointCloud;

use crate::reflog::ReferenceLog;
use crate::window::SlidingWindow;
use crate::GeorefError;

/// Persisted per-run state of the incremental controller.
///
/// Exactly one session exists per run and only one image is ever in
/// flight against it; every mutation happens between two solves. The
/// exterior orientation cache holds the latest accepted pose of every
/// window camera and feeds the estimated-priors mode.
#[derive(Debug)]
pub struct Session {
    pub(crate) window: SlidingWindow,
    pub(crate) crs: Crs,
    pub(crate) eop_cache: HashMap<String, Eop>,
    pub(crate) merged_cloud: PointCloud,
    pub(crate) log: ReferenceLog,
    pub(crate) bootstrapped: bool,
}

impl Session {
    /// Create a fresh session writing its reference log at `log_path`.
    pub fn new(
        window_size: usize,
        epsg: u32,
        log_path: impl AsRef<Path>,
    ) -> Result<Self, GeorefError> {
        Ok(Self {
            window: SlidingWindow::new(window_size)?,
            crs: Crs::from_epsg(epsg)?,
            eop_cache: HashMap::new(),
            merged_cloud: PointCloud::default(),
            log: ReferenceLog::create(log_path)?,
            bootstrapped: false,
        })
    }

    /// Reopen a previous run's reference log and seed the pose cache
    /// from its rows, so the estimated-priors mode can continue where
    /// the earlier run stopped.
    pub fn resume(
        window_size: usize,
        epsg: u32,
        log_path: impl AsRef<Path>,
    ) -> Result<Self, GeorefError> {
        let log = ReferenceLog::open(log_path)?;
        let mut eop_cache = HashMap::new();
        for record in log.read_all()? {
            eop_cache.insert(record.name, record.eop);
        }
        Ok(Self {
            window: SlidingWindow::new(window_size)?,
            crs: Crs::from_epsg(epsg)?,
            eop_cache,
            merged_cloud: PointCloud::default(),
            log,
            bootstrapped: false,
        })
    }

    /// The target coordinate reference system of the run.
    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    /// The sliding window of recent captures.
    pub fn window(&self) -> &SlidingWindow {
        &self.window
    }

    /// Whether a bootstrap solve has been accepted yet.
    pub fn bootstrapped(&self) -> bool {
        self.bootstrapped
    }

    /// The reference log of accepted exterior orientations.
    pub fn reference_log(&self) -> &ReferenceLog {
        &self.log
    }

    /// All tie points accumulated over every accepted solve.
    pub fn merged_cloud(&self) -> &PointCloud {
        &self.merged_cloud
    }

    /// Flush the accumulated tie points to a PLY artifact.
    ///
    /// Called at end of run and from the interrupt path, so points
    /// gathered so far survive an aborted flight.
    pub fn flush_points(&self, path: impl AsRef<Path>) -> Result<(), GeorefError> {
        write_ply_binary(path, &self.merged_cloud)?;
        Ok(())
    }
}
