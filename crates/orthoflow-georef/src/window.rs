use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use orthoflow_io::metadata::{read_capture_metadata, CaptureMetadata};
use orthoflow_io::IoError;

use crate::GeorefError;

/// One geotagged image entering the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    /// File name used as the camera label everywhere downstream.
    pub name: String,
    /// Path to the image file.
    pub path: PathBuf,
    /// Metadata scanned from the image header.
    pub meta: CaptureMetadata,
}

impl Capture {
    /// Read a capture from an image file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref();
        let meta = read_capture_metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            name,
            path: path.to_path_buf(),
            meta,
        })
    }
}

/// Processing phase of an arriving capture, derived from its 0-based
/// arrival index `i` against the window capacity `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// `i < n - 1`: the window is still filling, no solve.
    Warmup,
    /// `i == n - 1`: the window is full for the first time, full solve.
    Bootstrap,
    /// `i > n - 1`: one eviction and one incremental solve per arrival.
    Steady,
}

/// A bounded queue of the most recent captures.
///
/// Pushing into a full window evicts the oldest capture; nothing is ever
/// removed or reordered otherwise, so solve cost stays bounded by the
/// capacity for the whole flight.
#[derive(Debug)]
pub struct SlidingWindow {
    captures: VecDeque<Capture>,
    capacity: usize,
    arrivals: usize,
}

impl SlidingWindow {
    /// Create an empty window with the given capacity (minimum 3).
    pub fn new(capacity: usize) -> Result<Self, GeorefError> {
        if capacity < 3 {
            return Err(GeorefError::WindowTooSmall(capacity));
        }
        Ok(Self {
            captures: VecDeque::with_capacity(capacity),
            capacity,
            arrivals: 0,
        })
    }

    /// Append a capture, evicting the oldest when full.
    ///
    /// Returns the phase of this arrival and the evicted capture, if any.
    pub fn push(&mut self, capture: Capture) -> (Phase, Option<Capture>) {
        let index = self.arrivals;
        self.arrivals += 1;

        let evicted = if self.captures.len() == self.capacity {
            self.captures.pop_front()
        } else {
            None
        };
        self.captures.push_back(capture);

        let phase = if index + 1 < self.capacity {
            Phase::Warmup
        } else if index + 1 == self.capacity {
            Phase::Bootstrap
        } else {
            Phase::Steady
        };
        (phase, evicted)
    }

    /// Number of captures currently held.
    pub fn len(&self) -> usize {
        self.captures.len()
    }

    /// Whether the window holds no captures yet.
    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }

    /// The configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total number of captures pushed so far.
    pub fn arrivals(&self) -> usize {
        self.arrivals
    }

    /// Iterate over the held captures, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Capture> {
        self.captures.iter()
    }

    /// The most recently pushed capture.
    pub fn newest(&self) -> Option<&Capture> {
        self.captures.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(name: &str) -> Capture {
        Capture {
            name: name.to_string(),
            path: PathBuf::from(format!("/data/{name}")),
            meta: CaptureMetadata {
                latitude: 37.0,
                longitude: 127.0,
                relative_altitude: 100.0,
                absolute_altitude: None,
                gimbal_roll: 0.0,
                gimbal_pitch: -90.0,
                gimbal_yaw: 0.0,
            },
        }
    }

    #[test]
    fn phases_follow_arrival_index() -> Result<(), GeorefError> {
        let mut window = SlidingWindow::new(5)?;
        let mut phases = Vec::new();
        for i in 0..7 {
            let (phase, _) = window.push(capture(&format!("{i:03}.jpg")));
            phases.push(phase);
        }
        assert_eq!(
            phases,
            vec![
                Phase::Warmup,
                Phase::Warmup,
                Phase::Warmup,
                Phase::Warmup,
                Phase::Bootstrap,
                Phase::Steady,
                Phase::Steady,
            ]
        );
        Ok(())
    }

    #[test]
    fn full_window_evicts_the_oldest() -> Result<(), GeorefError> {
        let mut window = SlidingWindow::new(3)?;
        for i in 0..3 {
            let (_, evicted) = window.push(capture(&format!("{i}.jpg")));
            assert!(evicted.is_none());
        }
        let (phase, evicted) = window.push(capture("3.jpg"));
        assert_eq!(phase, Phase::Steady);
        assert_eq!(evicted.map(|c| c.name), Some("0.jpg".to_string()));
        assert_eq!(window.len(), 3);
        assert_eq!(window.iter().next().map(|c| c.name.as_str()), Some("1.jpg"));
        assert_eq!(window.newest().map(|c| c.name.as_str()), Some("3.jpg"));
        Ok(())
    }

    #[test]
    fn undersized_capacity_is_rejected() {
        assert!(matches!(
            SlidingWindow::new(2),
            Err(GeorefError::WindowTooSmall(2))
        ));
    }
}
