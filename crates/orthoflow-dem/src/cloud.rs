use serde::{Deserialize, Serialize};

/// A point cloud with positions in the target CRS and optional colors.
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    points: Vec<[f64; 3]>,
    colors: Option<Vec<[u8; 3]>>,
}

impl PointCloud {
    /// Create a new point cloud from positions and optional colors.
    pub fn new(points: Vec<[f64; 3]>, colors: Option<Vec<[u8; 3]>>) -> Self {
        Self { points, colors }
    }

    /// Get the number of points in the point cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get as reference the positions of the points.
    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    /// Get as reference the colors of the points.
    pub fn colors(&self) -> Option<&[[u8; 3]]> {
        self.colors.as_deref()
    }

    /// Append all points of another cloud to this one.
    ///
    /// Colors are kept only while every merged cloud carries them.
    pub fn extend(&mut self, other: &PointCloud) {
        let was_empty = self.points.is_empty();
        self.points.extend_from_slice(&other.points);
        self.colors = match (self.colors.take(), other.colors()) {
            (Some(mut colors), Some(other_colors)) => {
                colors.extend_from_slice(other_colors);
                Some(colors)
            }
            (None, Some(other_colors)) if was_empty => Some(other_colors.to_vec()),
            _ => None,
        };
    }

    /// Keep only the points at the given indices.
    pub fn select(&self, indices: &[usize]) -> PointCloud {
        let points = indices.iter().map(|&i| self.points[i]).collect();
        let colors = self
            .colors
            .as_ref()
            .map(|c| indices.iter().map(|&i| c[i]).collect());
        PointCloud { points, colors }
    }
}

/// Terrain rigidity classes of the cloth simulation filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerrainRigidity {
    /// Steep slopes, soft cloth.
    Mountainous,
    /// Mixed scenes.
    #[default]
    Relief,
    /// Flat terrain, rigid cloth.
    Flat,
}

/// Parameters of a cloth-simulation ground classifier.
///
/// This is a capability contract for an external classifier: the filter
/// drapes a virtual cloth over the inverted terrain and labels the points
/// the cloth settles on as ground. The pipeline only depends on the
/// [`GroundFilter`] trait; the simulation itself is not reimplemented here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CsfParams {
    /// Cloth rigidity class of the scene.
    pub rigidity: TerrainRigidity,
    /// Cloth grid resolution in meters.
    pub cloth_resolution: f64,
    /// Whether to post-process the cloth for steep slopes.
    pub slope_smoothing: bool,
    /// Upper bound on simulation iterations.
    pub max_iterations: usize,
    /// Distance threshold for the ground/non-ground decision, meters.
    pub classification_threshold: f64,
}

impl Default for CsfParams {
    fn default() -> Self {
        Self {
            rigidity: TerrainRigidity::Relief,
            cloth_resolution: 0.5,
            slope_smoothing: false,
            max_iterations: 500,
            classification_threshold: 0.5,
        }
    }
}

/// Ground/non-ground classification of a point cloud.
pub trait GroundFilter {
    /// Return the indices of the points classified as ground.
    fn classify(&self, points: &[[f64; 3]]) -> Vec<usize>;
}

/// A filter that classifies every point as ground.
///
/// Sparse bundle-adjustment clouds over open terrain are dominated by
/// ground points, so this is the default until a cloth-simulation
/// implementation is plugged in.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughFilter;

impl GroundFilter for PassthroughFilter {
    fn classify(&self, points: &[[f64; 3]]) -> Vec<usize> {
        (0..points.len()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_keeps_matching_colors() {
        let cloud = PointCloud::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]],
            Some(vec![[255, 0, 0], [0, 255, 0], [0, 0, 255]]),
        );
        let picked = cloud.select(&[0, 2]);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked.points()[1], [2.0, 0.0, 0.0]);
        assert_eq!(picked.colors().unwrap()[1], [0, 0, 255]);
    }

    #[test]
    fn extend_merges_points() {
        let mut cloud = PointCloud::new(vec![[0.0; 3]], Some(vec![[1, 2, 3]]));
        cloud.extend(&PointCloud::new(vec![[1.0; 3]], Some(vec![[4, 5, 6]])));
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.colors().unwrap().len(), 2);
    }

    #[test]
    fn passthrough_keeps_everything() {
        let points = vec![[0.0; 3]; 5];
        assert_eq!(PassthroughFilter.classify(&points), vec![0, 1, 2, 3, 4]);
    }
}
