//! Keypoint extraction: curvature descriptors and quota-bounded selection.

pub mod curvature;

use log::debug;

use crate::config::KeypointConfig;
use crate::core::{Label, LidarPoint, PointCloud, Sweep};

/// Edge and planar keypoints extracted from one sweep.
#[derive(Debug, Clone, Default)]
pub struct Keypoints {
    /// High-curvature keypoints.
    pub edges: PointCloud,
    /// Low-curvature keypoints.
    pub planars: PointCloud,
}

impl Keypoints {
    /// Remove all keypoints, keeping capacity.
    pub fn clear(&mut self) {
        self.edges.clear();
        self.planars.clear();
    }

    /// True if neither class holds a keypoint.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty() && self.planars.is_empty()
    }
}

/// Extracts keypoints scanline by scanline.
///
/// Owns per-frame scratch (curvature, validity, labels per scanline) which is
/// reused across frames; after [`KeypointExtractor::extract`] the scratch
/// describes the most recent sweep and can be read back for debug export.
#[derive(Debug)]
pub struct KeypointExtractor {
    config: KeypointConfig,
    curvature: Vec<Vec<f64>>,
    valid: Vec<Vec<bool>>,
    labels: Vec<Vec<Label>>,
    // selection scratch, reused per scanline
    order: Vec<usize>,
    eligible: Vec<bool>,
}

impl KeypointExtractor {
    /// Create an extractor with the given configuration.
    pub fn new(config: KeypointConfig) -> Self {
        Self {
            config,
            curvature: Vec::new(),
            valid: Vec::new(),
            labels: Vec::new(),
            order: Vec::new(),
            eligible: Vec::new(),
        }
    }

    /// Replace the configuration (takes effect on the next sweep).
    pub fn set_config(&mut self, config: KeypointConfig) {
        self.config = config;
    }

    /// Extract edge and planar keypoints from a sweep.
    pub fn extract(&mut self, sweep: &Sweep) -> Keypoints {
        let n_lines = sweep.num_scanlines();
        self.curvature.resize(n_lines, Vec::new());
        self.valid.resize(n_lines, Vec::new());
        self.labels.resize(n_lines, Vec::new());

        let mut keypoints = Keypoints::default();

        for line in 0..n_lines {
            let points = sweep.scanline(line);
            curvature::compute_curvature(
                points,
                self.config.neighbor_width,
                &mut self.curvature[line],
            );
            curvature::invalidate_points(points, &self.config, &mut self.valid[line]);
            self.select_scanline(line, points, &mut keypoints);
        }

        debug!(
            "extracted {} edges / {} planars from {} scanlines",
            keypoints.edges.len(),
            keypoints.planars.len(),
            n_lines
        );
        keypoints
    }

    /// Number of points that survived invalidation in the last sweep.
    pub fn valid_count(&self) -> usize {
        self.valid
            .iter()
            .map(|line| line.iter().filter(|&&v| v).count())
            .sum()
    }

    /// Curvature scores of the last sweep, per scanline.
    pub fn curvature(&self) -> &[Vec<f64>] {
        &self.curvature
    }

    /// Validity flags of the last sweep, per scanline.
    pub fn valid(&self) -> &[Vec<bool>] {
        &self.valid
    }

    /// Assigned labels of the last sweep, per scanline.
    pub fn labels(&self) -> &[Vec<Label>] {
        &self.labels
    }

    /// Select keypoints on one scanline, honoring quotas, thresholds, and
    /// the `W`-neighbor suppression rule: once a point is chosen, points
    /// within `W` indices are ineligible for either class.
    fn select_scanline(&mut self, line: usize, points: &[LidarPoint], out: &mut Keypoints) {
        let n = points.len();
        let width = self.config.neighbor_width;
        let curvature = &self.curvature[line];
        let valid = &self.valid[line];

        let labels = &mut self.labels[line];
        labels.clear();
        labels.resize(n, Label::Unset);
        for (i, &v) in valid.iter().enumerate() {
            if !v {
                labels[i] = Label::Invalid;
            }
        }

        self.eligible.clear();
        self.eligible.extend_from_slice(valid);

        self.order.clear();
        self.order.extend(0..n);
        self.order.sort_by(|&a, &b| {
            curvature[b]
                .partial_cmp(&curvature[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        // Edges: descending curvature.
        let mut edges_taken = 0usize;
        for idx in 0..n {
            if edges_taken >= self.config.max_edges_per_line {
                break;
            }
            let i = self.order[idx];
            if curvature[i] < self.config.edge_threshold {
                break;
            }
            if !self.eligible[i] {
                continue;
            }
            labels[i] = Label::Edge;
            out.edges.push(points[i]);
            edges_taken += 1;
            suppress_neighbors(&mut self.eligible, i, width);
        }

        // Planars: ascending curvature.
        let mut planars_taken = 0usize;
        for idx in (0..n).rev() {
            if planars_taken >= self.config.max_planars_per_line {
                break;
            }
            let i = self.order[idx];
            if curvature[i] > self.config.plane_threshold {
                break;
            }
            if !self.eligible[i] {
                continue;
            }
            labels[i] = Label::Planar;
            out.planars.push(points[i]);
            planars_taken += 1;
            suppress_neighbors(&mut self.eligible, i, width);
        }
    }
}

#[inline]
fn suppress_neighbors(eligible: &mut [bool], center: usize, width: usize) {
    let from = center.saturating_sub(width);
    let to = (center + width).min(eligible.len() - 1);
    for flag in &mut eligible[from..=to] {
        *flag = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LaserCalibration;

    fn sweep_from_scanline(points: Vec<LidarPoint>) -> Sweep {
        let calib = LaserCalibration::identity(1).unwrap();
        Sweep::from_cloud(&points, &calib)
    }

    fn test_config() -> KeypointConfig {
        KeypointConfig {
            min_range: 1.0,
            neighbor_width: 2,
            angle_resolution: 0.5,
            max_edges_per_line: 10,
            max_planars_per_line: 50,
            edge_threshold: 1e-6,
            plane_threshold: 1e-8,
        }
    }

    /// Sawtooth scanline: every interior point has the same high curvature.
    fn sawtooth_scanline(n: usize) -> Vec<LidarPoint> {
        (0..n)
            .map(|i| {
                let x = -5.0 + 0.05 * i as f64;
                let y = 10.0 + if i % 2 == 0 { 0.05 } else { -0.05 };
                LidarPoint::new(x, y, 0.0, 0.0, 0, i as f64 / n as f64)
            })
            .collect()
    }

    /// Straight scanline: near-zero curvature everywhere.
    fn flat_scanline(n: usize) -> Vec<LidarPoint> {
        (0..n)
            .map(|i| {
                let x = -5.0 + 0.05 * i as f64;
                LidarPoint::new(x, 10.0, 0.0, 0.0, 0, i as f64 / n as f64)
            })
            .collect()
    }

    #[test]
    fn test_edge_quota_and_spacing() {
        let sweep = sweep_from_scanline(sawtooth_scanline(400));
        let mut extractor = KeypointExtractor::new(test_config());
        let keypoints = extractor.extract(&sweep);

        assert_eq!(keypoints.edges.len(), 10, "quota must be exact");

        // No two selected keypoints within W indices on the scanline.
        let mut indices: Vec<usize> = extractor.labels()[0]
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == Label::Edge || l == Label::Planar)
            .map(|(i, _)| i)
            .collect();
        indices.sort_unstable();
        for pair in indices.windows(2) {
            assert!(pair[1] - pair[0] > 2, "selections too close: {pair:?}");
        }
    }

    #[test]
    fn test_flat_line_yields_planars_only() {
        let sweep = sweep_from_scanline(flat_scanline(400));
        let mut extractor = KeypointExtractor::new(test_config());
        let keypoints = extractor.extract(&sweep);

        assert!(keypoints.edges.is_empty());
        assert!(keypoints.planars.len() > 20);
    }

    #[test]
    fn test_invalid_points_are_never_selected() {
        let mut points = sawtooth_scanline(100);
        // Pull a stretch of points inside min_range.
        for p in points.iter_mut().skip(40).take(10) {
            p.x *= 0.05;
            p.y *= 0.05;
        }
        let sweep = sweep_from_scanline(points);
        let mut extractor = KeypointExtractor::new(test_config());
        let _ = extractor.extract(&sweep);

        for i in 40..50 {
            assert_eq!(extractor.labels()[0][i], Label::Invalid);
        }
    }

    #[test]
    fn test_scratch_reused_across_sweeps() {
        let mut extractor = KeypointExtractor::new(test_config());

        let first = extractor.extract(&sweep_from_scanline(sawtooth_scanline(400)));
        assert_eq!(first.edges.len(), 10);

        let second = extractor.extract(&sweep_from_scanline(flat_scanline(200)));
        assert!(second.edges.is_empty());
        assert_eq!(extractor.labels()[0].len(), 200);
        assert_eq!(extractor.curvature()[0].len(), 200);
    }

    #[test]
    fn test_valid_count() {
        let sweep = sweep_from_scanline(flat_scanline(100));
        let mut extractor = KeypointExtractor::new(test_config());
        let _ = extractor.extract(&sweep);
        // All interior points of a flat high-incidence scanline are valid.
        assert_eq!(extractor.valid_count(), 100 - 2 * 2);
    }
}
