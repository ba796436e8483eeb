//! Keypoint extraction configuration.

use serde::{Deserialize, Serialize};

/// Configuration for per-scanline keypoint extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeypointConfig {
    /// Returns closer to the sensor than this are discarded (meters).
    /// Default: 1.5
    pub min_range: f64,

    /// Nominal horizontal angular step of the sensor (radians).
    /// Default: 0.4°
    pub angle_resolution: f64,

    /// Half-window `W` of the symmetric neighborhood used for the discrete
    /// differential descriptors.
    /// Default: 4
    pub neighbor_width: usize,

    /// Upper bound on edge keypoints selected per scanline.
    /// Default: 100
    pub max_edges_per_line: usize,

    /// Upper bound on planar keypoints selected per scanline.
    /// Default: 200
    pub max_planars_per_line: usize,

    /// A point is an edge candidate when its curvature score is at least
    /// this. The score is range-normalized (see the extraction module), so
    /// thresholds are dimensionless and small.
    /// Default: 1e-5
    pub edge_threshold: f64,

    /// A point is a planar candidate when its curvature score is at most
    /// this.
    /// Default: 1e-6
    pub plane_threshold: f64,
}

impl Default for KeypointConfig {
    fn default() -> Self {
        Self {
            min_range: 1.5,
            angle_resolution: 0.4_f64.to_radians(),
            neighbor_width: 4,
            max_edges_per_line: 100,
            max_planars_per_line: 200,
            edge_threshold: 1e-5,
            plane_threshold: 1e-6,
        }
    }
}

impl KeypointConfig {
    /// Builder-style setter for the curvature thresholds.
    pub fn with_thresholds(mut self, edge: f64, plane: f64) -> Self {
        self.edge_threshold = edge;
        self.plane_threshold = plane;
        self
    }

    /// Builder-style setter for the per-scanline quotas.
    pub fn with_quotas(mut self, max_edges: usize, max_planars: usize) -> Self {
        self.max_edges_per_line = max_edges;
        self.max_planars_per_line = max_planars;
        self
    }

    /// Builder-style setter for the half-window width.
    pub fn with_neighbor_width(mut self, width: usize) -> Self {
        self.neighbor_width = width;
        self
    }
}
