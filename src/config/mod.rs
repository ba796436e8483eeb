//! Unified configuration.
//!
//! The pipeline takes one frozen [`SlamConfig`] at construction. It can be
//! replaced wholesale between frames with
//! [`crate::LidarSlam::set_config`]; nothing mutates it mid-frame.

mod grid;
mod keypoint;
mod matching;

pub use grid::RollingGridConfig;
pub use keypoint::KeypointConfig;
pub use matching::MatcherConfig;

use serde::{Deserialize, Serialize};

/// Top-level configuration for [`crate::LidarSlam`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlamConfig {
    /// Keypoint extraction section.
    #[serde(default)]
    pub keypoints: KeypointConfig,

    /// Frame-to-frame ego-motion matcher section.
    #[serde(default = "MatcherConfig::ego_motion")]
    pub ego_motion: MatcherConfig,

    /// Scan-to-map refinement matcher section.
    #[serde(default = "MatcherConfig::mapping")]
    pub mapping: MatcherConfig,

    /// Rolling keypoint map section.
    #[serde(default)]
    pub grid: RollingGridConfig,

    /// Sanity clamp on the solved frame-to-frame translation (meters). A
    /// larger motion means the correspondences are corrupt; the frame is
    /// rejected and the pose carried by dead reckoning.
    /// Default: 5.0
    pub max_dist_between_frames: f64,

    /// Seed ego-motion with the previous frame's relative motion instead of
    /// the identity.
    /// Default: true
    pub warm_start: bool,

    /// Emit per-point debug arrays (curvature, label, validity) and the
    /// world-frame keypoint cloud with each frame result. Fixed at
    /// construction; the hot path does not branch on it per point.
    /// Default: false
    pub debug_export: bool,
}

impl Default for SlamConfig {
    fn default() -> Self {
        Self {
            keypoints: KeypointConfig::default(),
            ego_motion: MatcherConfig::ego_motion(),
            mapping: MatcherConfig::mapping(),
            grid: RollingGridConfig::default(),
            max_dist_between_frames: 5.0,
            warm_start: true,
            debug_export: false,
        }
    }
}

impl SlamConfig {
    /// Builder-style setter for debug array emission.
    pub fn with_debug_export(mut self, enabled: bool) -> Self {
        self.debug_export = enabled;
        self
    }

    /// Builder-style setter for the frame-to-frame motion clamp.
    pub fn with_max_dist_between_frames(mut self, meters: f64) -> Self {
        self.max_dist_between_frames = meters;
        self
    }

    /// Builder-style setter for warm starting.
    pub fn with_warm_start(mut self, enabled: bool) -> Self {
        self.warm_start = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_coherent() {
        let config = SlamConfig::default();
        assert!(config.keypoints.plane_threshold < config.keypoints.edge_threshold);
        assert!(config.ego_motion.icp_frequency >= 1);
        assert!(config.mapping.max_line_distance <= config.ego_motion.max_line_distance);
        assert!(config.grid.leaf_voxel_size < config.grid.voxel_size);
    }

    #[test]
    fn test_builder_setters() {
        let config = SlamConfig::default()
            .with_debug_export(true)
            .with_max_dist_between_frames(2.0)
            .with_warm_start(false);
        assert!(config.debug_export);
        assert_eq!(config.max_dist_between_frames, 2.0);
        assert!(!config.warm_start);
    }

    #[test]
    fn test_query_radius() {
        let grid = RollingGridConfig::default();
        assert_eq!(grid.query_radius(), 2.5);
    }
}
