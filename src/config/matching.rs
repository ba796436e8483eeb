//! Matcher configuration, shared by the ego-motion and mapping stages.

use serde::{Deserialize, Serialize};

/// Configuration for one ICP + Levenberg-Marquardt matching stage.
///
/// Two instances live in [`crate::config::SlamConfig`]: one for frame-to-frame
/// ego-motion, one for scan-to-map refinement. They differ only in their
/// defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Outer iteration budget for the optimizer.
    pub max_iterations: u32,

    /// Re-run the matching step (k-NN query + feature fits + residual
    /// rebuild) every this many outer iterations.
    pub icp_frequency: u32,

    /// Neighbors used for a line fit.
    pub line_k: usize,

    /// Neighbors used for a plane fit.
    pub plane_k: usize,

    /// A line fit is accepted when `λ1 ≥ line_factor · λ2`.
    pub line_factor: f64,

    /// A plane fit requires `λ2 ≥ plane_factor_1 · λ3`.
    pub plane_factor_1: f64,

    /// A plane fit requires `λ1 ≤ plane_factor_2 · λ2`.
    pub plane_factor_2: f64,

    /// A line neighborhood is rejected when its farthest neighbor is more
    /// than this from the query point (meters).
    pub max_line_distance: f64,

    /// A plane neighborhood is rejected when its farthest neighbor is more
    /// than this from the query point (meters).
    pub max_plane_distance: f64,

    /// Noise deadband: accepted matches whose point-to-feature distance is
    /// below this contribute no residual (meters).
    pub min_residual_distance: f64,

    /// The stage is skipped as degenerate unless it produced at least this
    /// many edge residuals...
    pub min_edge_residuals: usize,

    /// ...or at least this many planar residuals.
    pub min_planar_residuals: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self::ego_motion()
    }
}

impl MatcherConfig {
    /// Defaults for the frame-to-frame ego-motion stage.
    pub fn ego_motion() -> Self {
        Self {
            max_iterations: 15,
            icp_frequency: 5,
            line_k: 5,
            plane_k: 5,
            line_factor: 5.0,
            plane_factor_1: 35.0,
            plane_factor_2: 8.0,
            max_line_distance: 1.0,
            max_plane_distance: 1.0,
            min_residual_distance: 1e-3,
            min_edge_residuals: 10,
            min_planar_residuals: 10,
        }
    }

    /// Defaults for the scan-to-map refinement stage. The map is denser and
    /// the initial estimate better, so gates are tighter and the budget
    /// larger.
    pub fn mapping() -> Self {
        Self {
            max_iterations: 20,
            icp_frequency: 5,
            max_line_distance: 0.5,
            max_plane_distance: 0.5,
            ..Self::ego_motion()
        }
    }

    /// Builder-style setter for the iteration budget.
    pub fn with_max_iterations(mut self, iterations: u32) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Builder-style setter for the re-matching cadence.
    pub fn with_icp_frequency(mut self, frequency: u32) -> Self {
        self.icp_frequency = frequency.max(1);
        self
    }

    /// Builder-style setter for the neighbor distance gates.
    pub fn with_max_distances(mut self, line: f64, plane: f64) -> Self {
        self.max_line_distance = line;
        self.max_plane_distance = plane;
        self
    }

    /// Builder-style setter for the eigenvalue ratio tests.
    pub fn with_factors(mut self, line: f64, plane_1: f64, plane_2: f64) -> Self {
        self.line_factor = line;
        self.plane_factor_1 = plane_1;
        self.plane_factor_2 = plane_2;
        self
    }
}
