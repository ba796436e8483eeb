//! Feature matching and pose optimization.
//!
//! Shared by the two matching stages:
//! - [`ego_motion`] aligns the current sweep's keypoints against features
//!   fitted from the previous sweep's keypoints;
//! - [`map_matching`] refines the world pose against features fitted from
//!   the rolling keypoint map.
//!
//! Both assemble [`residual::Residual`] terms from k-NN + PCA feature fits
//! ([`feature_fit`]) and minimize with the Levenberg-Marquardt core
//! ([`lm`]).

pub mod ego_motion;
pub mod feature_fit;
pub mod lm;
pub mod map_matching;
pub mod residual;

pub use ego_motion::EgoMotionSolver;
pub use map_matching::MapMatcher;

use kiddo::float::kdtree::KdTree;

use crate::core::PointCloud;

/// Bucket size large enough to hold point clouds with many points sharing
/// the same coordinate on one axis (e.g. points sampled on an axis-aligned
/// plane), which the default kiddo bucket size (32) cannot split.
pub(crate) const KDTREE_BUCKET_SIZE: usize = 256;

/// Statistics of one matching stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchSummary {
    /// The step norm fell below the convergence threshold.
    pub converged: bool,
    /// Outer iterations spent.
    pub iterations: u32,
    /// Edge residuals in the last residual bag.
    pub edge_residuals: usize,
    /// Planar residuals in the last residual bag.
    pub planar_residuals: usize,
    /// Total squared residual at the final pose.
    pub final_cost: f64,
    /// Too few residuals; the stage carried its prior pose.
    pub degenerate: bool,
    /// The normal equations failed to decompose even at maximum damping;
    /// treated as a degenerate match.
    pub numeric_failure: bool,
}

/// Result of one matching stage.
#[derive(Debug, Clone, Copy)]
pub struct MatchResult {
    /// The optimized pose (or the prior pose when degenerate).
    pub pose: crate::core::Pose6D,
    /// Stage statistics.
    pub summary: MatchSummary,
}

/// Build a 3D k-d tree over a point cloud; items are point indices.
pub(crate) fn build_kdtree(
    cloud: &PointCloud,
) -> KdTree<f64, u64, 3, KDTREE_BUCKET_SIZE, u32> {
    let mut tree: KdTree<f64, u64, 3, KDTREE_BUCKET_SIZE, u32> = KdTree::new();
    for (i, p) in cloud.iter().enumerate() {
        tree.add(&[p.x, p.y, p.z], i as u64);
    }
    tree
}
