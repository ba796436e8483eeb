//! Frame-to-frame ego-motion estimation.
//!
//! Recovers the rigid motion between two consecutive sweeps by matching the
//! current sweep's keypoints against line/plane features fitted from the
//! previous sweep's keypoints. The keypoints enter the residuals through the
//! interpolated inverse motion (`to_start`), so the optimizer simultaneously
//! undistorts and aligns.

use kiddo::float::kdtree::KdTree;
use kiddo::SquaredEuclidean;
use log::{debug, warn};
use nalgebra::Vector3;

use crate::config::MatcherConfig;
use crate::core::motion::to_start;
use crate::core::Pose6D;
use crate::extraction::Keypoints;

use super::feature_fit;
use super::lm::{self, LmState, PointModel, StepOutcome};
use super::residual::{Residual, ResidualBag};
use super::{build_kdtree, MatchResult, MatchSummary};

/// Frame-to-frame matcher. Owns its residual scratch across frames.
#[derive(Debug, Default)]
pub struct EgoMotionSolver {
    config: MatcherConfig,
    bag: ResidualBag,
    neighbors: Vec<Vector3<f64>>,
}

impl EgoMotionSolver {
    /// Create a solver with the given matcher configuration.
    pub fn new(config: MatcherConfig) -> Self {
        Self {
            config,
            bag: ResidualBag::new(),
            neighbors: Vec::new(),
        }
    }

    /// Replace the configuration (takes effect on the next solve).
    pub fn set_config(&mut self, config: MatcherConfig) {
        self.config = config;
    }

    /// Solve for the relative sweep motion.
    ///
    /// `init` seeds the optimizer (identity, or the previous frame's motion
    /// as a warm start). On a degenerate or numerically failed match the
    /// prior pose is carried unchanged.
    pub fn solve(&mut self, current: &Keypoints, previous: &Keypoints, init: Pose6D) -> MatchResult {
        let edge_tree = build_kdtree(&previous.edges);
        let planar_tree = build_kdtree(&previous.planars);

        let mut pose = init;
        let mut state = LmState::new();
        let mut summary = MatchSummary::default();
        let freq = self.config.icp_frequency.max(1);

        let mut iters_used = 0u32;
        let mut first_segment = true;
        'outer: while iters_used < self.config.max_iterations {
            self.build_residuals(current, previous, &edge_tree, &planar_tree, &pose);
            summary.edge_residuals = self.bag.edge_count();
            summary.planar_residuals = self.bag.planar_count();

            let sparse = self.bag.edge_count() < self.config.min_edge_residuals
                && self.bag.planar_count() < self.config.min_planar_residuals;
            if sparse {
                if first_segment {
                    warn!(
                        "ego-motion degenerate: {} edge / {} planar residuals",
                        self.bag.edge_count(),
                        self.bag.planar_count()
                    );
                    summary.degenerate = true;
                    return MatchResult {
                        pose: init,
                        summary,
                    };
                }
                // Residuals exhausted after refinement: nothing left worth
                // optimizing, keep the pose.
                break;
            }
            first_segment = false;

            for inner in 0..freq {
                if iters_used >= self.config.max_iterations {
                    break 'outer;
                }
                iters_used += 1;
                summary.iterations = iters_used;
                match lm::lm_iteration(&self.bag, &mut pose, PointModel::Undistort, &mut state) {
                    StepOutcome::Converged => {
                        if inner == 0 {
                            // A vanishing step on freshly rebuilt matches:
                            // genuinely converged.
                            summary.converged = true;
                            break 'outer;
                        }
                        // Stale matches stopped moving; re-match early.
                        continue 'outer;
                    }
                    StepOutcome::Accepted | StepOutcome::Rejected => {}
                    StepOutcome::Failed => {
                        warn!("ego-motion normal equations failed to decompose");
                        summary.degenerate = true;
                        summary.numeric_failure = true;
                        return MatchResult {
                            pose: init,
                            summary,
                        };
                    }
                }
            }
        }

        summary.final_cost = lm::cost(&self.bag, &pose, PointModel::Undistort);
        debug!(
            "ego-motion: {} iters, {} residuals, cost {:.3e}",
            summary.iterations,
            self.bag.len(),
            summary.final_cost
        );
        MatchResult { pose, summary }
    }

    /// Re-run the matching step: undistort each keypoint with the current
    /// estimate, query the previous sweep's keypoints, fit a feature, and
    /// emit a residual when the fit is accepted.
    fn build_residuals(
        &mut self,
        current: &Keypoints,
        previous: &Keypoints,
        edge_tree: &KdTree<f64, u64, 3, { super::KDTREE_BUCKET_SIZE }, u32>,
        planar_tree: &KdTree<f64, u64, 3, { super::KDTREE_BUCKET_SIZE }, u32>,
        pose: &Pose6D,
    ) {
        self.bag.clear();
        let deadband_sq = self.config.min_residual_distance * self.config.min_residual_distance;

        if previous.edges.len() >= self.config.line_k {
            let max_dist_sq = self.config.max_line_distance * self.config.max_line_distance;
            for kp in current.edges.iter() {
                let x = kp.position();
                let q = to_start(&x, kp.rel_time, pose);
                let found =
                    edge_tree.nearest_n::<SquaredEuclidean>(&[q.x, q.y, q.z], self.config.line_k);
                if found.last().map_or(true, |n| n.distance > max_dist_sq) {
                    continue;
                }
                self.neighbors.clear();
                self.neighbors.extend(
                    found
                        .iter()
                        .map(|n| previous.edges.points[n.item as usize].position()),
                );
                if let Some(fit) = feature_fit::fit_line(&self.neighbors, self.config.line_factor) {
                    if fit.squared_distance(&q) >= deadband_sq {
                        self.bag.push_edge(Residual {
                            a: fit.a,
                            p: fit.p,
                            x,
                            rel_time: kp.rel_time,
                        });
                    }
                }
            }
        }

        if previous.planars.len() >= self.config.plane_k {
            let max_dist_sq = self.config.max_plane_distance * self.config.max_plane_distance;
            for kp in current.planars.iter() {
                let x = kp.position();
                let q = to_start(&x, kp.rel_time, pose);
                let found = planar_tree
                    .nearest_n::<SquaredEuclidean>(&[q.x, q.y, q.z], self.config.plane_k);
                if found.last().map_or(true, |n| n.distance > max_dist_sq) {
                    continue;
                }
                self.neighbors.clear();
                self.neighbors.extend(
                    found
                        .iter()
                        .map(|n| previous.planars.points[n.item as usize].position()),
                );
                if let Some(fit) = feature_fit::fit_plane(
                    &self.neighbors,
                    self.config.plane_factor_1,
                    self.config.plane_factor_2,
                ) {
                    if fit.squared_distance(&q) >= deadband_sq {
                        self.bag.push_planar(Residual {
                            a: fit.a,
                            p: fit.p,
                            x,
                            rel_time: kp.rel_time,
                        });
                    }
                }
            }
        }
    }
}
