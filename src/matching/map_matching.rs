//! Scan-to-map pose refinement.
//!
//! Takes the current sweep's keypoints, already undistorted into the
//! end-of-sweep frame, and refines the world pose against line/plane
//! features fitted from the rolling keypoint map. Candidate neighbors come
//! from bounded box queries on the grids; within each returned bag the k
//! nearest points form the fitting neighborhood.

use log::{debug, warn};
use nalgebra::Vector3;

use crate::config::MatcherConfig;
use crate::core::{LidarPoint, Pose6D};
use crate::extraction::Keypoints;
use crate::grid::RollingGrid;

use super::feature_fit::{self, FeatureFit};
use super::lm::{self, LmState, PointModel, StepOutcome};
use super::residual::{Residual, ResidualBag};
use super::{MatchResult, MatchSummary};

/// Scan-to-map matcher. Owns its residual and query scratch across frames.
#[derive(Debug, Default)]
pub struct MapMatcher {
    config: MatcherConfig,
    bag: ResidualBag,
    candidates: Vec<LidarPoint>,
    ranked: Vec<(f64, usize)>,
    neighbors: Vec<Vector3<f64>>,
}

impl MapMatcher {
    /// Create a matcher with the given configuration.
    pub fn new(config: MatcherConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Replace the configuration (takes effect on the next solve).
    pub fn set_config(&mut self, config: MatcherConfig) {
        self.config = config;
    }

    /// Refine the world pose against the rolling maps.
    ///
    /// `init` is the ego-motion estimate composed with the prior world pose;
    /// `query_radius` bounds the box query around each transformed keypoint.
    /// On a degenerate or numerically failed match the prior pose is carried
    /// unchanged.
    pub fn solve(
        &mut self,
        keypoints: &Keypoints,
        edge_map: &RollingGrid,
        planar_map: &RollingGrid,
        init: Pose6D,
        query_radius: f64,
    ) -> MatchResult {
        let mut pose = init;
        let mut state = LmState::new();
        let mut summary = MatchSummary::default();
        let freq = self.config.icp_frequency.max(1);

        let mut iters_used = 0u32;
        let mut first_segment = true;
        'outer: while iters_used < self.config.max_iterations {
            self.build_residuals(keypoints, edge_map, planar_map, &pose, query_radius);
            summary.edge_residuals = self.bag.edge_count();
            summary.planar_residuals = self.bag.planar_count();

            let sparse = self.bag.edge_count() < self.config.min_edge_residuals
                && self.bag.planar_count() < self.config.min_planar_residuals;
            if sparse {
                if first_segment {
                    warn!(
                        "mapping degenerate: {} edge / {} planar residuals",
                        self.bag.edge_count(),
                        self.bag.planar_count()
                    );
                    summary.degenerate = true;
                    return MatchResult {
                        pose: init,
                        summary,
                    };
                }
                break;
            }
            first_segment = false;

            for inner in 0..freq {
                if iters_used >= self.config.max_iterations {
                    break 'outer;
                }
                iters_used += 1;
                summary.iterations = iters_used;
                match lm::lm_iteration(&self.bag, &mut pose, PointModel::Fixed, &mut state) {
                    StepOutcome::Converged => {
                        if inner == 0 {
                            summary.converged = true;
                            break 'outer;
                        }
                        continue 'outer;
                    }
                    StepOutcome::Accepted | StepOutcome::Rejected => {}
                    StepOutcome::Failed => {
                        warn!("mapping normal equations failed to decompose");
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

        summary.final_cost = lm::cost(&self.bag, &pose, PointModel::Fixed);
        debug!(
            "mapping: {} iters, {} residuals, cost {:.3e}",
            summary.iterations,
            self.bag.len(),
            summary.final_cost
        );
        MatchResult { pose, summary }
    }

    fn build_residuals(
        &mut self,
        keypoints: &Keypoints,
        edge_map: &RollingGrid,
        planar_map: &RollingGrid,
        pose: &Pose6D,
        query_radius: f64,
    ) {
        self.bag.clear();
        let deadband_sq = self.config.min_residual_distance * self.config.min_residual_distance;

        let max_line_sq = self.config.max_line_distance * self.config.max_line_distance;
        for kp in keypoints.edges.iter() {
            let x = kp.position();
            let q = pose.transform_point(&x);
            if let Some(fit) = self.fit_from_map(
                edge_map,
                &q,
                query_radius,
                self.config.line_k,
                max_line_sq,
                FeatureKind::Line,
            ) {
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

        let max_plane_sq = self.config.max_plane_distance * self.config.max_plane_distance;
        for kp in keypoints.planars.iter() {
            let x = kp.position();
            let q = pose.transform_point(&x);
            if let Some(fit) = self.fit_from_map(
                planar_map,
                &q,
                query_radius,
                self.config.plane_k,
                max_plane_sq,
                FeatureKind::Plane,
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

    /// Box-query the map around `q`, keep the k nearest candidates, and fit
    /// the requested feature kind.
    fn fit_from_map(
        &mut self,
        map: &RollingGrid,
        q: &Vector3<f64>,
        query_radius: f64,
        k: usize,
        max_dist_sq: f64,
        kind: FeatureKind,
    ) -> Option<FeatureFit> {
        self.candidates.clear();
        map.query_into(q, query_radius, &mut self.candidates);
        if self.candidates.len() < k {
            return None;
        }

        self.ranked.clear();
        self.ranked.extend(
            self.candidates
                .iter()
                .enumerate()
                .map(|(i, p)| ((p.position() - q).norm_squared(), i)),
        );
        self.ranked
            .sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        self.ranked.truncate(k);

        if self.ranked.last().map_or(true, |&(d, _)| d > max_dist_sq) {
            return None;
        }

        self.neighbors.clear();
        self.neighbors.extend(
            self.ranked
                .iter()
                .map(|&(_, i)| self.candidates[i].position()),
        );

        match kind {
            FeatureKind::Line => feature_fit::fit_line(&self.neighbors, self.config.line_factor),
            FeatureKind::Plane => feature_fit::fit_plane(
                &self.neighbors,
                self.config.plane_factor_1,
                self.config.plane_factor_2,
            ),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum FeatureKind {
    Line,
    Plane,
}
