//! The frame-by-frame SLAM pipeline.

use log::{debug, info, warn};

use crate::config::SlamConfig;
use crate::core::motion;
use crate::core::{Label, LaserCalibration, LidarPoint, PointCloud, Pose6D, Sweep};
use crate::error::{Result, SlamError};
use crate::extraction::{KeypointExtractor, Keypoints};
use crate::grid::RollingGrid;
use crate::matching::{EgoMotionSolver, MapMatcher, MatchSummary};

/// Outcome class of one processed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// The frame was aligned and integrated into the map.
    Integrated,
    /// The first frame: initializes the map, no motion to estimate.
    FirstFrame,
    /// No valid points survived invalidation; poses carried unchanged.
    EmptyFrame,
    /// The solved frame-to-frame translation exceeded the sanity clamp; the
    /// estimate was discarded and the frame contributed nothing to the map.
    ExcessiveMotion,
}

/// Per-point debug arrays and the processed keypoint cloud, in input order.
#[derive(Debug, Clone, Default)]
pub struct FrameDebug {
    /// Curvature score per input point (NaN where the point was dropped).
    pub curvature: Vec<f64>,
    /// Assigned label per input point.
    pub labels: Vec<Label>,
    /// Validity per input point.
    pub valid: Vec<bool>,
    /// Undistorted keypoints of this frame, in the world frame.
    pub keypoints_world: PointCloud,
}

/// Result of [`LidarSlam::add_frame`].
#[derive(Debug, Clone)]
pub struct FrameResult {
    /// Outcome class of the frame.
    pub status: FrameStatus,
    /// Index of this frame (0 for the first).
    pub frame_index: u64,
    /// Relative sweep motion after this frame.
    pub t_rel: Pose6D,
    /// World pose (sweep-end, anchored at the first sweep) after this frame.
    pub t_world: Pose6D,
    /// Edge keypoints extracted.
    pub edge_keypoints: usize,
    /// Planar keypoints extracted.
    pub planar_keypoints: usize,
    /// Ego-motion stage statistics, when the stage ran.
    pub ego_motion: Option<MatchSummary>,
    /// Mapping stage statistics, when the stage ran.
    pub mapping: Option<MatchSummary>,
    /// Debug arrays, when `debug_export` is enabled.
    pub debug: Option<FrameDebug>,
}

/// LOAM-style LiDAR odometry and mapping.
///
/// Per frame the pipeline is strictly sequential: intake, keypoint
/// extraction, frame-to-frame ego-motion, undistortion to the sweep-end
/// frame, scan-to-map refinement, map update. All state is in memory;
/// [`LidarSlam::reset`] returns the pipeline to its initial state.
///
/// Calibration must be provided once before the first frame, otherwise
/// [`LidarSlam::add_frame`] fails with [`SlamError::NotCalibrated`].
pub struct LidarSlam {
    config: SlamConfig,
    calibration: Option<LaserCalibration>,
    extractor: KeypointExtractor,
    ego_solver: EgoMotionSolver,
    map_matcher: MapMatcher,
    edge_map: RollingGrid,
    planar_map: RollingGrid,
    t_rel: Pose6D,
    t_world: Pose6D,
    previous: Keypoints,
    trajectory: Vec<Pose6D>,
    frames_processed: u64,
}

impl LidarSlam {
    /// Create a pipeline with the given configuration.
    pub fn new(config: SlamConfig) -> Self {
        Self {
            extractor: KeypointExtractor::new(config.keypoints.clone()),
            ego_solver: EgoMotionSolver::new(config.ego_motion.clone()),
            map_matcher: MapMatcher::new(config.mapping.clone()),
            edge_map: RollingGrid::new(&config.grid),
            planar_map: RollingGrid::new(&config.grid),
            calibration: None,
            t_rel: Pose6D::identity(),
            t_world: Pose6D::identity(),
            previous: Keypoints::default(),
            trajectory: Vec::new(),
            frames_processed: 0,
            config,
        }
    }

    /// Create a pipeline with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(SlamConfig::default())
    }

    /// Provide the sensor's beam calibration. Must be called before the
    /// first frame.
    pub fn set_calibration(&mut self, calibration: LaserCalibration) {
        info!("calibration set: {} beams", calibration.laser_count());
        self.calibration = Some(calibration);
    }

    /// True once calibration has been provided.
    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_some()
    }

    /// Current configuration.
    pub fn config(&self) -> &SlamConfig {
        &self.config
    }

    /// Replace the configuration between frames.
    ///
    /// Extraction and matching sections take effect on the next frame. The
    /// rolling-grid geometry takes effect on the next [`LidarSlam::reset`],
    /// since resizing would discard the map.
    pub fn set_config(&mut self, config: SlamConfig) {
        self.extractor.set_config(config.keypoints.clone());
        self.ego_solver.set_config(config.ego_motion.clone());
        self.map_matcher.set_config(config.mapping.clone());
        self.config = config;
    }

    /// Erase the map, trajectory, and poses; calibration is kept.
    pub fn reset(&mut self) {
        info!("resetting SLAM state after {} frames", self.frames_processed);
        self.edge_map = RollingGrid::new(&self.config.grid);
        self.planar_map = RollingGrid::new(&self.config.grid);
        self.t_rel = Pose6D::identity();
        self.t_world = Pose6D::identity();
        self.previous.clear();
        self.trajectory.clear();
        self.frames_processed = 0;
    }

    /// World pose of the sensor at the end of the last sweep.
    pub fn world_transform(&self) -> Pose6D {
        self.t_world
    }

    /// Relative motion solved for the last sweep.
    pub fn relative_transform(&self) -> Pose6D {
        self.t_rel
    }

    /// One sweep-end pose per processed frame.
    pub fn trajectory(&self) -> &[Pose6D] {
        &self.trajectory
    }

    /// Number of frames processed since construction or the last reset.
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// The rolling map of edge keypoints.
    pub fn edge_map(&self) -> &RollingGrid {
        &self.edge_map
    }

    /// The rolling map of planar keypoints.
    pub fn planar_map(&self) -> &RollingGrid {
        &self.planar_map
    }

    /// Run intake and keypoint extraction only, without touching pose or map
    /// state. Debug arrays are always produced.
    pub fn extract_keypoints_only(
        &mut self,
        cloud: &[LidarPoint],
    ) -> Result<(Keypoints, FrameDebug)> {
        let calibration = self.calibration.as_ref().ok_or(SlamError::NotCalibrated)?;
        let sweep = Sweep::from_cloud(cloud, calibration);
        let keypoints = self.extractor.extract(&sweep);
        let debug = self.build_debug(&sweep, &keypoints, &Pose6D::identity(), &Pose6D::identity());
        Ok((keypoints, debug))
    }

    /// Process one sweep.
    ///
    /// Fails only with [`SlamError::NotCalibrated`]; every in-frame failure
    /// is recoverable and reported through [`FrameResult::status`] and the
    /// per-stage summaries.
    pub fn add_frame(&mut self, cloud: &[LidarPoint]) -> Result<FrameResult> {
        let calibration = self.calibration.as_ref().ok_or(SlamError::NotCalibrated)?;
        let sweep = Sweep::from_cloud(cloud, calibration);
        let keypoints = self.extractor.extract(&sweep);
        let frame_index = self.frames_processed;
        self.frames_processed += 1;

        if self.extractor.valid_count() == 0 || keypoints.is_empty() {
            warn!("frame {frame_index}: no usable points, carrying poses unchanged");
            self.trajectory.push(self.t_world);
            let debug = self
                .config
                .debug_export
                .then(|| self.build_debug(&sweep, &keypoints, &self.t_rel, &self.t_world));
            return Ok(self.frame_result(
                FrameStatus::EmptyFrame,
                frame_index,
                &keypoints,
                None,
                None,
                debug,
            ));
        }

        if frame_index == 0 {
            // First sweep: anchor the world frame and seed the map.
            let undistorted = undistort_to_end(&keypoints, &Pose6D::identity());
            self.integrate_into_maps(&undistorted);
            self.previous = undistorted;
            self.trajectory.push(self.t_world);
            debug!(
                "frame 0: map seeded with {} edges / {} planars",
                keypoints.edges.len(),
                keypoints.planars.len()
            );
            let debug = self
                .config
                .debug_export
                .then(|| self.build_debug(&sweep, &keypoints, &self.t_rel, &self.t_world));
            return Ok(self.frame_result(
                FrameStatus::FirstFrame,
                frame_index,
                &keypoints,
                None,
                None,
                debug,
            ));
        }

        // Ego-motion against the previous sweep's keypoints.
        let init = if self.config.warm_start {
            self.t_rel
        } else {
            Pose6D::identity()
        };
        let ego = self.ego_solver.solve(&keypoints, &self.previous, init);

        if ego.pose.translation_norm() > self.config.max_dist_between_frames {
            warn!(
                "frame {frame_index}: solved motion {:.2} m exceeds clamp {:.2} m, discarding",
                ego.pose.translation_norm(),
                self.config.max_dist_between_frames
            );
            // Keep the previous relative motion for dead reckoning; the map
            // and world pose are untouched by this frame.
            let undistorted = undistort_to_end(&keypoints, &self.t_rel);
            self.previous = undistorted;
            self.trajectory.push(self.t_world);
            let debug = self
                .config
                .debug_export
                .then(|| self.build_debug(&sweep, &keypoints, &self.t_rel, &self.t_world));
            return Ok(self.frame_result(
                FrameStatus::ExcessiveMotion,
                frame_index,
                &keypoints,
                Some(ego.summary),
                None,
                debug,
            ));
        }

        self.t_rel = ego.pose;

        // Undistort to the sweep-end frame and refine against the map.
        let undistorted = undistort_to_end(&keypoints, &self.t_rel);
        let predicted = self.t_world.integrate_relative(&self.t_rel);
        self.edge_map.roll_to(&predicted.translation());
        self.planar_map.roll_to(&predicted.translation());

        let mapping = self.map_matcher.solve(
            &undistorted,
            &self.edge_map,
            &self.planar_map,
            predicted,
            self.config.grid.query_radius(),
        );
        self.t_world = mapping.pose;

        self.integrate_into_maps(&undistorted);
        self.previous = undistorted;
        self.trajectory.push(self.t_world);

        debug!(
            "frame {frame_index}: t_rel [{:.3} {:.3} {:.3}] t_world [{:.3} {:.3} {:.3}]",
            self.t_rel.tx, self.t_rel.ty, self.t_rel.tz, self.t_world.tx, self.t_world.ty,
            self.t_world.tz
        );

        let debug = self
            .config
            .debug_export
            .then(|| self.build_debug(&sweep, &keypoints, &self.t_rel, &self.t_world));
        Ok(self.frame_result(
            FrameStatus::Integrated,
            frame_index,
            &keypoints,
            Some(ego.summary),
            Some(mapping.summary),
            debug,
        ))
    }

    /// Insert end-of-sweep keypoints into the rolling maps, world-transformed.
    fn integrate_into_maps(&mut self, undistorted: &Keypoints) {
        let world = &self.t_world;
        let edges: Vec<LidarPoint> = undistorted
            .edges
            .iter()
            .map(|p| p.with_position(motion::to_world(&p.position(), world)))
            .collect();
        let planars: Vec<LidarPoint> = undistorted
            .planars
            .iter()
            .map(|p| p.with_position(motion::to_world(&p.position(), world)))
            .collect();
        self.edge_map.insert(&edges);
        self.planar_map.insert(&planars);
    }

    fn frame_result(
        &self,
        status: FrameStatus,
        frame_index: u64,
        keypoints: &Keypoints,
        ego_motion: Option<MatchSummary>,
        mapping: Option<MatchSummary>,
        debug: Option<FrameDebug>,
    ) -> FrameResult {
        FrameResult {
            status,
            frame_index,
            t_rel: self.t_rel,
            t_world: self.t_world,
            edge_keypoints: keypoints.edges.len(),
            planar_keypoints: keypoints.planars.len(),
            ego_motion,
            mapping,
            debug,
        }
    }

    /// Scatter the extractor's per-scanline arrays back into input order and
    /// world-transform the keypoints for display.
    fn build_debug(
        &self,
        sweep: &Sweep,
        keypoints: &Keypoints,
        t_rel: &Pose6D,
        t_world: &Pose6D,
    ) -> FrameDebug {
        let n = sweep.input_len();
        let mut debug = FrameDebug {
            curvature: vec![f64::NAN; n],
            labels: vec![Label::Invalid; n],
            valid: vec![false; n],
            keypoints_world: PointCloud::new(),
        };

        for input_idx in 0..n {
            if let Some((line, pos)) = sweep.locate(input_idx) {
                debug.curvature[input_idx] = self.extractor.curvature()[line][pos];
                debug.labels[input_idx] = self.extractor.labels()[line][pos];
                debug.valid[input_idx] = self.extractor.valid()[line][pos];
            }
        }

        for cloud in [&keypoints.edges, &keypoints.planars] {
            for p in cloud.iter() {
                let end = motion::to_end(&p.position(), p.rel_time, t_rel);
                debug
                    .keypoints_world
                    .push(p.with_position(motion::to_world(&end, t_world)));
            }
        }
        debug
    }
}

/// Re-express keypoints at the sweep-end timestamp using the solved motion.
fn undistort_to_end(keypoints: &Keypoints, motion_pose: &Pose6D) -> Keypoints {
    let map_cloud = |cloud: &PointCloud| {
        cloud
            .iter()
            .map(|p| p.with_position(motion::to_end(&p.position(), p.rel_time, motion_pose)))
            .collect::<PointCloud>()
    };
    Keypoints {
        edges: map_cloud(&keypoints.edges),
        planars: map_cloud(&keypoints.planars),
    }
}
