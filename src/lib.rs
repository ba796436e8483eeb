//! # gati-slam
//!
//! Real-time 3D LiDAR odometry and mapping in the LOAM family: per-scanline
//! keypoint extraction, frame-to-frame ego-motion, and refinement against a
//! rolling voxel map of past geometric features.
//!
//! ## Pipeline
//!
//! Each sweep runs through a strictly sequential pipeline:
//!
//! 1. **Intake** - group points by canonical scanline and acquisition order.
//! 2. **Keypoint extraction** - per-scanline curvature descriptors select
//!    bounded quotas of *edge* (high curvature) and *planar* (low curvature)
//!    keypoints.
//! 3. **Ego-motion** - Levenberg-Marquardt over the relative sweep motion,
//!    matching current keypoints to line/plane features fitted from the
//!    previous sweep's keypoints.
//! 4. **Undistortion** - keypoints re-expressed at the sweep-end timestamp
//!    under a constant-velocity motion model.
//! 5. **Mapping** - the same optimizer refines the world pose against
//!    features fitted from the rolling keypoint map.
//! 6. **Map update** - undistorted keypoints are folded into the rolling
//!    voxel grids.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use gati_slam::{LaserCalibration, LidarSlam, SlamConfig};
//!
//! let mut slam = LidarSlam::new(SlamConfig::default());
//! slam.set_calibration(LaserCalibration::identity(16)?);
//!
//! for cloud in sweeps {
//!     let result = slam.add_frame(&cloud)?;
//!     println!("pose: {:?} ({:?})", result.t_world, result.status);
//! }
//! ```
//!
//! ## Coordinate frames
//!
//! The world frame is anchored at the first sweep. `T_world` is the sensor
//! pose at sweep end; the trajectory is the sequence of sweep-end poses. All
//! geometry is in meters.

#![warn(missing_docs)]

// Core types: points, poses, sweep intake, motion model
pub mod core;

// Unified configuration
pub mod config;

// Error types
pub mod error;

// Keypoint extraction
pub mod extraction;

// Feature matching and pose optimization
pub mod matching;

// Rolling voxel grid map
pub mod grid;

// The frame pipeline
mod pipeline;

pub use config::{KeypointConfig, MatcherConfig, RollingGridConfig, SlamConfig};
pub use core::{Label, LaserCalibration, LidarPoint, PointCloud, Pose6D, Sweep};
pub use error::{Result, SlamError};
pub use extraction::{KeypointExtractor, Keypoints};
pub use grid::RollingGrid;
pub use matching::{MatchResult, MatchSummary};
pub use pipeline::{FrameDebug, FrameResult, FrameStatus, LidarSlam};
