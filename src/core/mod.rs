//! Core data types: points, poses, rotations, sweep intake, motion model.

pub mod motion;
pub mod point;
pub mod pose;
pub mod rotation;
pub mod sweep;

pub use point::{Label, LidarPoint, PointCloud};
pub use pose::Pose6D;
pub use sweep::{LaserCalibration, Sweep};
