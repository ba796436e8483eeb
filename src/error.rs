//! Error types for gati-slam.

use thiserror::Error;

/// Hard errors returned by the SLAM pipeline.
///
/// Everything that can go wrong *during* a frame (empty sweeps, degenerate
/// matches, excessive motion, failed decompositions) is recoverable and is
/// reported through [`crate::FrameStatus`] instead; the pipeline never aborts
/// mid-stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlamError {
    /// A frame was submitted before the sensor calibration was provided.
    #[error("sensor calibration has not been provided")]
    NotCalibrated,

    /// The provided calibration is unusable.
    #[error("calibration error: {0}")]
    Calibration(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SlamError>;
