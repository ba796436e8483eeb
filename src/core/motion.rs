//! Intra-sweep motion model and undistortion operators.
//!
//! Motion within one sweep is modeled as constant linear and angular
//! velocity. Given the sweep motion `T = (r, t)` (start frame to end frame),
//! the pose at fraction `s` of the sweep is the axis-angle scaling
//! `R_s = exp(s·r)`, `t_s = s·t`. Points acquired mid-sweep are re-expressed
//! at the sweep boundaries with these operators, which removes the
//! deformation the sensor's own motion bakes into the raw cloud.

use nalgebra::Vector3;

use super::Pose6D;

/// Map a point acquired at sweep fraction `s` into the start-of-sweep frame.
///
/// `X_0 = R_sᵀ (X − t_s)`
#[inline]
pub fn to_start(x: &Vector3<f64>, s: f64, motion: &Pose6D) -> Vector3<f64> {
    let (r_s, t_s) = motion.interpolated(s);
    r_s.transpose() * (x - t_s)
}

/// Map a point acquired at sweep fraction `s` into the end-of-sweep frame.
///
/// `X_1 = R · R_sᵀ (X − t_s) + t`
#[inline]
pub fn to_end(x: &Vector3<f64>, s: f64, motion: &Pose6D) -> Vector3<f64> {
    motion.rotation() * to_start(x, s, motion) + motion.translation()
}

/// Inverse of [`to_start`]: re-apply the interpolated motion at fraction `s`.
///
/// `X = R_s X_0 + t_s`
#[inline]
pub fn from_start(x0: &Vector3<f64>, s: f64, motion: &Pose6D) -> Vector3<f64> {
    let (r_s, t_s) = motion.interpolated(s);
    r_s * x0 + t_s
}

/// Map an end-of-sweep point into the world frame using the world pose.
#[inline]
pub fn to_world(x_end: &Vector3<f64>, world: &Pose6D) -> Vector3<f64> {
    world.transform_point(x_end)
}
