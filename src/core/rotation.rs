//! Axis-angle (exponential-map) rotation helpers.
//!
//! The optimizer parameterizes orientation as a 3-vector `r` whose direction
//! is the rotation axis and whose norm is the angle. Both the rotation matrix
//! and its analytic partial derivatives with respect to the three components
//! are needed when assembling Jacobians.

use nalgebra::{Matrix3, Rotation3, Vector3};

/// Rotation matrix of an axis-angle vector (the SO(3) exponential).
#[inline]
pub fn rotation(r: &Vector3<f64>) -> Matrix3<f64> {
    Rotation3::new(*r).into_inner()
}

/// Axis-angle vector of a rotation matrix (the SO(3) logarithm).
///
/// `m` must be a rotation matrix; products of rotations qualify.
#[inline]
pub fn rotation_log(m: &Matrix3<f64>) -> Vector3<f64> {
    Rotation3::from_matrix_unchecked(*m).scaled_axis()
}

/// Skew-symmetric cross-product matrix: `skew(v) * u == v.cross(&u)`.
#[inline]
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}

/// Below this squared angle the exponential is treated as first-order.
const SMALL_ANGLE_SQ: f64 = 1e-12;

/// Analytic partial derivatives `∂R/∂r_i` of the axis-angle rotation map.
///
/// Closed form from Gallego & Yezzi:
/// `∂R/∂r_i = (r_i [r]× + [r × ((I − R) e_i)]×) R / ‖r‖²`,
/// with the limit `∂R/∂r_i = [e_i]×` at the identity.
pub fn rotation_derivatives(r: &Vector3<f64>) -> [Matrix3<f64>; 3] {
    let theta_sq = r.norm_squared();
    if theta_sq < SMALL_ANGLE_SQ {
        return [
            skew(&Vector3::x()),
            skew(&Vector3::y()),
            skew(&Vector3::z()),
        ];
    }

    let rot = rotation(r);
    let i_minus_r = Matrix3::identity() - rot;
    let mut out = [Matrix3::zeros(); 3];
    for (i, axis) in [Vector3::x(), Vector3::y(), Vector3::z()]
        .iter()
        .enumerate()
    {
        let v = r.cross(&(i_minus_r * axis));
        out[i] = (skew(r) * r[i] + skew(&v)) * rot / theta_sq;
    }
    out
}
