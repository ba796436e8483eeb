//! Six-degree-of-freedom pose as an axis-angle + translation 6-vector.

use nalgebra::{Matrix3, Matrix4, Vector3, Vector6};
use serde::{Deserialize, Serialize};

use super::rotation;

/// A rigid transform parameterized as `(rx, ry, rz, tx, ty, tz)`.
///
/// The rotation block is an axis-angle vector (direction = axis, norm =
/// angle in radians); the translation block is in meters.
///
/// Two poses drive the pipeline:
/// - the relative sweep motion `T_rel`, whose inverse interpolation
///   undistorts points (see [`crate::core::motion`]);
/// - the world pose `T_world`, the sensor pose at sweep end anchored at the
///   first sweep, applied as the forward map `X_w = R X + t`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose6D {
    /// Rotation, x component of the axis-angle vector
    pub rx: f64,
    /// Rotation, y component of the axis-angle vector
    pub ry: f64,
    /// Rotation, z component of the axis-angle vector
    pub rz: f64,
    /// Translation x in meters
    pub tx: f64,
    /// Translation y in meters
    pub ty: f64,
    /// Translation z in meters
    pub tz: f64,
}

impl Pose6D {
    /// Create a pose from its six components.
    #[inline]
    pub fn new(rx: f64, ry: f64, rz: f64, tx: f64, ty: f64, tz: f64) -> Self {
        Self {
            rx,
            ry,
            rz,
            tx,
            ty,
            tz,
        }
    }

    /// The identity transform.
    #[inline]
    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0)
    }

    /// Build from rotation and translation vectors.
    #[inline]
    pub fn from_parts(r: Vector3<f64>, t: Vector3<f64>) -> Self {
        Self::new(r.x, r.y, r.z, t.x, t.y, t.z)
    }

    /// The axis-angle rotation block.
    #[inline]
    pub fn rotation_vector(&self) -> Vector3<f64> {
        Vector3::new(self.rx, self.ry, self.rz)
    }

    /// The translation block.
    #[inline]
    pub fn translation(&self) -> Vector3<f64> {
        Vector3::new(self.tx, self.ty, self.tz)
    }

    /// Rotation matrix of the rotation block.
    #[inline]
    pub fn rotation(&self) -> Matrix3<f64> {
        rotation::rotation(&self.rotation_vector())
    }

    /// Norm of the translation block.
    #[inline]
    pub fn translation_norm(&self) -> f64 {
        self.translation().norm()
    }

    /// Constant-velocity interpolation at fraction `s` of the sweep.
    ///
    /// Returns `(R_s, t_s)` with `R_s = exp(s·r)` and `t_s = s·t`. Within a
    /// single ~100 ms sweep the angle is small, so scaling the axis-angle
    /// vector stands in for proper slerp.
    pub fn interpolated(&self, s: f64) -> (Matrix3<f64>, Vector3<f64>) {
        let r_s = rotation::rotation(&(self.rotation_vector() * s));
        (r_s, self.translation() * s)
    }

    /// Apply the pose as a forward rigid map: `R·p + t`.
    #[inline]
    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.rotation() * p + self.translation()
    }

    /// Fold a solved relative sweep motion into this world pose.
    ///
    /// `rel` is stored so that `Rᵀ(X − t)` maps current sweep-end coordinates
    /// into the previous sweep-end frame. The sensor pose therefore advances
    /// as `R_w ← R_w Rᵀ`, `t_w ← t_w − R_w Rᵀ t`.
    pub fn integrate_relative(&self, rel: &Pose6D) -> Pose6D {
        let r_new = self.rotation() * rel.rotation().transpose();
        let t_new = self.translation() - r_new * rel.translation();
        Pose6D::from_parts(rotation::rotation_log(&r_new), t_new)
    }

    /// The pose as a homogeneous 4×4 transform matrix.
    pub fn to_homogeneous(&self) -> Matrix4<f64> {
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&self.rotation());
        m.fixed_view_mut::<3, 1>(0, 3)
            .copy_from(&self.translation());
        m
    }

    /// View as a nalgebra 6-vector (rotation first, translation second).
    #[inline]
    pub fn as_vector(&self) -> Vector6<f64> {
        Vector6::new(self.rx, self.ry, self.rz, self.tx, self.ty, self.tz)
    }

    /// Build from a nalgebra 6-vector (rotation first, translation second).
    #[inline]
    pub fn from_vector(v: &Vector6<f64>) -> Self {
        Self::new(v[0], v[1], v[2], v[3], v[4], v[5])
    }
}

impl Default for Pose6D {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_identity() {
        let p = Pose6D::identity();
        let x = Vector3::new(1.0, 2.0, 3.0);
        let mapped = p.transform_point(&x);
        assert_relative_eq!((mapped - x).norm(), 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_transform_point_rotation() {
        let p = Pose6D::new(0.0, 0.0, FRAC_PI_2, 1.0, 0.0, 0.0);
        let mapped = p.transform_point(&Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(mapped.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(mapped.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(mapped.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_interpolated_endpoints() {
        let p = Pose6D::new(0.1, -0.2, 0.3, 1.0, 2.0, -0.5);
        let (r0, t0) = p.interpolated(0.0);
        assert_relative_eq!((r0 - Matrix3::identity()).norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(t0.norm(), 0.0, epsilon = 1e-15);

        let (r1, t1) = p.interpolated(1.0);
        assert_relative_eq!((r1 - p.rotation()).norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!((t1 - p.translation()).norm(), 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_integrate_relative_pure_translation() {
        // Scene shifted by +1 m in x between sweeps means the sensor moved
        // -1 m in x.
        let world = Pose6D::identity();
        let rel = Pose6D::new(0.0, 0.0, 0.0, 1.0, 0.0, 0.0);
        let updated = world.integrate_relative(&rel);
        assert_relative_eq!(updated.tx, -1.0, epsilon = 1e-12);
        assert_relative_eq!(updated.ty, 0.0, epsilon = 1e-12);
        assert_relative_eq!(updated.rotation_vector().norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_integrate_relative_consistency() {
        // Mapping a current-frame point through rel then through the old
        // world pose must equal mapping it through the integrated pose.
        let world = Pose6D::new(0.05, -0.1, 0.3, 2.0, -1.0, 0.25);
        let rel = Pose6D::new(0.02, 0.01, -0.04, 0.4, 0.1, -0.05);
        let updated = world.integrate_relative(&rel);

        let x = Vector3::new(3.0, -2.0, 1.5);
        let in_prev = rel.rotation().transpose() * (x - rel.translation());
        let via_two_steps = world.transform_point(&in_prev);
        let via_updated = updated.transform_point(&x);
        assert_relative_eq!((via_two_steps - via_updated).norm(), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_vector_round_trip() {
        let p = Pose6D::new(0.1, 0.2, 0.3, 4.0, 5.0, 6.0);
        let back = Pose6D::from_vector(&p.as_vector());
        assert_eq!(p, back);
    }
}
