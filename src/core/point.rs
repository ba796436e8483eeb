//! Point and point-cloud types for 3D LiDAR sweeps.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// A single LiDAR return.
///
/// Coordinates are in meters, in the sensor frame at acquisition time.
/// `rel_time` is the position of the return within its sweep: 0.0 at sweep
/// start, 1.0 at sweep end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LidarPoint {
    /// X coordinate in meters
    pub x: f64,
    /// Y coordinate in meters
    pub y: f64,
    /// Z coordinate in meters
    pub z: f64,
    /// Return intensity (sensor units, carried through unchanged)
    pub intensity: f64,
    /// Raw laser (beam) id as reported by the sensor
    pub laser_id: u16,
    /// Acquisition time as a fraction of the sweep, in [0, 1]
    pub rel_time: f64,
}

impl LidarPoint {
    /// Create a new point.
    #[inline]
    pub fn new(x: f64, y: f64, z: f64, intensity: f64, laser_id: u16, rel_time: f64) -> Self {
        Self {
            x,
            y,
            z,
            intensity,
            laser_id,
            rel_time,
        }
    }

    /// Position as a nalgebra vector.
    #[inline]
    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Distance from the sensor origin.
    #[inline]
    pub fn range(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Horizontal angle of the return, in radians.
    #[inline]
    pub fn azimuth(&self) -> f64 {
        self.y.atan2(self.x)
    }

    /// Copy of this point with its position replaced (attributes kept).
    #[inline]
    pub fn with_position(&self, p: Vector3<f64>) -> Self {
        Self {
            x: p.x,
            y: p.y,
            z: p.z,
            ..*self
        }
    }
}

/// Keypoint classification assigned during extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Label {
    /// Not (yet) classified
    #[default]
    Unset,
    /// High-curvature keypoint
    Edge,
    /// Low-curvature keypoint
    Planar,
    /// Rejected by an invalidation rule
    Invalid,
}

/// An owned set of LiDAR points.
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    /// The points, in whatever order the producer emitted them.
    pub points: Vec<LidarPoint>,
}

impl PointCloud {
    /// Create an empty cloud.
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Create an empty cloud with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the cloud holds no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Append a point.
    #[inline]
    pub fn push(&mut self, point: LidarPoint) {
        self.points.push(point);
    }

    /// Remove all points, keeping capacity.
    #[inline]
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Iterate over the points.
    pub fn iter(&self) -> std::slice::Iter<'_, LidarPoint> {
        self.points.iter()
    }
}

impl FromIterator<LidarPoint> for PointCloud {
    fn from_iter<I: IntoIterator<Item = LidarPoint>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_point_range() {
        let p = LidarPoint::new(3.0, 4.0, 0.0, 1.0, 0, 0.5);
        assert_relative_eq!(p.range(), 5.0);
    }

    #[test]
    fn test_point_azimuth() {
        let p = LidarPoint::new(0.0, 2.0, 0.0, 1.0, 0, 0.0);
        assert_relative_eq!(p.azimuth(), std::f64::consts::FRAC_PI_2);
    }

    #[test]
    fn test_with_position_keeps_attributes() {
        let p = LidarPoint::new(1.0, 2.0, 3.0, 7.0, 11, 0.25);
        let q = p.with_position(Vector3::new(-1.0, 0.0, 4.0));
        assert_eq!(q.laser_id, 11);
        assert_relative_eq!(q.rel_time, 0.25);
        assert_relative_eq!(q.intensity, 7.0);
        assert_relative_eq!(q.z, 4.0);
    }

    #[test]
    fn test_cloud_push_and_clear() {
        let mut cloud = PointCloud::with_capacity(4);
        cloud.push(LidarPoint::new(1.0, 0.0, 0.0, 0.0, 0, 0.0));
        cloud.push(LidarPoint::new(0.0, 1.0, 0.0, 0.0, 1, 0.5));
        assert_eq!(cloud.len(), 2);
        cloud.clear();
        assert!(cloud.is_empty());
    }
}
