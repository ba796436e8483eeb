//! Per-scanline differential descriptors and point invalidation.
//!
//! Each scanline is treated independently. Over a symmetric half-window `W`
//! three quantities are derived per point: a range-normalized curvature
//! score, the depth gap to the immediate neighbors, and an incidence-angle
//! proxy. Points that fail the validity rules never become keypoints, and
//! occlusion gaps poison their neighborhood on the closer side.

use nalgebra::Vector3;

use crate::config::KeypointConfig;
use crate::core::LidarPoint;

/// Range jump treated as an occlusion boundary (meters).
const DEPTH_GAP_THRESHOLD: f64 = 0.3;

/// Minimum sine of the chord/ray angle; below this the surface is considered
/// grazing and the point unreliable. sin(10°).
const MIN_INCIDENCE_SIN: f64 = 0.17364817766693033;

/// Compute the curvature scores for one scanline.
///
/// `c[i] = ‖Σ_{j∈N(i), j≠i} (X_j − X_i)‖² / (|N(i)| · ‖X_i‖)²`
///
/// The denominator normalizes by range so far and near returns are
/// comparable. Boundary points without a full window keep a score of zero
/// and are invalidated separately.
pub fn compute_curvature(points: &[LidarPoint], width: usize, out: &mut Vec<f64>) {
    out.clear();
    out.resize(points.len(), 0.0);
    if points.len() < 2 * width + 1 {
        return;
    }

    for i in width..points.len() - width {
        let center = points[i].position();
        let mut sum = Vector3::zeros();
        for j in (i - width)..=(i + width) {
            if j != i {
                sum += points[j].position() - center;
            }
        }
        let denom = (2 * width) as f64 * points[i].range();
        if denom > f64::EPSILON {
            out[i] = sum.norm_squared() / (denom * denom);
        }
    }
}

/// Apply the invalidation rules for one scanline, writing into `valid`.
///
/// Rules, in order:
/// 1. returns closer than `min_range`;
/// 2. boundary points without a full descriptor window;
/// 3. grazing incidence (the chord through the neighbors nearly aligns with
///    the viewing ray);
/// 4. occlusion gaps poison the closer point and its `W` neighbors on the
///    gap side, where curvature is artifactually high.
pub fn invalidate_points(points: &[LidarPoint], config: &KeypointConfig, valid: &mut Vec<bool>) {
    let n = points.len();
    let width = config.neighbor_width;
    valid.clear();
    valid.resize(n, true);

    if n < 2 * width + 1 {
        valid.iter_mut().for_each(|v| *v = false);
        return;
    }

    for v in valid.iter_mut().take(width) {
        *v = false;
    }
    for v in valid.iter_mut().skip(n - width) {
        *v = false;
    }

    for (i, point) in points.iter().enumerate() {
        if point.range() < config.min_range {
            valid[i] = false;
        }
    }

    for i in 1..n - 1 {
        let chord = points[i + 1].position() - points[i - 1].position();
        let chord_norm = chord.norm();
        let range = points[i].range();
        if chord_norm < f64::EPSILON || range < f64::EPSILON {
            valid[i] = false;
            continue;
        }
        let ray = points[i].position() / range;
        let sin_angle = chord.cross(&ray).norm() / chord_norm;
        if sin_angle < MIN_INCIDENCE_SIN {
            valid[i] = false;
        }
    }

    for i in 0..n - 1 {
        let gap = points[i + 1].range() - points[i].range();
        if gap.abs() > DEPTH_GAP_THRESHOLD {
            if gap > 0.0 {
                // i is the closer point, sitting in front of the jump.
                invalidate_span(valid, i.saturating_sub(width), i);
            } else {
                invalidate_span(valid, i + 1, (i + 1 + width).min(n - 1));
            }
        }
    }
}

#[inline]
fn invalidate_span(valid: &mut [bool], from: usize, to: usize) {
    for v in &mut valid[from..=to] {
        *v = false;
    }
}
