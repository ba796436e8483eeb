//! Line and plane fitting over k-NN neighborhoods (PCA).
//!
//! Given the neighbors returned by a nearest-neighbor query, the covariance
//! eigendecomposition decides whether the neighborhood is distributed along
//! a line or across a plane, and produces the `(A, P)` parameters of the
//! point-to-feature distance `(R·X + T − P)ᵀ A (R·X + T − P)`.

use nalgebra::{Matrix3, SymmetricEigen, Vector3};

/// Absolute eigenvalue floor below which a spread direction is treated as
/// degenerate (square meters).
const EIGENVALUE_FLOOR: f64 = 1e-9;

/// Parameters of a fitted line or plane feature.
#[derive(Debug, Clone, Copy)]
pub struct FeatureFit {
    /// Distance matrix: `I − n nᵀ` for a line (squared projector onto the
    /// plane orthogonal to the director), `n nᵀ` for a plane.
    pub a: Matrix3<f64>,
    /// Neighborhood centroid.
    pub p: Vector3<f64>,
}

impl FeatureFit {
    /// Squared point-to-feature distance of `x`.
    #[inline]
    pub fn squared_distance(&self, x: &Vector3<f64>) -> f64 {
        let d = x - self.p;
        (d.transpose() * self.a * d)[0]
    }
}

/// Centroid and covariance of a neighborhood.
fn centroid_and_covariance(neighbors: &[Vector3<f64>]) -> (Vector3<f64>, Matrix3<f64>) {
    let n = neighbors.len() as f64;
    let centroid = neighbors.iter().sum::<Vector3<f64>>() / n;
    let mut cov = Matrix3::zeros();
    for p in neighbors {
        let d = p - centroid;
        cov += d * d.transpose();
    }
    (centroid, cov / n)
}

/// Eigenvalues (descending) and matching eigenvectors of a covariance.
fn sorted_eigen(cov: &Matrix3<f64>) -> ([f64; 3], [Vector3<f64>; 3]) {
    let eigen = SymmetricEigen::new(*cov);
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| {
        eigen.eigenvalues[b]
            .partial_cmp(&eigen.eigenvalues[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let values = [
        eigen.eigenvalues[order[0]],
        eigen.eigenvalues[order[1]],
        eigen.eigenvalues[order[2]],
    ];
    let vectors = [
        eigen.eigenvectors.column(order[0]).into_owned(),
        eigen.eigenvectors.column(order[1]).into_owned(),
        eigen.eigenvectors.column(order[2]).into_owned(),
    ];
    (values, vectors)
}

/// Fit a line through the neighborhood.
///
/// Accepted iff the largest eigenvalue dominates the second:
/// `λ1 ≥ line_factor · λ2`. The director is the top eigenvector and `A` the
/// squared projector onto its orthogonal complement, so the induced distance
/// is the squared perpendicular distance to the line.
pub fn fit_line(neighbors: &[Vector3<f64>], line_factor: f64) -> Option<FeatureFit> {
    if neighbors.len() < 2 {
        return None;
    }
    let (centroid, cov) = centroid_and_covariance(neighbors);
    let (values, vectors) = sorted_eigen(&cov);

    if values[0] < EIGENVALUE_FLOOR || values[0] < line_factor * values[1] {
        return None;
    }

    let n = vectors[0];
    let a = Matrix3::identity() - n * n.transpose();
    Some(FeatureFit { a, p: centroid })
}

/// Fit a plane through the neighborhood.
///
/// Accepted iff one direction is flat and the other two comparable:
/// `λ2 ≥ plane_factor_1 · λ3` and `λ1 ≤ plane_factor_2 · λ2`. The normal is
/// the bottom eigenvector and `A = n nᵀ`, so the induced distance is the
/// squared distance to the plane.
pub fn fit_plane(
    neighbors: &[Vector3<f64>],
    plane_factor_1: f64,
    plane_factor_2: f64,
) -> Option<FeatureFit> {
    if neighbors.len() < 3 {
        return None;
    }
    let (centroid, cov) = centroid_and_covariance(neighbors);
    let (values, vectors) = sorted_eigen(&cov);

    if values[1] < EIGENVALUE_FLOOR {
        return None;
    }
    if values[1] < plane_factor_1 * values[2].max(0.0) {
        return None;
    }
    if values[0] > plane_factor_2 * values[1] {
        return None;
    }

    let n = vectors[2];
    let a = n * n.transpose();
    Some(FeatureFit { a, p: centroid })
}
