//! Residual terms for the non-linear least-squares core.

use nalgebra::{Matrix3, Vector3};

/// One matched keypoint's contribution to the objective.
///
/// The squared point-to-feature distance is
/// `(R·X + T − P)ᵀ A (R·X + T − P)`, where `A` is the feature's projector
/// matrix and `P` its anchor (the neighborhood centroid). `A` is an
/// orthogonal projector for both feature kinds, so it doubles as its own
/// square root and the residual 3-vector is simply `A·(R·X + T − P)`.
#[derive(Debug, Clone, Copy)]
pub struct Residual {
    /// Positive semi-definite distance matrix of the matched feature.
    pub a: Matrix3<f64>,
    /// Anchor point of the matched feature.
    pub p: Vector3<f64>,
    /// The keypoint, in its pre-motion frame.
    pub x: Vector3<f64>,
    /// Acquisition fraction of the keypoint within its sweep.
    pub rel_time: f64,
}

/// Reusable bag of residuals for one matching pass.
///
/// Per-frame scratch: cleared and refilled on every re-matching, never
/// outliving the frame.
#[derive(Debug, Default)]
pub struct ResidualBag {
    items: Vec<Residual>,
    edges: usize,
    planars: usize,
}

impl ResidualBag {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all residuals, keeping capacity.
    pub fn clear(&mut self) {
        self.items.clear();
        self.edges = 0;
        self.planars = 0;
    }

    /// Add a residual from an edge (line) match.
    pub fn push_edge(&mut self, residual: Residual) {
        self.items.push(residual);
        self.edges += 1;
    }

    /// Add a residual from a planar (plane) match.
    pub fn push_planar(&mut self, residual: Residual) {
        self.items.push(residual);
        self.planars += 1;
    }

    /// Total number of residuals.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if the bag is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of residuals contributed by edge matches.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges
    }

    /// Number of residuals contributed by planar matches.
    #[inline]
    pub fn planar_count(&self) -> usize {
        self.planars
    }

    /// Iterate over the residuals.
    pub fn iter(&self) -> std::slice::Iter<'_, Residual> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy(kind_edge: bool) -> Residual {
        Residual {
            a: Matrix3::identity(),
            p: Vector3::zeros(),
            x: Vector3::new(1.0, 0.0, 0.0),
            rel_time: if kind_edge { 0.5 } else { 1.0 },
        }
    }

    #[test]
    fn test_counts_and_clear() {
        let mut bag = ResidualBag::new();
        bag.push_edge(dummy(true));
        bag.push_edge(dummy(true));
        bag.push_planar(dummy(false));

        assert_eq!(bag.len(), 3);
        assert_eq!(bag.edge_count(), 2);
        assert_eq!(bag.planar_count(), 1);

        bag.clear();
        assert!(bag.is_empty());
        assert_eq!(bag.edge_count(), 0);
        assert_eq!(bag.planar_count(), 0);
    }
}
