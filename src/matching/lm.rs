//! Damped non-linear least squares over a 6-vector pose.
//!
//! Both the ego-motion and mapping stages minimize
//! `Σ_i (R·X_i + t − P_i)ᵀ A_i (R·X_i + t − P_i)` with Levenberg-Marquardt:
//! analytic Jacobians of the axis-angle rotation map, normal equations
//! damped by an adaptive lambda, Cholesky solves, and accept/reject steps.
//! The two stages differ in how the keypoint enters the residual, captured
//! by [`PointModel`].

use nalgebra::{Matrix3, Matrix6, Vector3, Vector6};

use crate::core::rotation;
use crate::core::Pose6D;

use super::residual::ResidualBag;

/// Step-norm threshold below which the optimizer is converged.
pub(crate) const STEP_EPSILON: f64 = 1e-10;

/// Damping retries within one iteration before giving up on the system.
const MAX_DAMPING_ATTEMPTS: u32 = 8;

/// How a residual's keypoint depends on the pose being optimized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointModel {
    /// Ego-motion: the keypoint is mapped into the start-of-sweep frame by
    /// the interpolated inverse motion, `e = R_sᵀ(X − s·t) − P`; the point
    /// itself depends on the pose and the Jacobian includes it.
    Undistort,
    /// Mapping: the keypoint is pre-undistorted and fixed,
    /// `e = R·X + t − P`.
    Fixed,
}

/// Outcome of one LM iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// A step was accepted and its norm fell below [`STEP_EPSILON`].
    Converged,
    /// A step was accepted.
    Accepted,
    /// No acceptable step was found at any tried damping; pose unchanged.
    Rejected,
    /// The damped normal equations would not decompose even at maximum
    /// damping.
    Failed,
}

/// Adaptive damping state.
///
/// Shrinks lambda on accepted steps and grows it on rejections, keeping the
/// solver between Gauss-Newton (small lambda) and gradient descent (large
/// lambda).
#[derive(Debug, Clone)]
pub struct LmState {
    lambda: f64,
    lambda_factor: f64,
    min_lambda: f64,
    max_lambda: f64,
}

impl LmState {
    /// Create the default damping schedule.
    pub fn new() -> Self {
        Self {
            lambda: 1e-3,
            lambda_factor: 10.0,
            min_lambda: 1e-9,
            max_lambda: 1e7,
        }
    }

    /// Current damping value.
    #[inline]
    pub fn damping(&self) -> f64 {
        self.lambda
    }

    fn accept(&mut self) {
        self.lambda = (self.lambda / self.lambda_factor).max(self.min_lambda);
    }

    fn reject(&mut self) {
        self.lambda = (self.lambda * self.lambda_factor).min(self.max_lambda);
    }

    fn is_saturated(&self) -> bool {
        self.lambda >= self.max_lambda * 0.99
    }
}

impl Default for LmState {
    fn default() -> Self {
        Self::new()
    }
}

/// Residual 3-vector and 3×6 Jacobian blocks of one term at `pose`.
///
/// Returns `(residual, d/dr columns, d/dt matrix)`.
fn residual_and_jacobian(
    term: &super::residual::Residual,
    pose: &Pose6D,
    model: PointModel,
) -> (Vector3<f64>, [Vector3<f64>; 3], Matrix3<f64>) {
    match model {
        PointModel::Fixed => {
            let r = pose.rotation();
            let derivs = rotation::rotation_derivatives(&pose.rotation_vector());
            let e = r * term.x + pose.translation() - term.p;
            let res = term.a * e;
            let j_rot = [
                term.a * (derivs[0] * term.x),
                term.a * (derivs[1] * term.x),
                term.a * (derivs[2] * term.x),
            ];
            (res, j_rot, term.a)
        }
        PointModel::Undistort => {
            let s = term.rel_time;
            let w = pose.rotation_vector() * s;
            let r_s = rotation::rotation(&w);
            let derivs = rotation::rotation_derivatives(&w);
            let u = term.x - pose.translation() * s;
            let e = r_s.transpose() * u - term.p;
            let res = term.a * e;
            // d/dr_k: chain rule through w = s·r.
            let j_rot = [
                term.a * (derivs[0].transpose() * u) * s,
                term.a * (derivs[1].transpose() * u) * s,
                term.a * (derivs[2].transpose() * u) * s,
            ];
            let j_t = -(term.a * r_s.transpose()) * s;
            (res, j_rot, j_t)
        }
    }
}

/// Accumulate the normal equations `H = JᵀJ`, `g = Jᵀr` and the cost.
fn assemble(
    bag: &ResidualBag,
    pose: &Pose6D,
    model: PointModel,
) -> (Matrix6<f64>, Vector6<f64>, f64) {
    let mut h = Matrix6::zeros();
    let mut g = Vector6::zeros();
    let mut cost = 0.0;

    for term in bag.iter() {
        let (res, j_rot, j_t) = residual_and_jacobian(term, pose, model);
        cost += res.norm_squared();

        // Column c of the 3×6 Jacobian of this term.
        let mut jac = [Vector3::zeros(); 6];
        jac[0] = j_rot[0];
        jac[1] = j_rot[1];
        jac[2] = j_rot[2];
        jac[3] = j_t.column(0).into_owned();
        jac[4] = j_t.column(1).into_owned();
        jac[5] = j_t.column(2).into_owned();

        for c in 0..6 {
            g[c] += jac[c].dot(&res);
            for c2 in c..6 {
                let v = jac[c].dot(&jac[c2]);
                h[(c, c2)] += v;
                if c != c2 {
                    h[(c2, c)] += v;
                }
            }
        }
    }

    (h, g, cost)
}

/// Total squared residual at `pose`.
pub(crate) fn cost(bag: &ResidualBag, pose: &Pose6D, model: PointModel) -> f64 {
    bag.iter()
        .map(|term| residual_and_jacobian(term, pose, model).0.norm_squared())
        .sum()
}

/// Run one damped Gauss-Newton iteration, updating `pose` in place on
/// success.
pub(crate) fn lm_iteration(
    bag: &ResidualBag,
    pose: &mut Pose6D,
    model: PointModel,
    state: &mut LmState,
) -> StepOutcome {
    let (h, g, current_cost) = assemble(bag, pose, model);

    let mut decompose_failures = 0u32;
    for _ in 0..MAX_DAMPING_ATTEMPTS {
        let mut damped = h;
        for i in 0..6 {
            // Marquardt scaling keeps the damping dimensionally consistent
            // between the rotation and translation blocks.
            damped[(i, i)] += state.damping() * h[(i, i)].max(1e-12);
        }

        let Some(chol) = damped.cholesky() else {
            decompose_failures += 1;
            if state.is_saturated() {
                return StepOutcome::Failed;
            }
            state.reject();
            continue;
        };

        let delta = chol.solve(&(-g));
        let candidate = Pose6D::from_vector(&(pose.as_vector() + delta));
        let candidate_cost = cost(bag, &candidate, model);

        if candidate_cost < current_cost {
            *pose = candidate;
            state.accept();
            return if delta.norm() < STEP_EPSILON {
                StepOutcome::Converged
            } else {
                StepOutcome::Accepted
            };
        }

        // Worse: grow lambda and retry the same linearization. A vanishing
        // proposed step means we are at a (local) optimum already.
        if delta.norm() < STEP_EPSILON {
            return StepOutcome::Converged;
        }
        if state.is_saturated() {
            return StepOutcome::Rejected;
        }
        state.reject();
    }

    if decompose_failures == MAX_DAMPING_ATTEMPTS {
        StepOutcome::Failed
    } else {
        StepOutcome::Rejected
    }
}
