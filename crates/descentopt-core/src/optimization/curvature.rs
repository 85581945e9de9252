//! Acceptance tests for a trial step length.
//!
//! Along a direction `s` the line search studies `phi(t) = f(x + t s)` with
//! `phi'(0) < 0`. A trial `t` is first checked for sufficient decrease
//!
//! ```text
//! phi(t) <= phi(0) + c1 t phi'(0)
//! ```
//!
//! and then against one of the curvature conditions of
//! [`CurvatureCondition`]. The outcome is a [`Verdict`] telling the step
//! selector whether to stop, shrink or grow.

use crate::{config::step_config::CurvatureCondition, types::Scalar};
use num_traits::Float;

/// Outcome of checking one trial step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Both conditions hold
    Accept,
    /// The step overshoots: shrink it
    TooLong,
    /// The step is too timid: grow it
    TooShort,
}

/// Sufficient decrease plus one curvature condition.
#[derive(Debug, Clone, Copy)]
pub struct CurvatureTest<T: Scalar> {
    /// Which curvature condition to apply
    pub condition: CurvatureCondition,
    /// Sufficient decrease parameter
    pub c1: T,
    /// Curvature parameter
    pub c2: T,
    /// Upper curvature parameter of the generalized Wolfe conditions
    pub c3: T,
}

impl<T: Scalar> CurvatureTest<T> {
    /// Creates a test.
    pub fn new(condition: CurvatureCondition, c1: T, c2: T, c3: T) -> Self {
        Self {
            condition,
            c1,
            c2,
            c3,
        }
    }

    /// Whether `check` needs `phi'(t)`, i.e. a gradient at the trial point.
    pub fn needs_gradient(&self) -> bool {
        !matches!(self.condition, CurvatureCondition::Goldstein)
    }

    /// Armijo condition `phi(t) <= phi(0) + c1 t phi'(0)`.
    pub fn sufficient_decrease(&self, t: T, phi0: T, dphi0: T, phi_t: T) -> bool {
        Float::is_finite(phi_t) && phi_t <= phi0 + self.c1 * t * dphi0
    }

    /// Classifies the trial `t`.
    ///
    /// `dphi_t` is only read when [`needs_gradient`](Self::needs_gradient)
    /// is true; passing `None` there yields `TooShort` once sufficient
    /// decrease holds.
    pub fn check(&self, t: T, phi0: T, dphi0: T, phi_t: T, dphi_t: Option<T>) -> Verdict {
        if !self.sufficient_decrease(t, phi0, dphi0, phi_t) {
            return Verdict::TooLong;
        }

        let one = T::one();
        match self.condition {
            CurvatureCondition::Goldstein => {
                if phi0 + (one - self.c1) * t * dphi0 <= phi_t {
                    Verdict::Accept
                } else {
                    Verdict::TooShort
                }
            }
            condition => {
                let Some(d) = dphi_t else {
                    return Verdict::TooShort;
                };
                let lower = self.c2 * dphi0;
                let upper = match condition {
                    CurvatureCondition::Wolfe => <T as Float>::infinity(),
                    CurvatureCondition::StrongWolfe => -self.c2 * dphi0,
                    CurvatureCondition::GeneralizedWolfe => -self.c3 * dphi0,
                    _ => (self.c1 + self.c1 - one) * dphi0,
                };
                if d < lower {
                    Verdict::TooShort
                } else if d > upper {
                    Verdict::TooLong
                } else {
                    Verdict::Accept
                }
            }
        }
    }
}
