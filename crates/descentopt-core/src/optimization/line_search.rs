//! Line search along a descent direction.
//!
//! This module implements the inexact one-dimensional minimization that
//! turns a descent direction into a step. Given an iterate `x`, a direction
//! `s` and the slope `gs = phi'(0) < 0`, the search looks for a step length
//! `t` at which
//!
//! ```text
//! phi(t) = f(x_t),    x_t = P(x + t s)   (P = identity without bounds)
//! ```
//!
//! satisfies sufficient decrease together with the chosen curvature
//! condition (see [`curvature`](super::curvature)).
//!
//! # Bound Constraints
//!
//! With active bounds every trial point is projected. The slope at a trial
//! point is measured along `s` with its eps-binding components removed; the
//! binding set is fixed per search by [`LineSearch::set_data`], which
//! receives the gradient at `x` and the binding tolerance `eps`.
//!
//! # Step Selectors
//!
//! ## Backtracking
//! - Shrinks geometrically, `t <- rho t`
//! - Shrink-only: a `TooShort` verdict is accepted as is
//!
//! ## Cubic Interpolation
//! - First backtrack minimizes the quadratic through `phi(0)`, `phi'(0)`, `phi(t)`
//! - Later backtracks minimize the cubic through the last two trials
//! - The new trial is safeguarded to `[0.1 t, 0.5 t]`
//! - Shrink-only, like backtracking
//!
//! ## Bisection and Golden Section
//! - Maintain a bracket `[lo, hi]`, `hi` initially open
//! - `TooShort` raises `lo` and doubles `t` while `hi` is open
//! - `TooLong` lowers `hi`
//! - The next trial is the midpoint, respectively the golden point
//!
//! # Failure
//!
//! A search that exhausts its evaluation budget, or whose bracket collapses,
//! is not an error: it returns its last trial with `success = false` and
//! leaves the decision to the caller.

use crate::{
    config::step_config::{CurvatureCondition, LineSearchType, StepConfig},
    core::{
        bounds::BoundConstraint,
        error::{OptimizerError, Result},
        objective::Objective,
        types::{constants, Scalar},
        vector::Vector,
    },
    optimization::curvature::{CurvatureTest, Verdict},
};
use log::debug;
use num_traits::Float;
use std::fmt::Debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Outcome of a line search.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSearchResult<T>
where
    T: Scalar,
{
    /// Step length `t` of the last trial
    pub step_size: T,

    /// Objective value `phi(t)` at the last trial
    pub new_value: T,

    /// Number of objective evaluations performed
    pub function_evals: usize,

    /// Number of gradient evaluations performed
    pub gradient_evals: usize,

    /// True if the last trial satisfied the acceptance conditions
    pub success: bool,
}

/// Parameters shared by all step selectors.
///
/// # Parameter Constraints
///
/// - `0 < c1 < c2 < 1`
/// - `c3 > 0`
/// - `0 < rho < 1`
/// - `initial_step_size > 0`, `bracketing_tolerance > 0`
/// - `max_evaluations >= 1`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineSearchParams<T>
where
    T: Scalar,
{
    /// Sufficient decrease parameter c₁
    pub c1: T,

    /// Curvature parameter c₂
    pub c2: T,

    /// Upper curvature parameter c₃ of the generalized Wolfe conditions
    pub c3: T,

    /// Maximum number of objective evaluations per search
    pub max_evaluations: usize,

    /// First trial step length
    pub initial_step_size: T,

    /// Backtracking reduction factor ρ
    pub rho: T,

    /// Bracket width below which bracketing selectors give up
    pub bracketing_tolerance: T,
}

impl<T> Default for LineSearchParams<T>
where
    T: Scalar,
{
    fn default() -> Self {
        Self {
            c1: <T as Scalar>::from_f64(1e-4),
            c2: <T as Scalar>::from_f64(0.9),
            c3: <T as Scalar>::from_f64(0.9),
            max_evaluations: 20,
            initial_step_size: T::one(),
            rho: <T as Scalar>::from_f64(0.5),
            bracketing_tolerance: <T as Scalar>::from_f64(1e-8),
        }
    }
}

impl<T> LineSearchParams<T>
where
    T: Scalar,
{
    /// Validates the parameters.
    ///
    /// # Errors
    ///
    /// Returns `OptimizerError::InvalidConfiguration` naming the offending
    /// option when a constraint listed on the type is violated.
    pub fn validate(&self) -> Result<()> {
        let zero = T::zero();
        let one = T::one();

        if self.c1 <= zero || self.c1 >= one {
            return Err(OptimizerError::invalid_configuration(
                "must lie in (0, 1)",
                "Sufficient Decrease Parameter",
                self.c1.to_string(),
            ));
        }

        if self.c2 <= self.c1 || self.c2 >= one {
            return Err(OptimizerError::invalid_configuration(
                "must satisfy c1 < c2 < 1",
                "Curvature Conditions Parameter",
                self.c2.to_string(),
            ));
        }

        if self.c3 <= zero {
            return Err(OptimizerError::invalid_configuration(
                "must be positive",
                "Curvature Conditions Parameter: Generalized Wolfe",
                self.c3.to_string(),
            ));
        }

        if self.rho <= zero || self.rho >= one {
            return Err(OptimizerError::invalid_configuration(
                "must lie in (0, 1)",
                "Backtracking Rate",
                self.rho.to_string(),
            ));
        }

        if self.initial_step_size <= zero {
            return Err(OptimizerError::invalid_configuration(
                "must be positive",
                "Initial Linesearch Parameter",
                self.initial_step_size.to_string(),
            ));
        }

        if self.bracketing_tolerance <= zero {
            return Err(OptimizerError::invalid_configuration(
                "must be positive",
                "Bracketing Tolerance",
                self.bracketing_tolerance.to_string(),
            ));
        }

        if self.max_evaluations == 0 {
            return Err(OptimizerError::invalid_configuration(
                "must be at least 1",
                "Function Evaluation Limit",
                "0",
            ));
        }

        Ok(())
    }

    /// Parameters suited to quasi-Newton directions (the defaults).
    pub fn strong_wolfe() -> Self {
        Self::default()
    }

    /// Parameters suited to nonlinear CG, with a tighter curvature parameter.
    pub fn conjugate_gradient() -> Self {
        Self {
            c2: <T as Scalar>::from_f64(0.1),
            ..Self::default()
        }
    }

    /// Parameters for plain backtracking.
    pub fn backtracking() -> Self {
        Self {
            rho: <T as Scalar>::from_f64(0.5),
            max_evaluations: 20,
            ..Self::default()
        }
    }
}

/// Protocol between the step and a line search.
///
/// The trait is object safe; the step holds a `Box<dyn LineSearch<T, V>>`.
pub trait LineSearch<T, V>: Debug
where
    T: Scalar,
    V: Vector<T>,
{
    /// Records the gradient at the current iterate and the binding tolerance
    /// used to prune the direction under bounds.
    fn set_data(&mut self, gradient: &V, eps: T);

    /// Searches along `s` from `x`, where `value = f(x)` and `gs = phi'(0)`.
    fn run(
        &mut self,
        x: &V,
        s: &V,
        value: T,
        gs: T,
        obj: &dyn Objective<T, V>,
        bounds: &dyn BoundConstraint<T, V>,
    ) -> Result<LineSearchResult<T>>;

    /// Display name of the step selector.
    fn name(&self) -> &'static str;
}

/// Line search enforcing sufficient decrease and a curvature condition.
#[derive(Debug, Clone)]
pub struct CurvatureLineSearch<T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    kind: LineSearchType,
    test: CurvatureTest<T>,
    params: LineSearchParams<T>,
    inexact_value: bool,
    gradient: Option<V>,
    eps: T,
}

impl<T, V> CurvatureLineSearch<T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    /// Creates a line search.
    pub fn new(
        kind: LineSearchType,
        condition: CurvatureCondition,
        params: LineSearchParams<T>,
    ) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            kind,
            test: CurvatureTest::new(condition, params.c1, params.c2, params.c3),
            params,
            inexact_value: false,
            gradient: None,
            eps: T::zero(),
        })
    }

    /// Creates the line search described by a step configuration.
    pub fn from_config(config: &StepConfig<T>) -> Result<Self> {
        Ok(Self::new(
            config.line_search,
            config.curvature,
            config.line_search_params.clone(),
        )?
        .with_inexact_value(config.inexact_value))
    }

    /// Lets value evaluations use a tolerance proportional to the expected decrease.
    #[must_use]
    pub fn with_inexact_value(mut self, inexact: bool) -> Self {
        self.inexact_value = inexact;
        self
    }

    /// Step selector.
    pub fn kind(&self) -> LineSearchType {
        self.kind
    }

    /// Parameters in use.
    pub fn params(&self) -> &LineSearchParams<T> {
        &self.params
    }

    fn value_tolerance(&self, t: T, gs: T) -> T {
        if self.inexact_value {
            <T as Scalar>::from_f64(0.1) * self.params.c1 * t * <T as Float>::abs(gs)
        } else {
            T::sqrt_epsilon()
        }
    }

    fn shrink_only(&self) -> bool {
        matches!(
            self.kind,
            LineSearchType::Backtracking | LineSearchType::CubicInterpolation
        )
    }

    /// Backtracking trial for the interpolating selector.
    fn interpolate(&self, t: T, phi_t: T, previous: Option<(T, T)>, phi0: T, dphi0: T) -> T {
        let two = <T as Scalar>::from_f64(2.0);
        let three = <T as Scalar>::from_f64(3.0);

        let candidate = match previous {
            None => -dphi0 * t * t / (two * (phi_t - phi0 - dphi0 * t)),
            Some((t_prev, phi_prev)) => {
                let r1 = phi_t - phi0 - dphi0 * t;
                let r2 = phi_prev - phi0 - dphi0 * t_prev;
                let d = t - t_prev;
                let a = (r1 / (t * t) - r2 / (t_prev * t_prev)) / d;
                let b = (-t_prev * r1 / (t * t) + t * r2 / (t_prev * t_prev)) / d;
                if a == T::zero() {
                    -dphi0 / (two * b)
                } else {
                    let disc = b * b - three * a * dphi0;
                    (-b + <T as Float>::sqrt(disc)) / (three * a)
                }
            }
        };

        let lo = <T as Scalar>::from_f64(0.1) * t;
        let hi = <T as Scalar>::from_f64(0.5) * t;
        if Float::is_finite(candidate) {
            num_traits::clamp(candidate, lo, hi)
        } else {
            hi
        }
    }
}

impl<T, V> LineSearch<T, V> for CurvatureLineSearch<T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    fn set_data(&mut self, gradient: &V, eps: T) {
        match self.gradient.as_mut() {
            Some(g) => g.set(gradient),
            None => self.gradient = Some(gradient.clone()),
        }
        self.eps = eps;
    }

    fn run(
        &mut self,
        x: &V,
        s: &V,
        value: T,
        gs: T,
        obj: &dyn Objective<T, V>,
        bounds: &dyn BoundConstraint<T, V>,
    ) -> Result<LineSearchResult<T>> {
        let projected = bounds.is_activated();

        let mut s_free = s.clone();
        if projected {
            if let Some(g) = &self.gradient {
                bounds.prune_active(&mut s_free, g, x, self.eps);
            }
        }

        let golden = constants::inverse_golden_ratio::<T>();
        let two = <T as Scalar>::from_f64(2.0);
        let mut trial = x.clone();
        let mut trial_gradient = x.clone();

        let mut t = self.params.initial_step_size;
        let mut lo = T::zero();
        let mut hi: Option<T> = None;
        let mut previous: Option<(T, T)> = None;
        let mut function_evals = 0;
        let mut gradient_evals = 0;

        loop {
            trial.set(x);
            trial.axpy(t, s);
            if projected {
                bounds.project(&mut trial);
            }

            let tol = self.value_tolerance(t, gs);
            let phi_t = obj.value(&trial, tol)?;
            function_evals += 1;

            let dphi_t = if self.test.needs_gradient()
                && self.test.sufficient_decrease(t, value, gs, phi_t)
            {
                obj.gradient(&mut trial_gradient, &trial, tol)?;
                gradient_evals += 1;
                Some(trial_gradient.dot(&s_free))
            } else {
                None
            };

            let verdict = self.test.check(t, value, gs, phi_t, dphi_t);
            debug!(
                "{} trial t = {:e}: phi = {:e}, verdict {:?}",
                self.kind.name(),
                t.to_f64(),
                phi_t.to_f64(),
                verdict
            );

            let done = |success| LineSearchResult {
                step_size: t,
                new_value: phi_t,
                function_evals,
                gradient_evals,
                success,
            };

            match verdict {
                Verdict::Accept => return Ok(done(true)),
                Verdict::TooShort if self.shrink_only() => return Ok(done(true)),
                _ => {}
            }

            if function_evals >= self.params.max_evaluations {
                return Ok(done(false));
            }

            let next = match (self.kind, verdict) {
                (LineSearchType::Backtracking, _) => self.params.rho * t,
                (LineSearchType::CubicInterpolation, _) => {
                    self.interpolate(t, phi_t, previous, value, gs)
                }
                (_, Verdict::TooShort) => {
                    lo = t;
                    match hi {
                        None => two * t,
                        Some(h) => section(self.kind, lo, h, golden),
                    }
                }
                (_, _) => {
                    hi = Some(t);
                    section(self.kind, lo, t, golden)
                }
            };

            if let Some(h) = hi {
                if h - lo < self.params.bracketing_tolerance {
                    debug!("{} bracket collapsed at t = {:e}", self.kind.name(), t.to_f64());
                    return Ok(done(false));
                }
            }

            previous = Some((t, phi_t));
            t = next;
        }
    }

    fn name(&self) -> &'static str {
        self.kind.name()
    }
}

/// Next trial inside the bracket `[lo, hi]`.
fn section<T: Scalar>(kind: LineSearchType, lo: T, hi: T, golden: T) -> T {
    match kind {
        LineSearchType::GoldenSection => lo + golden * (hi - lo),
        _ => <T as Scalar>::from_f64(0.5) * (lo + hi),
    }
}
