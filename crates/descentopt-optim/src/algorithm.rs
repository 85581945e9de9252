//! Driver loop, status test and optimization result.
//!
//! [`Algorithm`] owns a [`Step`] and a [`StatusTest`]. A run initializes
//! the step, then alternates `compute` and `update` while the status test
//! passes, collecting one progress line per iteration.

use crate::step::Step;
use descentopt_core::{
    bounds::BoundConstraint,
    error::Result,
    objective::Objective,
    optimization::AlgorithmState,
    types::Scalar,
    vector::Vector,
};
use log::debug;
use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Reason for termination of the optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TerminationReason {
    /// Criticality measure below tolerance
    Converged,
    /// Step norm below tolerance
    StepTolerance,
    /// Iteration limit reached
    MaxIterations,
}

/// Stopping rule on the criticality measure, the step norm and the
/// iteration count.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StatusTest<T: Scalar> {
    /// Criticality tolerance
    pub gtol: T,
    /// Step tolerance
    pub stol: T,
    /// Maximum number of iterations
    pub max_iter: usize,
}

impl<T: Scalar> Default for StatusTest<T> {
    fn default() -> Self {
        Self {
            gtol: T::DEFAULT_GRADIENT_TOLERANCE,
            stol: T::DEFAULT_STEP_TOLERANCE,
            max_iter: 100,
        }
    }
}

impl<T: Scalar> StatusTest<T> {
    /// Creates a status test.
    pub fn new(gtol: T, stol: T, max_iter: usize) -> Self {
        Self {
            gtol,
            stol,
            max_iter,
        }
    }

    /// Sets the criticality tolerance.
    #[must_use]
    pub fn with_gradient_tolerance(mut self, gtol: T) -> Self {
        self.gtol = gtol;
        self
    }

    /// Sets the step tolerance.
    #[must_use]
    pub fn with_step_tolerance(mut self, stol: T) -> Self {
        self.stol = stol;
        self
    }

    /// Sets the iteration limit.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Whether the run should continue.
    pub fn check<V: Vector<T>>(&self, algo: &AlgorithmState<T, V>) -> bool {
        algo.gnorm > self.gtol && algo.snorm > self.stol && algo.iter < self.max_iter
    }

    /// Why a run that stopped at `algo` stopped.
    pub fn reason<V: Vector<T>>(&self, algo: &AlgorithmState<T, V>) -> TerminationReason {
        if algo.gnorm <= self.gtol {
            TerminationReason::Converged
        } else if algo.snorm <= self.stol {
            TerminationReason::StepTolerance
        } else {
            TerminationReason::MaxIterations
        }
    }
}

/// Result of an optimization run.
#[derive(Debug, Clone)]
pub struct OptimizationResult<T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    /// Final iterate
    pub point: V,
    /// Objective value at the final iterate
    pub value: T,
    /// Criticality measure at the final iterate
    pub gradient_norm: T,
    /// Number of iterations performed
    pub iterations: usize,
    /// Number of function evaluations
    pub function_evaluations: usize,
    /// Number of gradient evaluations
    pub gradient_evaluations: usize,
    /// Wall-clock time of the run
    pub duration: Duration,
    /// Reason for termination
    pub termination_reason: TerminationReason,
    /// Whether the criticality tolerance was reached
    pub converged: bool,
    /// Progress report, one entry per printed block
    pub output: Vec<String>,
}

/// Drives a step to termination.
pub struct Algorithm<T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    step: Box<dyn Step<T, V>>,
    status: StatusTest<T>,
    print_header: bool,
}

impl<T, V> std::fmt::Debug for Algorithm<T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Algorithm")
            .field("status", &self.status)
            .field("print_header", &self.print_header)
            .finish_non_exhaustive()
    }
}

impl<T, V> Algorithm<T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    /// Creates a driver.
    pub fn new(step: Box<dyn Step<T, V>>, status: StatusTest<T>) -> Self {
        Self {
            step,
            status,
            print_header: false,
        }
    }

    /// Repeats the column header on every progress line.
    #[must_use]
    pub fn with_print_header(mut self, print_header: bool) -> Self {
        self.print_header = print_header;
        self
    }

    /// The step being driven.
    pub fn step(&self) -> &dyn Step<T, V> {
        self.step.as_ref()
    }

    /// Minimizes `obj` over `bounds` starting from `x`, which holds the
    /// final iterate on return.
    ///
    /// # Errors
    ///
    /// Propagates failures of the objective and of the step's
    /// collaborators. Running out of iterations is not an error.
    pub fn run(
        &mut self,
        x: &mut V,
        obj: &mut dyn Objective<T, V>,
        bounds: &dyn BoundConstraint<T, V>,
    ) -> Result<OptimizationResult<T, V>> {
        let start = Instant::now();
        let mut algo = AlgorithmState::new(&*x);
        let mut output = Vec::new();

        self.step.initialize(x, obj, bounds, &mut algo)?;
        output.push(self.step.print(&algo, true));

        let mut s = x.clone();
        while self.status.check(&algo) {
            self.step.compute(&mut s, x, obj, bounds, &mut algo)?;
            self.step.update(x, &s, obj, bounds, &mut algo)?;
            output.push(self.step.print(&algo, self.print_header));
        }

        let termination_reason = self.status.reason(&algo);
        debug!(
            "stopped after {} iterations: {:?} (gnorm = {:e})",
            algo.iter,
            termination_reason,
            algo.gnorm.to_f64()
        );

        Ok(OptimizationResult {
            point: x.clone(),
            value: algo.value,
            gradient_norm: algo.gnorm,
            iterations: algo.iter,
            function_evaluations: algo.nfval,
            gradient_evaluations: algo.ngrad,
            duration: start.elapsed(),
            termination_reason,
            converged: termination_reason == TerminationReason::Converged,
            output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;

    fn state(iter: usize, gnorm: f64, snorm: f64) -> AlgorithmState<f64, DVector<f64>> {
        let mut algo = AlgorithmState::new(&DVector::zeros(2));
        algo.iter = iter;
        algo.gnorm = gnorm;
        algo.snorm = snorm;
        algo
    }

    #[test]
    fn test_status_defaults() {
        let status = StatusTest::<f64>::default();
        assert_eq!(status.gtol, 1e-6);
        assert_eq!(status.stol, 1e-12);
        assert_eq!(status.max_iter, 100);
    }

    #[test]
    fn test_status_check_and_reason() {
        let status = StatusTest::new(1e-6, 1e-12, 10);
        assert!(status.check(&state(0, 1.0, 1e10)));

        let converged = state(3, 1e-8, 1.0);
        assert!(!status.check(&converged));
        assert_eq!(status.reason(&converged), TerminationReason::Converged);

        let stalled = state(3, 1.0, 0.0);
        assert!(!status.check(&stalled));
        assert_eq!(status.reason(&stalled), TerminationReason::StepTolerance);

        let exhausted = state(10, 1.0, 1.0);
        assert!(!status.check(&exhausted));
        assert_eq!(status.reason(&exhausted), TerminationReason::MaxIterations);
    }
}
