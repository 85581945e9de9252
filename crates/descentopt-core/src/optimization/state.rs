//! Algorithm and step state shared between the driver and the step.
//!
//! # Ownership
//!
//! [`AlgorithmState`] is owned by the driver and lent to the step by `&mut`
//! for every `initialize`, `compute` and `update` call, so at most one
//! component writes it at a time. Within one iteration the fields have a
//! fixed writer:
//!
//! | Field | Written by |
//! |---|---|
//! | `iter`, `ngrad`, `gnorm`, `iterate` | `initialize`, `update` |
//! | `value`, `snorm` | `initialize`, `compute` |
//! | `nfval` | `initialize`, `compute` (line-search evaluations) |
//!
//! [`StepState`] is private to the step: it keeps the gradient at the
//! current iterate and the last accepted step.

use crate::{types::Scalar, vector::Vector};

/// Progress of the optimization as seen by the driver.
#[derive(Debug, Clone)]
pub struct AlgorithmState<T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    /// Iteration counter
    pub iter: usize,
    /// Objective value at the current iterate
    pub value: T,
    /// Criticality measure at the current iterate
    pub gnorm: T,
    /// Norm of the last step
    pub snorm: T,
    /// Cumulative number of objective evaluations
    pub nfval: usize,
    /// Cumulative number of gradient evaluations
    pub ngrad: usize,
    /// Copy of the current iterate
    pub iterate: V,
}

impl<T, V> AlgorithmState<T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    /// Creates a fresh state anchored at `x0`.
    pub fn new(x0: &V) -> Self {
        Self {
            iter: 0,
            value: T::zero(),
            gnorm: T::zero(),
            snorm: T::INITIAL_STEP_NORM,
            nfval: 0,
            ngrad: 0,
            iterate: x0.clone(),
        }
    }
}

/// Data the step carries from one iteration to the next.
#[derive(Debug, Clone)]
pub struct StepState<T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    /// Gradient at the current iterate
    pub gradient: V,
    /// Last accepted step
    pub descent: V,
    /// Last accepted step length
    pub search_size: T,
}

impl<T, V> StepState<T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    /// Allocates zeroed storage shaped like `x`.
    pub fn new(x: &V) -> Self {
        let mut gradient = x.clone();
        gradient.zero();
        let descent = gradient.clone();
        Self {
            gradient,
            descent,
            search_size: T::one(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DVector;

    #[test]
    fn test_fresh_states() {
        let x = DVector::from_vec(vec![1.0, -2.0]);
        let algo = AlgorithmState::<f64, _>::new(&x);
        assert_eq!(algo.iter, 0);
        assert_eq!(algo.snorm, 1e10);
        assert_eq!(algo.iterate, x);

        let step = StepState::<f64, _>::new(&x);
        assert_eq!(step.gradient, DVector::zeros(2));
        assert_eq!(step.descent, DVector::zeros(2));
        assert_eq!(step.search_size, 1.0);
    }
}
