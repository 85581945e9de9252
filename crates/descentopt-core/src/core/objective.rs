//! Objective function interface for descent-step optimization.
//!
//! This module provides the [`Objective`] trait that the step evaluates,
//! a quadratic reference objective and a counting wrapper used to audit
//! evaluation budgets.
//!
//! # Design Philosophy
//!
//! - Outputs are written into caller-owned vectors so the step can reuse
//!   its storage across iterations
//! - Every evaluation receives a tolerance; exact objectives ignore it,
//!   inexact ones may use it to cheapen the computation
//! - Second-order information is optional: Hessian-vector products default
//!   to finite differences of the gradient, inverse Hessians are opt-in

use crate::{
    error::{OptimizerError, Result},
    types::Scalar,
    vector::Vector,
};
use nalgebra::{allocator::Allocator, DefaultAllocator, Dim, OMatrix, OVector};
use num_traits::Float;
use std::cell::Cell;
use std::fmt::Debug;
use std::marker::PhantomData;

/// Smooth objective `f: X -> R` minimized by the step.
pub trait Objective<T, V>: Debug
where
    T: Scalar,
    V: Vector<T>,
{
    /// Notifies the objective that `x` became the current iterate.
    ///
    /// `accepted` is `true` when the step committed to `x`, `iter` is the
    /// iteration counter after the commit.
    fn update(&mut self, _x: &V, _accepted: bool, _iter: usize) {}

    /// Evaluates `f(x)`.
    fn value(&self, x: &V, tol: T) -> Result<T>;

    /// Writes the gradient of `f` at `x` into `g`.
    fn gradient(&self, g: &mut V, x: &V, tol: T) -> Result<()>;

    /// Writes the Hessian-vector product `H(x) v` into `hv`.
    ///
    /// # Default Implementation
    ///
    /// Forward differences of the gradient along `v`.
    fn hess_vec(&self, hv: &mut V, v: &V, x: &V, tol: T) -> Result<()> {
        let norm = v.norm();
        if norm < T::EPSILON {
            hv.zero();
            return Ok(());
        }

        let h = <T as Float>::sqrt(T::EPSILON) / norm;
        let mut perturbed = x.clone();
        perturbed.axpy(h, v);

        let mut g = x.clone();
        self.gradient(&mut g, x, tol)?;
        self.gradient(hv, &perturbed, tol)?;
        hv.axpy(-T::one(), &g);
        hv.scale(T::one() / h);
        Ok(())
    }

    /// Writes the inverse Hessian-vector product `H(x)^{-1} v` into `hv`.
    ///
    /// # Default Implementation
    ///
    /// Returns `NotImplemented`; Newton descent requires an override.
    fn inv_hess_vec(&self, _hv: &mut V, _v: &V, _x: &V, _tol: T) -> Result<()> {
        Err(OptimizerError::not_implemented(
            "inverse Hessian-vector product",
        ))
    }

    /// Applies a preconditioner to `v`.
    ///
    /// # Default Implementation
    ///
    /// The identity.
    fn precond(&self, pv: &mut V, v: &V, _x: &V, _tol: T) -> Result<()> {
        pv.set(v);
        Ok(())
    }
}

/// Quadratic objective `f(x) = 1/2 x^T A x + b^T x + c`.
///
/// `A` should be symmetric positive definite for `inv_hess_vec` to succeed.
#[derive(Debug, Clone)]
pub struct QuadraticObjective<T, D>
where
    T: Scalar,
    D: Dim,
    DefaultAllocator: Allocator<D, D> + Allocator<D>,
{
    /// The quadratic form matrix (should be symmetric)
    pub a: OMatrix<T, D, D>,
    /// The linear term
    pub b: OVector<T, D>,
    /// The constant term
    pub c: T,
}

impl<T, D> QuadraticObjective<T, D>
where
    T: Scalar,
    D: Dim,
    DefaultAllocator: Allocator<D, D> + Allocator<D>,
{
    /// Creates a new quadratic objective.
    pub fn new(a: OMatrix<T, D, D>, b: OVector<T, D>, c: T) -> Self {
        Self { a, b, c }
    }

    /// Creates `f(x) = 1/2 ||x||^2`.
    pub fn simple(dim: D) -> Self {
        Self {
            a: OMatrix::identity_generic(dim, dim),
            b: OVector::zeros_generic(dim, nalgebra::U1),
            c: T::zero(),
        }
    }

    fn check_dimension(&self, x: &OVector<T, D>) -> Result<()> {
        if x.len() == self.b.len() {
            Ok(())
        } else {
            Err(OptimizerError::dimension_mismatch(self.b.len(), x.len()))
        }
    }
}

impl<T, D> Objective<T, OVector<T, D>> for QuadraticObjective<T, D>
where
    T: Scalar,
    D: Dim,
    DefaultAllocator: Allocator<D, D> + Allocator<D>,
{
    fn value(&self, x: &OVector<T, D>, _tol: T) -> Result<T> {
        self.check_dimension(x)?;
        let ax = &self.a * x;
        Ok(x.dot(&ax) * <T as Scalar>::from_f64(0.5) + self.b.dot(x) + self.c)
    }

    fn gradient(&self, g: &mut OVector<T, D>, x: &OVector<T, D>, _tol: T) -> Result<()> {
        self.check_dimension(x)?;
        g.copy_from(&(&self.a * x + &self.b));
        Ok(())
    }

    fn hess_vec(
        &self,
        hv: &mut OVector<T, D>,
        v: &OVector<T, D>,
        _x: &OVector<T, D>,
        _tol: T,
    ) -> Result<()> {
        self.check_dimension(v)?;
        hv.copy_from(&(&self.a * v));
        Ok(())
    }

    fn inv_hess_vec(
        &self,
        hv: &mut OVector<T, D>,
        v: &OVector<T, D>,
        _x: &OVector<T, D>,
        _tol: T,
    ) -> Result<()> {
        self.check_dimension(v)?;
        let chol = self.a.clone().cholesky().ok_or_else(|| {
            OptimizerError::numerical_error("quadratic form is not positive definite")
        })?;
        hv.copy_from(&chol.solve(v));
        Ok(())
    }
}

/// Wrapper to count objective evaluations for testing and auditing.
#[derive(Debug)]
pub struct CountingObjective<O, T, V>
where
    O: Objective<T, V>,
    T: Scalar,
    V: Vector<T>,
{
    /// The underlying objective
    pub inner: O,
    /// Number of value evaluations
    pub value_count: Cell<usize>,
    /// Number of gradient evaluations
    pub gradient_count: Cell<usize>,
    /// Number of Hessian-vector products
    pub hess_vec_count: Cell<usize>,
    /// Number of accepted-iterate notifications
    pub update_count: usize,
    _phantom: PhantomData<(T, V)>,
}

impl<O, T, V> CountingObjective<O, T, V>
where
    O: Objective<T, V>,
    T: Scalar,
    V: Vector<T>,
{
    /// Creates a new counting wrapper around an objective.
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            value_count: Cell::new(0),
            gradient_count: Cell::new(0),
            hess_vec_count: Cell::new(0),
            update_count: 0,
            _phantom: PhantomData,
        }
    }

    /// Returns the (value, gradient, Hessian-vector) evaluation counts.
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.value_count.get(),
            self.gradient_count.get(),
            self.hess_vec_count.get(),
        )
    }
}

impl<O, T, V> Objective<T, V> for CountingObjective<O, T, V>
where
    O: Objective<T, V>,
    T: Scalar,
    V: Vector<T>,
{
    fn update(&mut self, x: &V, accepted: bool, iter: usize) {
        self.update_count += 1;
        self.inner.update(x, accepted, iter);
    }

    fn value(&self, x: &V, tol: T) -> Result<T> {
        self.value_count.set(self.value_count.get() + 1);
        self.inner.value(x, tol)
    }

    fn gradient(&self, g: &mut V, x: &V, tol: T) -> Result<()> {
        self.gradient_count.set(self.gradient_count.get() + 1);
        self.inner.gradient(g, x, tol)
    }

    fn hess_vec(&self, hv: &mut V, v: &V, x: &V, tol: T) -> Result<()> {
        self.hess_vec_count.set(self.hess_vec_count.get() + 1);
        self.inner.hess_vec(hv, v, x, tol)
    }

    fn inv_hess_vec(&self, hv: &mut V, v: &V, x: &V, tol: T) -> Result<()> {
        self.inner.inv_hess_vec(hv, v, x, tol)
    }

    fn precond(&self, pv: &mut V, v: &V, x: &V, tol: T) -> Result<()> {
        self.inner.precond(pv, v, x, tol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DVector;
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, Dyn};

    /// Objective relying on the default finite-difference Hessian.
    #[derive(Debug)]
    struct Cubic;

    impl Objective<f64, DVector<f64>> for Cubic {
        fn value(&self, x: &DVector<f64>, _tol: f64) -> Result<f64> {
            Ok(x.iter().map(|xi| xi.powi(3) / 3.0).sum())
        }

        fn gradient(&self, g: &mut DVector<f64>, x: &DVector<f64>, _tol: f64) -> Result<()> {
            g.copy_from(&x.map(|xi| xi * xi));
            Ok(())
        }
    }

    #[test]
    fn test_quadratic_derivatives() {
        let a = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let b = DVector::from_vec(vec![1.0, -2.0]);
        let obj = QuadraticObjective::new(a, b, 0.5);
        let x = DVector::from_vec(vec![1.0, 1.0]);

        assert_relative_eq!(obj.value(&x, 0.0).unwrap(), 4.5 - 1.0 + 0.5);

        let mut g = DVector::zeros(2);
        obj.gradient(&mut g, &x, 0.0).unwrap();
        assert_eq!(g, DVector::from_vec(vec![6.0, 2.0]));

        let mut hv = DVector::zeros(2);
        obj.hess_vec(&mut hv, &g, &x, 0.0).unwrap();
        let mut back = DVector::zeros(2);
        obj.inv_hess_vec(&mut back, &hv, &x, 0.0).unwrap();
        assert_relative_eq!(back, g, epsilon = 1e-12);
    }

    #[test]
    fn test_quadratic_dimension_check() {
        let obj = QuadraticObjective::<f64, Dyn>::simple(Dyn(3));
        let x = DVector::zeros(2);
        assert!(matches!(
            obj.value(&x, 0.0),
            Err(OptimizerError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_default_hess_vec_uses_gradient_differences() {
        let x = DVector::from_vec(vec![1.0, 2.0]);
        let v = DVector::from_vec(vec![1.0, 0.0]);
        let mut hv = DVector::zeros(2);
        Cubic.hess_vec(&mut hv, &v, &x, 0.0).unwrap();
        assert_relative_eq!(hv[0], 2.0, epsilon = 1e-6);
        assert_relative_eq!(hv[1], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_default_inv_hess_vec_is_not_implemented() {
        let x = DVector::from_vec(vec![1.0]);
        let mut out = DVector::zeros(1);
        assert!(matches!(
            Cubic.inv_hess_vec(&mut out, &x, &x, 0.0),
            Err(OptimizerError::NotImplemented { .. })
        ));
    }

    #[test]
    fn test_counting_objective() {
        let mut obj = CountingObjective::new(QuadraticObjective::<f64, Dyn>::simple(Dyn(2)));
        let x = DVector::from_vec(vec![1.0, 2.0]);
        let mut g = DVector::zeros(2);

        obj.value(&x, 0.0).unwrap();
        obj.value(&x, 0.0).unwrap();
        obj.gradient(&mut g, &x, 0.0).unwrap();
        obj.update(&x, true, 1);

        assert_eq!(obj.counts(), (2, 1, 0));
        assert_eq!(obj.update_count, 1);
    }
}
