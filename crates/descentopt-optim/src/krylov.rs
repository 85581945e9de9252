//! Krylov solvers for the Newton system.
//!
//! Newton-Krylov descent solves `H s = g` approximately, where `H` is
//! available only through products `v -> H v`. The solvers here stop when
//!
//! ```text
//! ||r|| < min(abs_tol, rel_tol ||g||)
//! ```
//!
//! after `max_iter` iterations, or when they meet a direction `p` with
//! `<p, H p> <= 0`.
//!
//! # Iteration Count
//!
//! The reported count is the number of Hessian applications whose result
//! was used. A solve that stops in its first iteration, for convergence or
//! for negative curvature, reports one iteration.
//!
//! # Inexact Products
//!
//! With inexact Hessian-vector products enabled, each product is requested
//! with tolerance `rtol / (max_iter ||r||)` so that the accumulated error
//! stays below the stopping tolerance.

use descentopt_core::{
    config::KrylovType,
    error::{OptimizerError, Result},
    types::Scalar,
    vector::Vector,
};
use log::debug;
use num_traits::Float;
use std::fmt::Debug;

/// A linear map `v -> A v` applied with a requested accuracy.
pub trait LinearOperator<T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    /// Writes `A v` into `out`.
    fn apply(&self, out: &mut V, v: &V, tol: T) -> Result<()>;
}

/// Identity operator, the default preconditioner.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityOperator;

impl<T, V> LinearOperator<T, V> for IdentityOperator
where
    T: Scalar,
    V: Vector<T>,
{
    fn apply(&self, out: &mut V, v: &V, _tol: T) -> Result<()> {
        out.set(v);
        Ok(())
    }
}

/// Why a Krylov solve stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KrylovFlag {
    /// Residual tolerance reached
    Converged,
    /// Iteration limit reached
    MaxIterations,
    /// Nonpositive curvature encountered
    NegativeCurvature,
}

impl KrylovFlag {
    /// Numeric code as printed in the step report.
    pub fn code(self) -> usize {
        match self {
            Self::Converged => 0,
            Self::MaxIterations => 1,
            Self::NegativeCurvature => 2,
        }
    }
}

/// Result of a Krylov solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KrylovOutcome {
    /// Number of iterations performed
    pub iterations: usize,
    /// Termination flag
    pub flag: KrylovFlag,
}

/// Interface of a Krylov solver.
pub trait Krylov<T, V>: Debug
where
    T: Scalar,
    V: Vector<T>,
{
    /// Approximately solves `op s = rhs`, preconditioned by `precond`.
    fn run(
        &mut self,
        s: &mut V,
        rhs: &V,
        op: &dyn LinearOperator<T, V>,
        precond: &dyn LinearOperator<T, V>,
    ) -> Result<KrylovOutcome>;

    /// Which solver this is.
    fn kind(&self) -> KrylovType;
}

/// Stopping parameters shared by the solvers.
#[derive(Debug, Clone, Copy)]
pub struct KrylovConfig<T: Scalar> {
    /// Absolute residual tolerance
    pub abs_tol: T,
    /// Residual tolerance relative to the right-hand side
    pub rel_tol: T,
    /// Iteration limit
    pub max_iter: usize,
    /// Request Hessian products with an iteration-dependent tolerance
    pub inexact: bool,
}

impl<T: Scalar> Default for KrylovConfig<T> {
    fn default() -> Self {
        Self {
            abs_tol: <T as Scalar>::from_f64(1e-4),
            rel_tol: <T as Scalar>::from_f64(1e-2),
            max_iter: 20,
            inexact: false,
        }
    }
}

impl<T: Scalar> KrylovConfig<T> {
    /// Creates a configuration.
    pub fn new(abs_tol: T, rel_tol: T, max_iter: usize) -> Self {
        Self {
            abs_tol,
            rel_tol,
            max_iter,
            inexact: false,
        }
    }

    /// Enables inexact Hessian-vector products.
    #[must_use]
    pub fn with_inexact(mut self, inexact: bool) -> Self {
        self.inexact = inexact;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.max_iter == 0 {
            return Err(OptimizerError::invalid_configuration(
                "must be positive",
                "Maximum Number of Krylov Iterations",
                "0",
            ));
        }
        Ok(())
    }

    fn residual_tolerance(&self, rhs_norm: T) -> T {
        <T as Float>::min(self.abs_tol, self.rel_tol * rhs_norm)
    }

    fn product_tolerance(&self, rtol: T, rnorm: T) -> T {
        if self.inexact {
            rtol / (<T as Scalar>::from_usize(self.max_iter) * rnorm)
        } else {
            T::sqrt_epsilon()
        }
    }

    /// Converts the loop index at exit into the reported outcome.
    fn outcome(&self, iter: usize, flag: Option<KrylovFlag>) -> KrylovOutcome {
        let outcome = match flag {
            Some(flag) => KrylovOutcome {
                iterations: iter + 1,
                flag,
            },
            None => KrylovOutcome {
                iterations: self.max_iter,
                flag: KrylovFlag::MaxIterations,
            },
        };
        debug!(
            "Krylov solve stopped after {} iterations with flag {}",
            outcome.iterations,
            outcome.flag.code()
        );
        outcome
    }
}

/// Preconditioned conjugate gradients.
#[derive(Debug, Clone)]
pub struct ConjugateGradients<T: Scalar> {
    config: KrylovConfig<T>,
}

impl<T: Scalar> ConjugateGradients<T> {
    /// Creates a solver.
    pub fn new(config: KrylovConfig<T>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl<T, V> Krylov<T, V> for ConjugateGradients<T>
where
    T: Scalar,
    V: Vector<T>,
{
    fn run(
        &mut self,
        s: &mut V,
        rhs: &V,
        op: &dyn LinearOperator<T, V>,
        precond: &dyn LinearOperator<T, V>,
    ) -> Result<KrylovOutcome> {
        let cfg = &self.config;
        let mut rnorm = rhs.norm();
        let rtol = cfg.residual_tolerance(rnorm);
        let itol = T::sqrt_epsilon();

        s.zero();
        let mut r = rhs.clone();
        let mut v = rhs.clone();
        precond.apply(&mut v, &r, itol)?;
        let mut p = v.clone();
        let mut hp = rhs.clone();
        let mut rv = v.dot(&r);

        for iter in 0..cfg.max_iter {
            op.apply(&mut hp, &p, cfg.product_tolerance(rtol, rnorm))?;
            let kappa = p.dot(&hp);
            if kappa <= T::zero() {
                return Ok(cfg.outcome(iter, Some(KrylovFlag::NegativeCurvature)));
            }

            let alpha = rv / kappa;
            s.axpy(alpha, &p);
            r.axpy(-alpha, &hp);

            rnorm = r.norm();
            if rnorm < rtol {
                return Ok(cfg.outcome(iter, Some(KrylovFlag::Converged)));
            }

            precond.apply(&mut v, &r, itol)?;
            let previous = rv;
            rv = v.dot(&r);
            p.scale(rv / previous);
            p.plus(&v);
        }

        Ok(cfg.outcome(cfg.max_iter, None))
    }

    fn kind(&self) -> KrylovType {
        KrylovType::ConjugateGradients
    }
}

/// Preconditioned conjugate residuals.
#[derive(Debug, Clone)]
pub struct ConjugateResiduals<T: Scalar> {
    config: KrylovConfig<T>,
}

impl<T: Scalar> ConjugateResiduals<T> {
    /// Creates a solver.
    pub fn new(config: KrylovConfig<T>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl<T, V> Krylov<T, V> for ConjugateResiduals<T>
where
    T: Scalar,
    V: Vector<T>,
{
    fn run(
        &mut self,
        s: &mut V,
        rhs: &V,
        op: &dyn LinearOperator<T, V>,
        precond: &dyn LinearOperator<T, V>,
    ) -> Result<KrylovOutcome> {
        let cfg = &self.config;
        let mut rnorm = rhs.norm();
        let rtol = cfg.residual_tolerance(rnorm);
        let itol = T::sqrt_epsilon();

        s.zero();
        let mut r = rhs.clone();
        let mut z = rhs.clone();
        precond.apply(&mut z, &r, itol)?;

        let mut az = rhs.clone();
        op.apply(&mut az, &z, cfg.product_tolerance(rtol, rnorm))?;
        let mut p = z.clone();
        let mut ap = az.clone();
        let mut map = rhs.clone();
        let mut z_az = z.dot(&az);

        for iter in 0..cfg.max_iter {
            if p.dot(&ap) <= T::zero() || z_az <= T::zero() {
                return Ok(cfg.outcome(iter, Some(KrylovFlag::NegativeCurvature)));
            }

            precond.apply(&mut map, &ap, itol)?;
            let alpha = z_az / ap.dot(&map);
            s.axpy(alpha, &p);
            r.axpy(-alpha, &ap);
            z.axpy(-alpha, &map);

            rnorm = r.norm();
            if rnorm < rtol {
                return Ok(cfg.outcome(iter, Some(KrylovFlag::Converged)));
            }

            op.apply(&mut az, &z, cfg.product_tolerance(rtol, rnorm))?;
            let previous = z_az;
            z_az = z.dot(&az);
            let beta = z_az / previous;
            p.scale(beta);
            p.plus(&z);
            ap.scale(beta);
            ap.plus(&az);
        }

        Ok(cfg.outcome(cfg.max_iter, None))
    }

    fn kind(&self) -> KrylovType {
        KrylovType::ConjugateResiduals
    }
}

/// Builds the solver named by `kind`.
pub fn build_krylov<T, V>(kind: KrylovType, config: KrylovConfig<T>) -> Result<Box<dyn Krylov<T, V>>>
where
    T: Scalar,
    V: Vector<T> + 'static,
{
    Ok(match kind {
        KrylovType::ConjugateGradients => Box::new(ConjugateGradients::new(config)?),
        KrylovType::ConjugateResiduals => Box::new(ConjugateResiduals::new(config)?),
    })
}
