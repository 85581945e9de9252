//! Descentopt Optim - line-search descent steps for smooth, bound-constrained
//! optimization.
//!
//! This crate builds the descent step on top of the abstractions in
//! `descentopt-core`: the direction strategies, the reduced operators used
//! under bounds, and the driver loop.
//!
//! # Available Descent Types
//!
//! - **Steepest descent**: `s = g`
//! - **Nonlinear CG**: nine `beta` formulas with periodic restarts
//! - **Quasi-Newton**: L-BFGS, L-DFP, L-SR1 or Barzilai-Borwein inverse
//!   Hessians
//! - **Newton**: the objective's inverse Hessian
//! - **Newton-Krylov**: Conjugate Gradients or Conjugate Residuals on the
//!   reduced Hessian, optionally secant-preconditioned
//!
//! A direction that fails to descend is replaced by steepest descent.
//!
//! # Examples
//!
//! ```rust
//! use descentopt_core::prelude::*;
//! use descentopt_optim::{Algorithm, LineSearchStep, StatusTest};
//! use nalgebra::Dyn;
//!
//! let config = StepConfig::new().with_descent(DescentType::SteepestDescent);
//! let step = LineSearchStep::<f64, DVector<f64>>::new(config).unwrap();
//! let mut algorithm = Algorithm::new(Box::new(step), StatusTest::default());
//!
//! let mut obj = QuadraticObjective::simple(Dyn(2));
//! let mut x = DVector::from_vec(vec![3.0, -4.0]);
//! let result = algorithm.run(&mut x, &mut obj, &Unconstrained).unwrap();
//! assert!(result.converged);
//! ```

pub mod algorithm;
pub mod descent;
pub mod krylov;
pub mod line_search_step;
pub mod nonlinear_cg;
pub mod projected_objective;
pub mod secant;
pub mod step;

pub use algorithm::{Algorithm, OptimizationResult, StatusTest, TerminationReason};
pub use descent::DescentStrategy;
pub use krylov::{
    build_krylov, ConjugateGradients, ConjugateResiduals, IdentityOperator, Krylov,
    KrylovConfig, KrylovFlag, KrylovOutcome, LinearOperator,
};
pub use line_search_step::LineSearchStep;
pub use nonlinear_cg::NonlinearCg;
pub use projected_objective::ProjectedObjective;
pub use secant::{build_secant, BarzilaiBorwein, Lbfgs, Ldfp, Lsr1, Secant, SecantStorage};
pub use step::Step;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        Algorithm, DescentStrategy, Krylov, KrylovFlag, LineSearchStep, OptimizationResult,
        Secant, StatusTest, Step, TerminationReason,
    };
    pub use descentopt_core::prelude::*;
}
