//! Descentopt - line-search descent optimization for smooth, bound-constrained
//! problems.
//!
//! This facade re-exports the workspace crates:
//!
//! - [`descentopt_core`]: vectors, objectives, bounds, line searches and
//!   configuration
//! - [`descentopt_optim`]: descent strategies, the line-search step and the
//!   driver
//!
//! # Quick Start
//!
//! ```rust
//! use descentopt::prelude::*;
//! use nalgebra::Dyn;
//!
//! let config = StepConfig::new()
//!     .with_descent(DescentType::Secant)
//!     .with_secant(SecantType::Lbfgs);
//! let step = LineSearchStep::<f64, DVector<f64>>::new(config)?;
//! let mut algorithm = Algorithm::new(Box::new(step), StatusTest::default());
//!
//! let mut obj = QuadraticObjective::simple(Dyn(3));
//! let mut x = DVector::from_vec(vec![1.0, -2.0, 0.5]);
//! let result = algorithm.run(&mut x, &mut obj, &Unconstrained)?;
//! assert!(result.converged);
//! # Ok::<(), descentopt::OptimizerError>(())
//! ```

pub use descentopt_core;
pub use descentopt_optim;

pub use descentopt_core::{OptimizerError, Result};

/// Everything needed to configure and run a line-search step.
pub mod prelude {
    pub use descentopt_optim::prelude::*;
}
