//! Core traits and types for line-search descent optimization.
//!
//! This crate provides the foundational abstractions a descent step works
//! with: scalars and vectors, the objective, bound constraints, the line
//! search protocol, and the algorithm state passed between a driver and a
//! step. Descent strategies themselves live in `descentopt-optim`.
//!
//! # Key Concepts
//!
//! - **Vectors**: Elements of a Hilbert space, manipulated only through
//!   inner products and linear combinations
//! - **Objectives**: Smooth functions with gradients and optional
//!   second-order information
//! - **Bounds**: Projection plus active/inactive pruning over the
//!   eps-binding set
//! - **Line searches**: Step-length selection under sufficient decrease and
//!   a curvature condition
//!
//! # Modules
//!
//! - [`types`]: Scalar trait, vector aliases and numerical constants
//! - [`error`]: Error types
//! - [`vector`]: Vector-space abstraction
//! - [`objective`]: Objective function interface
//! - [`bounds`]: Bound constraints
//! - [`config`]: Parameter lists and the typed step configuration
//! - [`optimization`]: Line searches, curvature tests and state

pub mod config;
pub mod core;
pub mod optimization;

pub use crate::core::{bounds, error, objective, types, vector};

// Re-export commonly used items at the crate root
pub use error::{OptimizerError, Result};

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use descentopt_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::bounds::{BoundConstraint, BoxConstraint, Unconstrained};
    pub use crate::config::{
        CurvatureCondition, DescentType, KrylovType, LineSearchType, NonlinearCgType,
        ParameterList, ParameterValue, SecantType, StepConfig,
    };
    pub use crate::error::{OptimizerError, Result};
    pub use crate::objective::{CountingObjective, Objective, QuadraticObjective};
    pub use crate::optimization::{
        AlgorithmState, CurvatureLineSearch, CurvatureTest, LineSearch, LineSearchParams,
        LineSearchResult, StepState, Verdict,
    };
    pub use crate::types::{constants, DVector, SVector, Scalar};
    pub use crate::vector::Vector;
}
