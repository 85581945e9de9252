//! Error types for descent-step optimization.
//!
//! Non-convergence is never an error at this layer: a bad direction is
//! replaced by steepest descent and a failed line search is reported through
//! its result. The variants below cover what cannot be recovered locally,
//! such as invalid configuration or a collaborator lacking an operation.

use thiserror::Error;

/// Errors that can occur while configuring or running an optimization step.
#[derive(Debug, Clone, Error)]
pub enum OptimizerError {
    /// Invalid step configuration.
    ///
    /// This error occurs when a configuration value is out of range or an
    /// option string does not name a known variant.
    #[error("Invalid optimizer configuration: {reason} ({parameter} = {value})")]
    InvalidConfiguration {
        /// Description of the configuration error
        reason: String,
        /// Name of the invalid parameter
        parameter: String,
        /// Value that was invalid
        value: String,
    },

    /// Operation not provided by a collaborator.
    ///
    /// Raised, for example, when Newton descent asks an objective without an
    /// inverse Hessian for `inv_hess_vec`.
    #[error("Feature not implemented: {feature}")]
    NotImplemented {
        /// Name of the unimplemented feature
        feature: String,
    },

    /// Dimension mismatch between vectors.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions
        expected: String,
        /// Actual dimensions
        actual: String,
    },

    /// Numerical failure inside a collaborator.
    #[error("Numerical instability detected: {reason}")]
    NumericalError {
        /// Description of the numerical issue
        reason: String,
    },

    /// A step operation was called out of order.
    #[error("Invalid step state: {reason}")]
    InvalidState {
        /// Description of the state problem
        reason: String,
    },
}

impl OptimizerError {
    /// Create an InvalidConfiguration error.
    pub fn invalid_configuration<S1, S2, S3>(reason: S1, parameter: S2, value: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self::InvalidConfiguration {
            reason: reason.into(),
            parameter: parameter.into(),
            value: value.into(),
        }
    }

    /// Create a NotImplemented error for a specific feature.
    pub fn not_implemented<S: Into<String>>(feature: S) -> Self {
        Self::NotImplemented {
            feature: feature.into(),
        }
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch<S1, S2>(expected: S1, actual: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::DimensionMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a NumericalError with a custom reason.
    pub fn numerical_error<S: Into<String>>(reason: S) -> Self {
        Self::NumericalError {
            reason: reason.into(),
        }
    }

    /// Create an InvalidState error.
    pub fn invalid_state<S: Into<String>>(reason: S) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }
}

/// Result type alias for optimizer operations.
pub type Result<T> = std::result::Result<T, OptimizerError>;
