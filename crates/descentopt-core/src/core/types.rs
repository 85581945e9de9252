//! Scalar trait, vector aliases and numerical constants.
//!
//! Every algorithm in the workspace is generic over a [`Scalar`] (`f32` or
//! `f64`). The constants gathered here are the defaults the step and its
//! collaborators fall back on when the configuration is silent.

use nalgebra::{Const, Dyn, OVector, RealField, Scalar as NalgebraScalar};
use num_traits::{Float, FromPrimitive};
use std::fmt::{Debug, Display};

/// Trait for scalar types used in optimization (f32 or f64).
///
/// This trait combines all the numeric traits required by the descent
/// strategies, line searches and Krylov solvers.
pub trait Scalar:
    NalgebraScalar
    + RealField
    + Float
    + FromPrimitive
    + Display
    + Debug
    + Default
    + Copy
    + Send
    + Sync
    + 'static
{
    /// Machine epsilon for this scalar type.
    const EPSILON: Self;

    /// Default tolerance for gradient norm convergence.
    const DEFAULT_GRADIENT_TOLERANCE: Self;

    /// Default tolerance on the step norm.
    const DEFAULT_STEP_TOLERANCE: Self;

    /// Step norm reported before the first step has been taken.
    const INITIAL_STEP_NORM: Self;

    /// Convert from f64 (for constants).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails. Use `try_from_f64` for a non-panicking version.
    fn from_f64(v: f64) -> Self {
        <Self as FromPrimitive>::from_f64(v).expect("Failed to convert from f64")
    }

    /// Try to convert from f64.
    fn try_from_f64(v: f64) -> Option<Self> {
        <Self as FromPrimitive>::from_f64(v)
    }

    /// Convert to f64 (for logging/display).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn to_f64(self) -> f64 {
        num_traits::cast(self).expect("Failed to convert to f64")
    }

    /// Convert from usize (for iteration counts).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn from_usize(v: usize) -> Self {
        <Self as FromPrimitive>::from_usize(v).expect("Failed to convert from usize")
    }

    /// Square root of machine epsilon, the default evaluation tolerance.
    fn sqrt_epsilon() -> Self {
        <Self as Float>::sqrt(Self::EPSILON)
    }
}

impl Scalar for f32 {
    const EPSILON: Self = f32::EPSILON;
    const DEFAULT_GRADIENT_TOLERANCE: Self = 1e-5;
    const DEFAULT_STEP_TOLERANCE: Self = 1e-8;
    const INITIAL_STEP_NORM: Self = 1e10;
}

impl Scalar for f64 {
    const EPSILON: Self = f64::EPSILON;
    const DEFAULT_GRADIENT_TOLERANCE: Self = 1e-6;
    const DEFAULT_STEP_TOLERANCE: Self = 1e-12;
    const INITIAL_STEP_NORM: Self = 1e10;
}

/// Type alias for a dynamically-sized vector.
pub type DVector<T> = OVector<T, Dyn>;

/// Type alias for a statically-sized vector.
pub type SVector<T, const N: usize> = OVector<T, Const<N>>;

/// Numerical constants for different precision levels.
pub mod constants {
    use super::Scalar;

    /// Get machine epsilon for the given scalar type.
    pub fn epsilon<T: Scalar>() -> T {
        T::EPSILON
    }

    /// Get default gradient convergence tolerance.
    pub fn gradient_tolerance<T: Scalar>() -> T {
        T::DEFAULT_GRADIENT_TOLERANCE
    }

    /// Get default step-norm tolerance.
    pub fn step_tolerance<T: Scalar>() -> T {
        T::DEFAULT_STEP_TOLERANCE
    }

    /// Inverse golden ratio, the sectioning factor of golden-section search.
    pub fn inverse_golden_ratio<T: Scalar>() -> T {
        <T as Scalar>::from_f64(0.618_033_988_749_895)
    }
}
