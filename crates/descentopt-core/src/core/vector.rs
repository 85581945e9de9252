//! Vector-space abstraction consumed by every algorithm.
//!
//! The descent step never looks inside a vector: it only clones, scales,
//! adds and takes inner products. Keeping those operations behind
//! [`Vector`] lets the same step drive `nalgebra` vectors, distributed
//! vectors, or function-space discretizations alike.
//!
//! # Mathematical Properties
//!
//! Implementations must obey normed vector-space algebra:
//! - `dot` is symmetric, bilinear and positive definite
//! - `norm(x) = sqrt(dot(x, x))`
//! - `axpy(a, x)` computes `self <- self + a x`

use crate::types::Scalar;
use nalgebra::{allocator::Allocator, DefaultAllocator, Dim, Matrix, OVector};
use num_traits::Float;
use std::fmt::Debug;

/// Element of a Hilbert space on which the optimization takes place.
///
/// `Clone` plays the role of the `clone()` factory: every scratch vector the
/// step allocates is a clone of the iterate.
pub trait Vector<T: Scalar>: Clone + Debug {
    /// Number of degrees of freedom.
    fn dimension(&self) -> usize;

    /// Inner product `<self, other>`.
    fn dot(&self, other: &Self) -> T;

    /// Norm induced by the inner product.
    fn norm(&self) -> T {
        <T as Float>::sqrt(self.dot(self))
    }

    /// In-place scaling `self <- alpha self`.
    fn scale(&mut self, alpha: T);

    /// In-place update `self <- self + alpha x`.
    fn axpy(&mut self, alpha: T, x: &Self);

    /// Copies `x` into `self`.
    fn set(&mut self, x: &Self);

    /// In-place sum `self <- self + x`.
    fn plus(&mut self, x: &Self) {
        self.axpy(T::one(), x);
    }

    /// Sets every component to zero.
    fn zero(&mut self);
}

impl<T, D> Vector<T> for OVector<T, D>
where
    T: Scalar,
    D: Dim,
    DefaultAllocator: Allocator<D>,
{
    fn dimension(&self) -> usize {
        self.len()
    }

    fn dot(&self, other: &Self) -> T {
        Matrix::dot(self, other)
    }

    fn norm(&self) -> T {
        Matrix::norm(self)
    }

    fn scale(&mut self, alpha: T) {
        self.scale_mut(alpha);
    }

    fn axpy(&mut self, alpha: T, x: &Self) {
        Matrix::axpy(self, alpha, x, T::one());
    }

    fn set(&mut self, x: &Self) {
        self.copy_from(x);
    }

    fn plus(&mut self, x: &Self) {
        *self += x;
    }

    fn zero(&mut self) {
        self.fill(T::zero());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DVector, SVector};
    use approx::assert_relative_eq;

    #[test]
    fn test_dvector_algebra() {
        let mut x = DVector::from_vec(vec![1.0, 2.0, 2.0]);
        let y = DVector::from_vec(vec![0.5, -1.0, 0.0]);

        assert_eq!(Vector::dimension(&x), 3);
        assert_relative_eq!(Vector::dot(&x, &y), -1.5);
        assert_relative_eq!(Vector::norm(&x), 3.0);

        Vector::axpy(&mut x, 2.0, &y);
        assert_eq!(x, DVector::from_vec(vec![2.0, 0.0, 2.0]));

        Vector::scale(&mut x, -0.5);
        assert_eq!(x, DVector::from_vec(vec![-1.0, 0.0, -1.0]));

        Vector::plus(&mut x, &y);
        assert_eq!(x, DVector::from_vec(vec![-0.5, -1.0, -1.0]));

        Vector::set(&mut x, &y);
        assert_eq!(x, y);

        Vector::zero(&mut x);
        assert_relative_eq!(Vector::norm(&x), 0.0);
    }

    #[test]
    fn test_static_vector_algebra() {
        let mut x = SVector::<f64, 2>::new(3.0, 4.0);
        assert_relative_eq!(Vector::norm(&x), 5.0);
        Vector::axpy(&mut x, -1.0, &SVector::<f64, 2>::new(3.0, 0.0));
        assert_relative_eq!(Vector::norm(&x), 4.0);
    }
}
