//! Bound constraints and the active-set operations built on them.
//!
//! A bound constraint `l <= x <= u` enters the step through four operations:
//!
//! - **Projection** `P(x)`: componentwise clamp onto the feasible box
//! - **Active pruning**: zero the components of a vector on the eps-binding
//!   set, i.e. where the iterate sits within `eps` of a bound and the
//!   gradient pushes it outward
//! - **Inactive pruning**: zero the complement of the eps-binding set
//! - **Projected gradient**: the gradient with its binding components
//!   removed, `prune_active(g, g, x, 0)`
//!
//! # Binding Set
//!
//! Component `i` is eps-binding at `x` for the gradient `g` when
//!
//! ```text
//! (x_i <= l_i + eps and g_i > 0) or (x_i >= u_i - eps and g_i < 0)
//! ```
//!
//! The effective `eps` is capped at half the narrowest gap `min(u - l) / 2`
//! so that no component is ever binding on both sides.

use crate::{
    error::{OptimizerError, Result},
    types::Scalar,
    vector::Vector,
};
use nalgebra::{allocator::Allocator, DefaultAllocator, Dim, OVector};
use num_traits::Float;
use std::fmt::Debug;

/// Feasible set described by simple bounds.
pub trait BoundConstraint<T, V>: Debug
where
    T: Scalar,
    V: Vector<T>,
{
    /// Whether the constraint participates in the optimization.
    ///
    /// An inactive constraint is treated as absent: no projection, no pruning.
    fn is_activated(&self) -> bool;

    /// Projects `x` onto the feasible set in place.
    fn project(&self, x: &mut V);

    /// Zeros the components of `v` on the eps-binding set of `(x, g)`.
    fn prune_active(&self, v: &mut V, g: &V, x: &V, eps: T);

    /// Zeros the components of `v` off the eps-binding set of `(x, g)`.
    fn prune_inactive(&self, v: &mut V, g: &V, x: &V, eps: T);

    /// Replaces `g` by the projected gradient at `x`.
    fn compute_projected_gradient(&self, g: &mut V, x: &V) {
        let gradient = g.clone();
        self.prune_active(g, &gradient, x, T::zero());
    }

    /// Whether `x` lies in the feasible set.
    fn is_feasible(&self, x: &V) -> bool;
}

/// The absence of constraints.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconstrained;

impl<T, V> BoundConstraint<T, V> for Unconstrained
where
    T: Scalar,
    V: Vector<T>,
{
    fn is_activated(&self) -> bool {
        false
    }

    fn project(&self, _x: &mut V) {}

    fn prune_active(&self, _v: &mut V, _g: &V, _x: &V, _eps: T) {}

    fn prune_inactive(&self, _v: &mut V, _g: &V, _x: &V, _eps: T) {}

    fn is_feasible(&self, _x: &V) -> bool {
        true
    }
}

/// Box constraint `lower <= x <= upper` on `nalgebra` vectors.
#[derive(Debug, Clone)]
pub struct BoxConstraint<T, D>
where
    T: Scalar,
    D: Dim,
    DefaultAllocator: Allocator<D>,
{
    lower: OVector<T, D>,
    upper: OVector<T, D>,
    min_half_gap: T,
    activated: bool,
}

impl<T, D> BoxConstraint<T, D>
where
    T: Scalar,
    D: Dim,
    DefaultAllocator: Allocator<D>,
{
    /// Creates an activated box constraint.
    ///
    /// # Errors
    ///
    /// Fails when the bounds differ in length or some `lower_i > upper_i`.
    pub fn new(lower: OVector<T, D>, upper: OVector<T, D>) -> Result<Self> {
        if lower.len() != upper.len() {
            return Err(OptimizerError::dimension_mismatch(lower.len(), upper.len()));
        }
        if let Some(i) = (0..lower.len()).find(|&i| lower[i] > upper[i]) {
            return Err(OptimizerError::invalid_configuration(
                "lower bound exceeds upper bound",
                format!("bounds[{i}]"),
                format!("[{}, {}]", lower[i], upper[i]),
            ));
        }

        let half = <T as Scalar>::from_f64(0.5);
        let min_half_gap = lower
            .iter()
            .zip(upper.iter())
            .map(|(&l, &u)| half * (u - l))
            .fold(<T as Float>::infinity(), <T as Float>::min);

        Ok(Self {
            lower,
            upper,
            min_half_gap,
            activated: true,
        })
    }

    /// Creates a constraint bounded below only.
    pub fn lower_only(lower: OVector<T, D>) -> Result<Self> {
        let upper = lower.map(|_| <T as Float>::infinity());
        Self::new(lower, upper)
    }

    /// Creates a constraint bounded above only.
    pub fn upper_only(upper: OVector<T, D>) -> Result<Self> {
        let lower = upper.map(|_| <T as Float>::neg_infinity());
        Self::new(lower, upper)
    }

    /// Lower bounds.
    pub fn lower(&self) -> &OVector<T, D> {
        &self.lower
    }

    /// Upper bounds.
    pub fn upper(&self) -> &OVector<T, D> {
        &self.upper
    }

    /// Turns the constraint on.
    pub fn activate(&mut self) {
        self.activated = true;
    }

    /// Turns the constraint off; it then behaves like [`Unconstrained`].
    pub fn deactivate(&mut self) {
        self.activated = false;
    }

    fn effective_eps(&self, eps: T) -> T {
        <T as Float>::min(eps, self.min_half_gap)
    }

    fn is_binding(&self, i: usize, g: T, x: T, eps: T) -> bool {
        (x <= self.lower[i] + eps && g > T::zero()) || (x >= self.upper[i] - eps && g < T::zero())
    }
}

impl<T, D> BoundConstraint<T, OVector<T, D>> for BoxConstraint<T, D>
where
    T: Scalar,
    D: Dim,
    DefaultAllocator: Allocator<D>,
{
    fn is_activated(&self) -> bool {
        self.activated
    }

    fn project(&self, x: &mut OVector<T, D>) {
        if !self.activated {
            return;
        }
        for i in 0..x.len() {
            x[i] = num_traits::clamp(x[i], self.lower[i], self.upper[i]);
        }
    }

    fn prune_active(&self, v: &mut OVector<T, D>, g: &OVector<T, D>, x: &OVector<T, D>, eps: T) {
        if !self.activated {
            return;
        }
        let eps = self.effective_eps(eps);
        for i in 0..v.len() {
            if self.is_binding(i, g[i], x[i], eps) {
                v[i] = T::zero();
            }
        }
    }

    fn prune_inactive(&self, v: &mut OVector<T, D>, g: &OVector<T, D>, x: &OVector<T, D>, eps: T) {
        if !self.activated {
            return;
        }
        let eps = self.effective_eps(eps);
        for i in 0..v.len() {
            if !self.is_binding(i, g[i], x[i], eps) {
                v[i] = T::zero();
            }
        }
    }

    fn is_feasible(&self, x: &OVector<T, D>) -> bool {
        !self.activated
            || (0..x.len()).all(|i| x[i] >= self.lower[i] && x[i] <= self.upper[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DVector;
    use proptest::prelude::*;

    fn unit_box() -> BoxConstraint<f64, nalgebra::Dyn> {
        BoxConstraint::new(DVector::from_vec(vec![0.0, 0.0]), DVector::from_vec(vec![1.0, 1.0]))
            .unwrap()
    }

    #[test]
    fn test_projection_clamps_componentwise() {
        let bounds = unit_box();
        let mut x = DVector::from_vec(vec![-0.5, 1.5]);
        bounds.project(&mut x);
        assert_eq!(x, DVector::from_vec(vec![0.0, 1.0]));
        assert!(bounds.is_feasible(&x));
    }

    #[test]
    fn test_invalid_bounds_are_rejected() {
        let result = BoxConstraint::new(DVector::from_vec(vec![2.0]), DVector::from_vec(vec![1.0]));
        assert!(matches!(
            result,
            Err(OptimizerError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_pruning_splits_binding_set() {
        let bounds = unit_box();
        // First component sits on the lower bound with an outward gradient.
        let x = DVector::from_vec(vec![0.0, 0.5]);
        let g = DVector::from_vec(vec![1.0, 1.0]);

        let mut active = DVector::from_vec(vec![3.0, 4.0]);
        bounds.prune_active(&mut active, &g, &x, 0.0);
        assert_eq!(active, DVector::from_vec(vec![0.0, 4.0]));

        let mut inactive = DVector::from_vec(vec![3.0, 4.0]);
        bounds.prune_inactive(&mut inactive, &g, &x, 0.0);
        assert_eq!(inactive, DVector::from_vec(vec![3.0, 0.0]));
    }

    #[test]
    fn test_eps_is_capped_by_half_gap() {
        let bounds = unit_box();
        // With eps = 10 every component would be binding on both sides;
        // the cap at 0.5 keeps x = 0.75 away from the lower bound.
        let x = DVector::from_vec(vec![0.75, 0.25]);
        let g = DVector::from_vec(vec![1.0, 1.0]);
        let mut v = DVector::from_vec(vec![1.0, 1.0]);
        bounds.prune_active(&mut v, &g, &x, 10.0);
        assert_eq!(v, DVector::from_vec(vec![1.0, 0.0]));
    }

    #[test]
    fn test_projected_gradient() {
        let bounds =
            BoxConstraint::lower_only(DVector::from_vec(vec![1.0, 1.0])).unwrap();
        let x = DVector::from_vec(vec![1.0, 2.0]);
        let mut g = DVector::from_vec(vec![0.5, 0.5]);
        bounds.compute_projected_gradient(&mut g, &x);
        assert_eq!(g, DVector::from_vec(vec![0.0, 0.5]));
    }

    #[test]
    fn test_deactivated_box_is_transparent() {
        let mut bounds = unit_box();
        bounds.deactivate();
        let mut x = DVector::from_vec(vec![5.0, -5.0]);
        bounds.project(&mut x);
        assert_eq!(x, DVector::from_vec(vec![5.0, -5.0]));
        assert!(bounds.is_feasible(&x));

        bounds.activate();
        assert!(!bounds.is_feasible(&x));
    }

    #[test]
    fn test_unconstrained_is_noop() {
        let x = DVector::from_vec(vec![1.0, 2.0]);
        let mut v = x.clone();
        BoundConstraint::<f64, DVector<f64>>::prune_active(&Unconstrained, &mut v, &x, &x, 1.0);
        assert_eq!(v, x);
        assert!(!BoundConstraint::<f64, DVector<f64>>::is_activated(&Unconstrained));
    }

    proptest! {
        #[test]
        fn prop_projection_is_idempotent(
            x in prop::collection::vec(-10.0..10.0f64, 3),
            s in prop::collection::vec(-10.0..10.0f64, 3),
            t in 0.0..4.0f64,
        ) {
            let bounds = BoxConstraint::new(
                DVector::from_vec(vec![-1.0, 0.0, 2.0]),
                DVector::from_vec(vec![1.0, 5.0, 2.5]),
            ).unwrap();

            let mut trial = DVector::from_vec(x);
            trial.axpy(t, &DVector::from_vec(s), 1.0);
            bounds.project(&mut trial);
            let once = trial.clone();
            bounds.project(&mut trial);

            prop_assert_eq!(once, trial.clone());
            prop_assert!(bounds.is_feasible(&trial));
        }
    }
}
