//! Second-order operators restricted to the free variables.
//!
//! Under active bounds the step works with reduced operators: for an
//! operator `A`, a point `p` and a direction `d` (usually the gradient),
//!
//! ```text
//! A_red v = prune_active(A prune_active(v, d, p, eps), d, p, eps)
//!         + prune_inactive(v, d, p, eps)
//! ```
//!
//! so `A` acts on the free variables and the identity acts on the
//! eps-binding ones. Without active bounds the reduced operator is `A`.
//!
//! The underlying Hessian and preconditioner are taken either from the
//! objective or, when requested, from a secant model.

use crate::{krylov::LinearOperator, secant::Secant};
use descentopt_core::{
    bounds::BoundConstraint, error::Result, objective::Objective, types::Scalar, vector::Vector,
};

/// Objective view that applies bound pruning and optional secant models.
#[derive(Debug)]
pub struct ProjectedObjective<'a, T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    obj: &'a dyn Objective<T, V>,
    bounds: &'a dyn BoundConstraint<T, V>,
    secant: Option<&'a dyn Secant<T, V>>,
    use_secant_precond: bool,
    use_secant_hess_vec: bool,
    eps: T,
}

impl<'a, T, V> ProjectedObjective<'a, T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    /// Creates a view with binding tolerance `eps`.
    ///
    /// The secant flags have no effect when `secant` is `None`.
    pub fn new(
        obj: &'a dyn Objective<T, V>,
        bounds: &'a dyn BoundConstraint<T, V>,
        secant: Option<&'a dyn Secant<T, V>>,
        use_secant_precond: bool,
        use_secant_hess_vec: bool,
        eps: T,
    ) -> Self {
        Self {
            obj,
            bounds,
            secant,
            use_secant_precond,
            use_secant_hess_vec,
            eps,
        }
    }

    fn secant_model(&self, enabled: bool) -> Option<&'a dyn Secant<T, V>> {
        self.secant.filter(|_| enabled)
    }

    /// `H v`, from the secant's `B` when the secant Hessian is in use.
    pub fn hess_vec(&self, hv: &mut V, v: &V, x: &V, tol: T) -> Result<()> {
        match self.secant_model(self.use_secant_hess_vec) {
            Some(secant) => {
                secant.apply_b(hv, v);
                Ok(())
            }
            None => self.obj.hess_vec(hv, v, x, tol),
        }
    }

    /// `H^{-1} v`, from the secant's `H` when the secant Hessian is in use.
    pub fn inv_hess_vec(&self, hv: &mut V, v: &V, x: &V, tol: T) -> Result<()> {
        match self.secant_model(self.use_secant_hess_vec) {
            Some(secant) => {
                secant.apply_h(hv, v);
                Ok(())
            }
            None => self.obj.inv_hess_vec(hv, v, x, tol),
        }
    }

    /// Preconditioner, the secant's `H` when secant preconditioning is on.
    pub fn precond(&self, pv: &mut V, v: &V, x: &V, tol: T) -> Result<()> {
        match self.secant_model(self.use_secant_precond) {
            Some(secant) => {
                secant.apply_h(pv, v);
                Ok(())
            }
            None => self.obj.precond(pv, v, x, tol),
        }
    }

    fn reduce<F>(&self, out: &mut V, v: &V, p: &V, d: &V, op: F) -> Result<()>
    where
        F: FnOnce(&mut V, &V) -> Result<()>,
    {
        if !self.bounds.is_activated() {
            return op(out, v);
        }

        let mut free = v.clone();
        self.bounds.prune_active(&mut free, d, p, self.eps);
        op(out, &free)?;
        self.bounds.prune_active(out, d, p, self.eps);

        let mut binding = v.clone();
        self.bounds.prune_inactive(&mut binding, d, p, self.eps);
        out.plus(&binding);
        Ok(())
    }

    /// Reduced Hessian-vector product at `x`, pruned around point `p` and
    /// direction `d`.
    pub fn reduced_hess_vec(&self, hv: &mut V, v: &V, p: &V, d: &V, x: &V, tol: T) -> Result<()> {
        self.reduce(hv, v, p, d, |out, w| self.hess_vec(out, w, x, tol))
    }

    /// Reduced inverse Hessian-vector product.
    pub fn reduced_inv_hess_vec(
        &self,
        hv: &mut V,
        v: &V,
        p: &V,
        d: &V,
        x: &V,
        tol: T,
    ) -> Result<()> {
        self.reduce(hv, v, p, d, |out, w| self.inv_hess_vec(out, w, x, tol))
    }

    /// Reduced preconditioner.
    pub fn reduced_precond(&self, pv: &mut V, v: &V, p: &V, d: &V, x: &V, tol: T) -> Result<()> {
        self.reduce(pv, v, p, d, |out, w| self.precond(out, w, x, tol))
    }

    /// The reduced Hessian at `x`, pruned with respect to gradient `g`, as
    /// a Krylov operator.
    pub fn reduced_hessian(&'a self, x: &'a V, g: &'a V) -> ReducedHessian<'a, T, V> {
        ReducedHessian { pobj: self, x, g }
    }

    /// The reduced preconditioner at `x` as a Krylov operator.
    pub fn reduced_preconditioner(&'a self, x: &'a V, g: &'a V) -> ReducedPreconditioner<'a, T, V> {
        ReducedPreconditioner { pobj: self, x, g }
    }
}

/// Reduced Hessian at a fixed point.
#[derive(Debug)]
pub struct ReducedHessian<'a, T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    pobj: &'a ProjectedObjective<'a, T, V>,
    x: &'a V,
    g: &'a V,
}

impl<T, V> LinearOperator<T, V> for ReducedHessian<'_, T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    fn apply(&self, out: &mut V, v: &V, tol: T) -> Result<()> {
        self.pobj.reduced_hess_vec(out, v, self.x, self.g, self.x, tol)
    }
}

/// Reduced preconditioner at a fixed point.
#[derive(Debug)]
pub struct ReducedPreconditioner<'a, T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    pobj: &'a ProjectedObjective<'a, T, V>,
    x: &'a V,
    g: &'a V,
}

impl<T, V> LinearOperator<T, V> for ReducedPreconditioner<'_, T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    fn apply(&self, out: &mut V, v: &V, tol: T) -> Result<()> {
        self.pobj.reduced_precond(out, v, self.x, self.g, self.x, tol)
    }
}
