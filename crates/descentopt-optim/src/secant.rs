//! Limited-memory secant approximations of the Hessian.
//!
//! A secant operator accumulates curvature pairs
//!
//! ```text
//! s_k = x_{k+1} - x_k,    y_k = g_{k+1} - g_k
//! ```
//!
//! and exposes two linear maps built from them: `apply_h`, an approximation
//! of the inverse Hessian, and `apply_b`, an approximation of the Hessian.
//! Only the `storage` most recent pairs are kept.
//!
//! # Curvature Test
//!
//! A pair is stored only when `<s, y> > eps_machine * ||s||^2`. Pairs failing
//! the test would break positive definiteness of the BFGS family and are
//! dropped with a `debug` log entry.
//!
//! # Variants
//!
//! - **L-BFGS**: two-loop recursion for `H`, compact recursion for `B`,
//!   initial scaling `gamma = <s, y> / <y, y>` from the newest pair
//! - **L-DFP**: the dual of L-BFGS, obtained by exchanging the roles of `s`
//!   and `y`
//! - **L-SR1**: symmetric rank-one recursions from the identity; pairs with
//!   a vanishing denominator are skipped at application time
//! - **Barzilai-Borwein**: scaled identity from the newest pair, type 1
//!   `<s, s> / <s, y>` or type 2 `<s, y> / <y, y>`

use descentopt_core::{
    config::SecantType,
    error::{OptimizerError, Result},
    types::Scalar,
    vector::Vector,
};
use log::debug;
use num_traits::Float;
use std::collections::VecDeque;
use std::fmt::Debug;

/// Interface of a secant approximation.
pub trait Secant<T, V>: Debug
where
    T: Scalar,
    V: Vector<T>,
{
    /// Records the pair `(step, grad - grad_prev)` if it passes the
    /// curvature test.
    fn update(&mut self, grad: &V, grad_prev: &V, step: &V, snorm: T, iter: usize);

    /// Applies the inverse Hessian approximation: `hv = H v`.
    fn apply_h(&self, hv: &mut V, v: &V);

    /// Applies the Hessian approximation: `bv = B v`.
    fn apply_b(&self, bv: &mut V, v: &V);

    /// Which approximation this is.
    fn kind(&self) -> SecantType;

    /// Number of stored pairs.
    fn len(&self) -> usize;

    /// Whether no pair has been stored yet.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every stored pair.
    fn reset(&mut self);
}

/// Storage of curvature pairs shared by the limited-memory variants.
#[derive(Debug, Clone)]
pub struct SecantStorage<T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    /// Maximum number of pairs
    pub capacity: usize,
    /// Iterate differences `s_i`, oldest first
    pub iterate_diff: VecDeque<V>,
    /// Gradient differences `y_i`, oldest first
    pub gradient_diff: VecDeque<V>,
    /// Products `<s_i, y_i>`
    pub products: VecDeque<T>,
    /// Iteration of the newest accepted pair
    pub last_iter: usize,
}

impl<T, V> SecantStorage<T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    /// Creates empty storage for `capacity` pairs.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            iterate_diff: VecDeque::with_capacity(capacity),
            gradient_diff: VecDeque::with_capacity(capacity),
            products: VecDeque::with_capacity(capacity),
            last_iter: 0,
        }
    }

    /// Adds a pair, evicting the oldest one when full.
    ///
    /// Returns `false` when the pair is not stored: it fails the curvature
    /// test, or the capacity is zero.
    pub fn push(&mut self, grad: &V, grad_prev: &V, step: &V, snorm: T, iter: usize) -> bool {
        if self.capacity == 0 {
            return false;
        }

        let mut y = grad.clone();
        y.axpy(-T::one(), grad_prev);
        let sy = step.dot(&y);

        if sy <= T::EPSILON * snorm * snorm {
            debug!(
                "secant pair rejected at iteration {iter}: <s, y> = {:e}",
                sy.to_f64()
            );
            return false;
        }

        if self.products.len() >= self.capacity {
            self.iterate_diff.pop_front();
            self.gradient_diff.pop_front();
            self.products.pop_front();
        }
        self.iterate_diff.push_back(step.clone());
        self.gradient_diff.push_back(y);
        self.products.push_back(sy);
        self.last_iter = iter;
        true
    }

    /// Number of stored pairs.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the storage is empty.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Drops every pair.
    pub fn clear(&mut self) {
        self.iterate_diff.clear();
        self.gradient_diff.clear();
        self.products.clear();
    }

    /// Newest pair.
    fn newest(&self) -> Option<(&V, &V, T)> {
        Some((
            self.iterate_diff.back()?,
            self.gradient_diff.back()?,
            *self.products.back()?,
        ))
    }
}

/// Two-loop recursion applying the BFGS-type inverse built from pairs
/// `(p_i, q_i)` with `<p_i, q_i> = products[i]`, initial scaling
/// `products[newest] / <q, q>`.
fn two_loop<T, V>(out: &mut V, v: &V, p: &VecDeque<V>, q: &VecDeque<V>, products: &VecDeque<T>)
where
    T: Scalar,
    V: Vector<T>,
{
    out.set(v);
    let m = products.len();
    if m == 0 {
        return;
    }

    let mut alpha = vec![T::zero(); m];
    for i in (0..m).rev() {
        alpha[i] = p[i].dot(out) / products[i];
        out.axpy(-alpha[i], &q[i]);
    }

    let newest = m - 1;
    out.scale(products[newest] / q[newest].dot(&q[newest]));

    for i in 0..m {
        let beta = q[i].dot(out) / products[i];
        out.axpy(alpha[i] - beta, &p[i]);
    }
}

/// Compact recursion applying the BFGS-type operator built from pairs
/// `(p_i, q_i)`, with initial scaling `<q, q> / products[newest]`.
fn compact_recursion<T, V>(
    out: &mut V,
    v: &V,
    p: &VecDeque<V>,
    q: &VecDeque<V>,
    products: &VecDeque<T>,
) where
    T: Scalar,
    V: Vector<T>,
{
    out.set(v);
    let m = products.len();
    if m == 0 {
        return;
    }

    let newest = m - 1;
    let scale = q[newest].dot(&q[newest]) / products[newest];
    out.scale(scale);

    // a_i = B_i p_i, where B_i uses the pairs older than i.
    let mut a: Vec<V> = Vec::with_capacity(m);
    let mut pa: Vec<T> = Vec::with_capacity(m);
    for i in 0..m {
        let mut ai = p[i].clone();
        ai.scale(scale);
        for j in 0..i {
            ai.axpy(q[j].dot(&p[i]) / products[j], &q[j]);
            ai.axpy(-(a[j].dot(&p[i]) / pa[j]), &a[j]);
        }
        pa.push(p[i].dot(&ai));
        a.push(ai);
    }

    for i in 0..m {
        out.axpy(q[i].dot(v) / products[i], &q[i]);
        out.axpy(-(a[i].dot(v) / pa[i]), &a[i]);
    }
}

/// Symmetric rank-one recursion from the identity over pairs `(p_i, q_i)`,
/// applying the operator `M` with `M p_i = q_i`.
fn rank_one_recursion<T, V>(out: &mut V, v: &V, p: &VecDeque<V>, q: &VecDeque<V>)
where
    T: Scalar,
    V: Vector<T>,
{
    let m = p.len();
    let tol = T::sqrt_epsilon();

    let mut u: Vec<V> = Vec::with_capacity(m);
    let mut up: Vec<T> = Vec::with_capacity(m);
    for i in 0..m {
        // u_i = q_i - M_i p_i
        let mut mp = p[i].clone();
        for j in 0..i {
            if up[j] != T::zero() {
                mp.axpy(u[j].dot(&p[i]) / up[j], &u[j]);
            }
        }
        let mut ui = q[i].clone();
        ui.axpy(-T::one(), &mp);
        let denom = ui.dot(&p[i]);
        let skip = <T as Float>::abs(denom) <= tol * ui.norm() * p[i].norm();
        up.push(if skip { T::zero() } else { denom });
        u.push(ui);
    }

    out.set(v);
    for i in 0..m {
        if up[i] != T::zero() {
            out.axpy(u[i].dot(v) / up[i], &u[i]);
        }
    }
}

/// Limited-memory BFGS.
#[derive(Debug, Clone)]
pub struct Lbfgs<T: Scalar, V: Vector<T>> {
    storage: SecantStorage<T, V>,
}

impl<T: Scalar, V: Vector<T>> Lbfgs<T, V> {
    /// Creates an L-BFGS operator keeping `storage` pairs.
    pub fn new(storage: usize) -> Self {
        Self {
            storage: SecantStorage::new(storage),
        }
    }

    /// Stored pairs.
    pub fn storage(&self) -> &SecantStorage<T, V> {
        &self.storage
    }
}

impl<T: Scalar, V: Vector<T>> Secant<T, V> for Lbfgs<T, V> {
    fn update(&mut self, grad: &V, grad_prev: &V, step: &V, snorm: T, iter: usize) {
        self.storage.push(grad, grad_prev, step, snorm, iter);
    }

    fn apply_h(&self, hv: &mut V, v: &V) {
        let st = &self.storage;
        two_loop(hv, v, &st.iterate_diff, &st.gradient_diff, &st.products);
    }

    fn apply_b(&self, bv: &mut V, v: &V) {
        let st = &self.storage;
        compact_recursion(bv, v, &st.iterate_diff, &st.gradient_diff, &st.products);
    }

    fn kind(&self) -> SecantType {
        SecantType::Lbfgs
    }

    fn len(&self) -> usize {
        self.storage.len()
    }

    fn reset(&mut self) {
        self.storage.clear();
    }
}

/// Limited-memory DFP.
#[derive(Debug, Clone)]
pub struct Ldfp<T: Scalar, V: Vector<T>> {
    storage: SecantStorage<T, V>,
}

impl<T: Scalar, V: Vector<T>> Ldfp<T, V> {
    /// Creates an L-DFP operator keeping `storage` pairs.
    pub fn new(storage: usize) -> Self {
        Self {
            storage: SecantStorage::new(storage),
        }
    }
}

impl<T: Scalar, V: Vector<T>> Secant<T, V> for Ldfp<T, V> {
    fn update(&mut self, grad: &V, grad_prev: &V, step: &V, snorm: T, iter: usize) {
        self.storage.push(grad, grad_prev, step, snorm, iter);
    }

    fn apply_h(&self, hv: &mut V, v: &V) {
        let st = &self.storage;
        compact_recursion(hv, v, &st.gradient_diff, &st.iterate_diff, &st.products);
    }

    fn apply_b(&self, bv: &mut V, v: &V) {
        let st = &self.storage;
        two_loop(bv, v, &st.gradient_diff, &st.iterate_diff, &st.products);
    }

    fn kind(&self) -> SecantType {
        SecantType::Ldfp
    }

    fn len(&self) -> usize {
        self.storage.len()
    }

    fn reset(&mut self) {
        self.storage.clear();
    }
}

/// Limited-memory symmetric rank one.
#[derive(Debug, Clone)]
pub struct Lsr1<T: Scalar, V: Vector<T>> {
    storage: SecantStorage<T, V>,
}

impl<T: Scalar, V: Vector<T>> Lsr1<T, V> {
    /// Creates an L-SR1 operator keeping `storage` pairs.
    pub fn new(storage: usize) -> Self {
        Self {
            storage: SecantStorage::new(storage),
        }
    }
}

impl<T: Scalar, V: Vector<T>> Secant<T, V> for Lsr1<T, V> {
    fn update(&mut self, grad: &V, grad_prev: &V, step: &V, snorm: T, iter: usize) {
        self.storage.push(grad, grad_prev, step, snorm, iter);
    }

    fn apply_h(&self, hv: &mut V, v: &V) {
        let st = &self.storage;
        rank_one_recursion(hv, v, &st.gradient_diff, &st.iterate_diff);
    }

    fn apply_b(&self, bv: &mut V, v: &V) {
        let st = &self.storage;
        rank_one_recursion(bv, v, &st.iterate_diff, &st.gradient_diff);
    }

    fn kind(&self) -> SecantType {
        SecantType::Lsr1
    }

    fn len(&self) -> usize {
        self.storage.len()
    }

    fn reset(&mut self) {
        self.storage.clear();
    }
}

/// Barzilai-Borwein scaled identity.
#[derive(Debug, Clone)]
pub struct BarzilaiBorwein<T: Scalar, V: Vector<T>> {
    storage: SecantStorage<T, V>,
    formula: usize,
}

impl<T: Scalar, V: Vector<T>> BarzilaiBorwein<T, V> {
    /// Creates a Barzilai-Borwein operator using step formula 1 or 2.
    pub fn new(formula: usize) -> Result<Self> {
        if !matches!(formula, 1 | 2) {
            return Err(OptimizerError::invalid_configuration(
                "must be 1 or 2",
                "Barzilai-Borwein Type",
                formula.to_string(),
            ));
        }
        Ok(Self {
            storage: SecantStorage::new(1),
            formula,
        })
    }

    /// Scaling of the inverse Hessian approximation `H = h I`.
    fn inverse_scale(&self) -> T {
        match self.storage.newest() {
            None => T::one(),
            Some((s, _, sy)) if self.formula == 1 => s.dot(s) / sy,
            Some((_, y, sy)) => sy / y.dot(y),
        }
    }
}

impl<T: Scalar, V: Vector<T>> Secant<T, V> for BarzilaiBorwein<T, V> {
    fn update(&mut self, grad: &V, grad_prev: &V, step: &V, snorm: T, iter: usize) {
        self.storage.push(grad, grad_prev, step, snorm, iter);
    }

    fn apply_h(&self, hv: &mut V, v: &V) {
        hv.set(v);
        hv.scale(self.inverse_scale());
    }

    fn apply_b(&self, bv: &mut V, v: &V) {
        bv.set(v);
        bv.scale(T::one() / self.inverse_scale());
    }

    fn kind(&self) -> SecantType {
        SecantType::BarzilaiBorwein
    }

    fn len(&self) -> usize {
        self.storage.len()
    }

    fn reset(&mut self) {
        self.storage.clear();
    }
}

/// Builds the secant operator named by `kind`.
///
/// `storage` is ignored by Barzilai-Borwein, `bb_type` by the others.
pub fn build_secant<T, V>(
    kind: SecantType,
    storage: usize,
    bb_type: usize,
) -> Result<Box<dyn Secant<T, V>>>
where
    T: Scalar,
    V: Vector<T> + 'static,
{
    if storage == 0 {
        return Err(OptimizerError::invalid_configuration(
            "must be positive",
            "Maximum Secant Storage",
            "0",
        ));
    }
    Ok(match kind {
        SecantType::Lbfgs => Box::new(Lbfgs::new(storage)),
        SecantType::Ldfp => Box::new(Ldfp::new(storage)),
        SecantType::Lsr1 => Box::new(Lsr1::new(storage)),
        SecantType::BarzilaiBorwein => Box::new(BarzilaiBorwein::new(bb_type)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, DVector};

    /// Feeds the pairs produced by steps on the quadratic with Hessian `a`.
    fn feed(secant: &mut dyn Secant<f64, DVector<f64>>, a: &DMatrix<f64>, steps: &[[f64; 3]]) {
        let mut x = DVector::from_vec(vec![1.0, 1.0, 1.0]);
        let mut g = a * &x;
        for (k, step) in steps.iter().enumerate() {
            let s = DVector::from_row_slice(step);
            x += &s;
            let g_new = a * &x;
            secant.update(&g_new, &g, &s, s.norm(), k + 1);
            g = g_new;
        }
    }

    fn spd() -> DMatrix<f64> {
        DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.0, 1.0, 3.0, 0.5, 0.0, 0.5, 2.0])
    }

    const STEPS: [[f64; 3]; 3] = [[0.5, -0.2, 0.1], [-0.1, 0.3, 0.2], [0.2, 0.1, -0.4]];

    #[test]
    fn test_secant_equations_hold_for_newest_pair() {
        let a = spd();
        for kind in SecantType::ALL {
            if *kind == SecantType::BarzilaiBorwein {
                continue;
            }
            let mut secant = build_secant::<f64, DVector<f64>>(*kind, 5, 1).unwrap();
            feed(secant.as_mut(), &a, &STEPS);
            assert_eq!(secant.len(), 3);

            let s = DVector::from_row_slice(&STEPS[2]);
            let y = &a * &s;
            let mut bs = DVector::zeros(3);
            secant.apply_b(&mut bs, &s);
            assert_relative_eq!(bs, y, epsilon = 1e-10);

            let mut hy = DVector::zeros(3);
            secant.apply_h(&mut hy, &y);
            assert_relative_eq!(hy, s, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_h_and_b_are_inverse() {
        let a = spd();
        let v = DVector::from_vec(vec![0.3, -1.0, 2.0]);
        for kind in [SecantType::Lbfgs, SecantType::Ldfp] {
            let mut secant = build_secant::<f64, DVector<f64>>(kind, 5, 1).unwrap();
            feed(secant.as_mut(), &a, &STEPS);
            let mut bv = DVector::zeros(3);
            secant.apply_b(&mut bv, &v);
            let mut hbv = DVector::zeros(3);
            secant.apply_h(&mut hbv, &bv);
            assert_relative_eq!(hbv, v, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_storage_evicts_oldest() {
        let a = spd();
        let mut secant = Lbfgs::<f64, DVector<f64>>::new(2);
        feed(&mut secant, &a, &STEPS);
        assert_eq!(secant.len(), 2);
        assert_eq!(
            secant.storage().iterate_diff[0],
            DVector::from_row_slice(&STEPS[1])
        );
        assert_eq!(secant.storage().last_iter, 3);

        secant.reset();
        assert!(secant.is_empty());
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let a = spd();
        let many: Vec<[f64; 3]> = STEPS.iter().cycle().take(30).copied().collect();
        let mut secants: Vec<Box<dyn Secant<f64, DVector<f64>>>> = vec![
            Box::new(Lbfgs::new(0)),
            Box::new(Ldfp::new(0)),
            Box::new(Lsr1::new(0)),
        ];
        for secant in secants.iter_mut() {
            feed(secant.as_mut(), &a, &many);
            assert_eq!(secant.len(), 0, "{}", secant.kind());

            let v = DVector::from_vec(vec![0.3, -1.0, 2.0]);
            let mut hv = DVector::zeros(3);
            secant.apply_h(&mut hv, &v);
            assert_eq!(hv, v);
        }
    }

    #[test]
    fn test_curvature_test_rejects_negative_pairs() {
        let mut secant = Lbfgs::<f64, DVector<f64>>::new(5);
        let s = DVector::from_vec(vec![1.0, 0.0]);
        let g_prev = DVector::from_vec(vec![1.0, 0.0]);
        let g = DVector::from_vec(vec![0.0, 0.0]);
        secant.update(&g, &g_prev, &s, 1.0, 1);
        assert!(secant.is_empty());

        // An empty operator is the identity.
        let v = DVector::from_vec(vec![2.0, -3.0]);
        let mut hv = DVector::zeros(2);
        secant.apply_h(&mut hv, &v);
        assert_eq!(hv, v);
    }

    #[test]
    fn test_barzilai_borwein_scalings() {
        let s = DVector::from_vec(vec![1.0, 1.0]);
        let g_prev = DVector::zeros(2);
        let g = DVector::from_vec(vec![2.0, 0.0]);
        let v = DVector::from_vec(vec![1.0, 2.0]);
        let mut hv = DVector::zeros(2);

        // <s, s> = 2, <s, y> = 2, <y, y> = 4
        let mut bb1 = BarzilaiBorwein::<f64, DVector<f64>>::new(1).unwrap();
        bb1.update(&g, &g_prev, &s, 2.0_f64.sqrt(), 1);
        bb1.apply_h(&mut hv, &v);
        assert_relative_eq!(hv, v.clone() * 1.0);

        let mut bb2 = BarzilaiBorwein::<f64, DVector<f64>>::new(2).unwrap();
        bb2.update(&g, &g_prev, &s, 2.0_f64.sqrt(), 1);
        bb2.apply_h(&mut hv, &v);
        assert_relative_eq!(hv, v.clone() * 0.5);
        let mut bv = DVector::zeros(2);
        bb2.apply_b(&mut bv, &v);
        assert_relative_eq!(bv, v * 2.0);

        assert!(BarzilaiBorwein::<f64, DVector<f64>>::new(3).is_err());
    }
}
