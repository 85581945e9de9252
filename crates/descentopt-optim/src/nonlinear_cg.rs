//! Nonlinear conjugate gradient directions.
//!
//! Directions are kept in the step's ascent convention: `run` produces `s`
//! with `-s` the search direction, i.e.
//!
//! ```text
//! s_k = g_k + beta_k s_{k-1}
//! ```
//!
//! With `y = g_k - g_{k-1}` and `p = s_{k-1}`, the update parameter is
//!
//! | Variant | `beta` |
//! |---|---|
//! | Hestenes-Stiefel | `max(-<g, y> / <p, y>, 0)` |
//! | Fletcher-Reeves | `<g, g> / <g_old, g_old>` |
//! | Daniel | `max(-<g, H p> / <p, H p>, 0)` |
//! | Polak-Ribiere | `max(<g, y> / <g_old, g_old>, 0)` |
//! | Fletcher conjugate descent | `<g, g> / <p, g_old>` |
//! | Liu-Storey | `<g, y> / <p, g_old>` |
//! | Dai-Yuan | `-<g, g> / <p, y>` |
//! | Hager-Zhang | `max(-<y - 2 p |y|^2 / <p, y>, g> / <p, y>, eta)` |
//! | Oren-Luenberger | as Hager-Zhang with the factor 2 dropped |
//!
//! where `eta = -1 / (|p| min(0.01, |g_old|))`. The first call, every
//! `restart_period`-th call, and any call whose `beta` is not finite
//! restart with `s = g`.

use descentopt_core::{
    config::NonlinearCgType,
    error::{OptimizerError, Result},
    objective::Objective,
    types::Scalar,
    vector::Vector,
};
use num_traits::Float;

const HAGER_ZHANG_ETA: f64 = 1e-2;

/// Previous gradient and direction.
#[derive(Debug, Clone)]
struct History<V> {
    gradient: V,
    direction: V,
}

/// Nonlinear CG direction generator with its history.
#[derive(Debug, Clone)]
pub struct NonlinearCg<T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    kind: NonlinearCgType,
    restart_period: usize,
    calls: usize,
    history: Option<History<V>>,
    _scalar: std::marker::PhantomData<T>,
}

impl<T, V> NonlinearCg<T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    /// Creates a generator.
    pub fn new(kind: NonlinearCgType, restart_period: usize) -> Result<Self> {
        if restart_period == 0 {
            return Err(OptimizerError::invalid_configuration(
                "must be positive",
                "Restart Period",
                "0",
            ));
        }
        Ok(Self {
            kind,
            restart_period,
            calls: 0,
            history: None,
            _scalar: std::marker::PhantomData,
        })
    }

    /// The variant in use.
    pub fn kind(&self) -> NonlinearCgType {
        self.kind
    }

    /// Forgets the history; the next call restarts with `s = g`.
    pub fn reset(&mut self) {
        self.calls = 0;
        self.history = None;
    }

    /// Writes the next direction into `s` for gradient `g` at `x`.
    pub fn run(&mut self, s: &mut V, g: &V, x: &V, obj: &dyn Objective<T, V>) -> Result<()> {
        let restart = self.calls % self.restart_period == 0;
        self.calls += 1;

        let beta = match (&self.history, restart) {
            (Some(history), false) => self.beta(history, g, x, obj)?,
            _ => T::zero(),
        };

        s.set(g);
        match &mut self.history {
            Some(history) => {
                if beta != T::zero() {
                    s.axpy(beta, &history.direction);
                }
                history.gradient.set(g);
                history.direction.set(s);
            }
            None => {
                self.history = Some(History {
                    gradient: g.clone(),
                    direction: s.clone(),
                });
            }
        }
        Ok(())
    }

    fn beta(&self, history: &History<V>, g: &V, x: &V, obj: &dyn Objective<T, V>) -> Result<T> {
        let zero = T::zero();
        let p = &history.direction;
        let g_old = &history.gradient;

        let mut y = g.clone();
        y.axpy(-T::one(), g_old);

        let beta = match self.kind {
            NonlinearCgType::HestenesStiefel => {
                <T as Float>::max(-g.dot(&y) / p.dot(&y), zero)
            }
            NonlinearCgType::FletcherReeves => g.dot(g) / g_old.dot(g_old),
            NonlinearCgType::Daniel => {
                let mut hp = g.clone();
                obj.hess_vec(&mut hp, p, x, T::sqrt_epsilon())?;
                <T as Float>::max(-g.dot(&hp) / p.dot(&hp), zero)
            }
            NonlinearCgType::PolakRibiere => {
                <T as Float>::max(g.dot(&y) / g_old.dot(g_old), zero)
            }
            NonlinearCgType::FletcherConjugateDescent => g.dot(g) / p.dot(g_old),
            NonlinearCgType::LiuStorey => g.dot(&y) / p.dot(g_old),
            NonlinearCgType::DaiYuan => -g.dot(g) / p.dot(&y),
            NonlinearCgType::HagerZhang | NonlinearCgType::OrenLuenberger => {
                let factor = if self.kind == NonlinearCgType::HagerZhang {
                    T::one() + T::one()
                } else {
                    T::one()
                };
                let py = p.dot(&y);
                let mut yd = y.clone();
                yd.axpy(-factor * y.dot(&y) / py, p);
                let beta = -yd.dot(g) / py;
                let eta_0 = <T as Scalar>::from_f64(HAGER_ZHANG_ETA);
                let eta = -T::one() / (p.norm() * <T as Float>::min(eta_0, g_old.norm()));
                <T as Float>::max(beta, eta)
            }
        };

        Ok(if Float::is_finite(beta) { beta } else { zero })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use descentopt_core::objective::QuadraticObjective;
    use nalgebra::{DMatrix, DVector, Dyn};

    fn quadratic() -> QuadraticObjective<f64, Dyn> {
        let a = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 8.0]);
        QuadraticObjective::new(a, DVector::zeros(2), 0.0)
    }

    #[test]
    fn test_first_call_is_steepest() {
        let obj = quadratic();
        let x = DVector::from_vec(vec![1.0, 1.0]);
        let g = DVector::from_vec(vec![2.0, 8.0]);
        for kind in NonlinearCgType::ALL {
            let mut cg = NonlinearCg::new(*kind, 100).unwrap();
            let mut s = DVector::zeros(2);
            cg.run(&mut s, &g, &x, &obj).unwrap();
            assert_eq!(s, g);
        }
    }

    #[test]
    fn test_fletcher_reeves_update() {
        let obj = quadratic();
        let x = DVector::zeros(2);
        let g0 = DVector::from_vec(vec![2.0, 0.0]);
        let g1 = DVector::from_vec(vec![0.0, 1.0]);
        let mut cg = NonlinearCg::new(NonlinearCgType::FletcherReeves, 100).unwrap();
        let mut s = DVector::zeros(2);
        cg.run(&mut s, &g0, &x, &obj).unwrap();
        cg.run(&mut s, &g1, &x, &obj).unwrap();
        // beta = 1 / 4
        assert_relative_eq!(s, DVector::from_vec(vec![0.5, 1.0]), epsilon = 1e-14);
    }

    #[test]
    fn test_restart_period_one_is_steepest_descent() {
        let obj = quadratic();
        let x = DVector::zeros(2);
        let mut cg = NonlinearCg::new(NonlinearCgType::PolakRibiere, 1).unwrap();
        let mut s = DVector::zeros(2);
        for g in [vec![2.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]] {
            let g = DVector::from_vec(g);
            cg.run(&mut s, &g, &x, &obj).unwrap();
            assert_eq!(s, g);
        }
    }

    #[test]
    fn test_conjugacy_on_quadratic_with_exact_steps() {
        // Exact line search along -s on f = 1/2 x^T A x keeps successive
        // directions A-conjugate for the Hestenes-Stiefel and Daniel updates.
        let obj = quadratic();
        let a = obj.a.clone();
        for kind in [NonlinearCgType::HestenesStiefel, NonlinearCgType::Daniel] {
            let mut cg = NonlinearCg::new(kind, 100).unwrap();
            let mut x = DVector::from_vec(vec![1.0, 1.0]);
            let mut s = DVector::zeros(2);

            let g0 = &a * &x;
            cg.run(&mut s, &g0, &x, &obj).unwrap();
            let s0 = s.clone();
            let t = g0.dot(&s0) / s0.dot(&(&a * &s0));
            x -= t * &s0;

            let g1 = &a * &x;
            cg.run(&mut s, &g1, &x, &obj).unwrap();
            assert!(s0.dot(&(&a * &s)).abs() < 1e-6, "{kind}");
        }
    }

    #[test]
    fn test_zero_restart_period_is_rejected() {
        assert!(NonlinearCg::<f64, DVector<f64>>::new(NonlinearCgType::DaiYuan, 0).is_err());
    }
}
