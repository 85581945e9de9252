//! Line-search step: descent direction, 1-D search, projected update.
//!
//! Each iteration of [`LineSearchStep`]
//!
//! 1. builds a direction `s` in the ascent convention from the configured
//!    [`DescentStrategy`],
//! 2. measures `gs`, the slope of the objective along `-s`, and falls back
//!    to steepest descent when `-s` is not a descent direction,
//! 3. runs the line search along `-s`,
//! 4. scales the direction by the accepted step length and projects the
//!    result onto the bounds,
//! 5. and, on `update`, moves the iterate, refreshes the gradient, feeds
//!    the secant and recomputes the criticality measure.
//!
//! # Binding Tolerance
//!
//! With active bounds, the tolerance deciding which variables are treated
//! as binding is the current criticality measure `algo.gnorm`. It shrinks
//! as the iterates approach a stationary point.
//!
//! # Example
//!
//! ```rust,ignore
//! use descentopt_optim::prelude::*;
//!
//! let config = StepConfig::new()
//!     .with_descent(DescentType::Secant)
//!     .with_secant(SecantType::Lbfgs);
//! let step = LineSearchStep::new(config)?;
//! ```

use crate::{
    descent::DescentStrategy,
    krylov::KrylovFlag,
    projected_objective::ProjectedObjective,
    secant::Secant,
    step::Step,
};
use descentopt_core::{
    bounds::BoundConstraint,
    config::{DescentType, StepConfig},
    error::{OptimizerError, Result},
    objective::Objective,
    optimization::{AlgorithmState, CurvatureLineSearch, LineSearch, StepState},
    types::Scalar,
    vector::Vector,
};
use log::debug;
use num_traits::Float;

/// Line-search globalized descent step.
#[derive(Debug)]
pub struct LineSearchStep<T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    config: StepConfig<T>,
    descent: DescentStrategy<T, V>,
    line_search: Box<dyn LineSearch<T, V>>,
    state: Option<StepState<T, V>>,

    /// Secant plays the Hessian inside the reduced operators
    use_secant_hess_vec: bool,
    /// Secant plays the preconditioner inside the Krylov solve
    use_secant_precond: bool,
    /// Secant receives a curvature pair on every update
    update_secant: bool,

    krylov_iterations: usize,
    krylov_flag: KrylovFlag,
    ls_nfval: usize,
    ls_ngrad: usize,
}

impl<T, V> LineSearchStep<T, V>
where
    T: Scalar,
    V: Vector<T> + 'static,
{
    /// Creates a step with the collaborators named by `config`.
    ///
    /// # Errors
    ///
    /// Fails when the configuration does not validate or a collaborator
    /// cannot be built from it.
    pub fn new(config: StepConfig<T>) -> Result<Self> {
        Self::build(config, None)
    }

    /// Creates a step around a caller-supplied secant.
    ///
    /// The secant is used by quasi-Newton descent and by Newton-Krylov with
    /// secant preconditioning or a secant Hessian. Other descent types log
    /// a warning and ignore it.
    pub fn with_secant(config: StepConfig<T>, secant: Box<dyn Secant<T, V>>) -> Result<Self> {
        Self::build(config, Some(secant))
    }

    fn build(config: StepConfig<T>, secant: Option<Box<dyn Secant<T, V>>>) -> Result<Self> {
        config.validate()?;
        let descent = DescentStrategy::from_config(&config, secant)?;
        let line_search: Box<dyn LineSearch<T, V>> =
            Box::new(CurvatureLineSearch::from_config(&config)?);

        let (use_secant_hess_vec, use_secant_precond) = match descent {
            DescentStrategy::Secant(_) => (true, false),
            DescentStrategy::NewtonKrylov { .. } => {
                (config.use_secant_hess_vec, config.use_secant_precond)
            }
            _ => (false, false),
        };
        let update_secant = config.uses_secant();

        Ok(Self {
            config,
            descent,
            line_search,
            state: None,
            use_secant_hess_vec,
            use_secant_precond,
            update_secant,
            krylov_iterations: 0,
            krylov_flag: KrylovFlag::Converged,
            ls_nfval: 0,
            ls_ngrad: 0,
        })
    }
}

impl<T, V> LineSearchStep<T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    /// Replaces the line search built from the configuration.
    #[must_use]
    pub fn with_line_search(mut self, line_search: Box<dyn LineSearch<T, V>>) -> Self {
        self.line_search = line_search;
        self
    }

    /// The configuration the step was built from.
    pub fn config(&self) -> &StepConfig<T> {
        &self.config
    }

    /// The descent strategy and its collaborators.
    pub fn descent(&self) -> &DescentStrategy<T, V> {
        &self.descent
    }

    /// Gradient, last step and last step length; `None` before
    /// `initialize`.
    pub fn state(&self) -> Option<&StepState<T, V>> {
        self.state.as_ref()
    }

    /// Iterations of the last Krylov solve.
    pub fn krylov_iterations(&self) -> usize {
        self.krylov_iterations
    }

    /// Termination flag of the last Krylov solve.
    pub fn krylov_flag(&self) -> KrylovFlag {
        self.krylov_flag
    }

    /// Function and gradient evaluations of the last line search.
    pub fn line_search_evaluations(&self) -> (usize, usize) {
        (self.ls_nfval, self.ls_ngrad)
    }

    fn gradient_tolerance(&self, gnorm: T) -> T {
        if self.config.inexact_gradient {
            <T as Scalar>::from_f64(0.1) * <T as Float>::min(gnorm, T::one())
        } else {
            T::sqrt_epsilon()
        }
    }

    /// Slope of the objective along `-s` as seen through the bounds.
    fn slope(
        &self,
        s: &V,
        g: &V,
        x: &V,
        bounds: &dyn BoundConstraint<T, V>,
        eps: T,
    ) -> T {
        let one = T::one();
        if !bounds.is_activated() {
            return -g.dot(s);
        }

        let mut d = x.clone();
        if self.descent.descent_type() == DescentType::SteepestDescent {
            d.axpy(-one, s);
            bounds.project(&mut d);
            d.scale(-one);
            d.plus(x);
            return -g.dot(&d);
        }

        d.set(s);
        bounds.prune_active(&mut d, g, x, eps);
        let free = -g.dot(&d);

        d.set(x);
        d.axpy(-one, g);
        bounds.project(&mut d);
        d.scale(-one);
        d.plus(x);
        bounds.prune_inactive(&mut d, g, x, eps);
        free - g.dot(&d)
    }

    /// Writes the direction of the configured descent type into `s`.
    fn direction(
        &mut self,
        s: &mut V,
        g: &V,
        x: &V,
        obj: &dyn Objective<T, V>,
        bounds: &dyn BoundConstraint<T, V>,
        eps: T,
    ) -> Result<()> {
        let tol = T::sqrt_epsilon();
        match &mut self.descent {
            DescentStrategy::NewtonKrylov { krylov, secant } => {
                let secant: Option<&dyn Secant<T, V>> = match secant {
                    Some(secant) => Some(&**secant),
                    None => None,
                };
                let pobj = ProjectedObjective::new(
                    obj,
                    bounds,
                    secant,
                    self.use_secant_precond,
                    self.use_secant_hess_vec,
                    eps,
                );
                let hessian = pobj.reduced_hessian(x, g);
                let precond = pobj.reduced_preconditioner(x, g);
                let outcome = krylov.run(s, g, &hessian, &precond)?;
                self.krylov_iterations = outcome.iterations;
                self.krylov_flag = outcome.flag;
            }
            DescentStrategy::Newton => {
                let pobj = ProjectedObjective::new(obj, bounds, None, false, false, eps);
                pobj.reduced_inv_hess_vec(s, g, x, g, x, tol)?;
            }
            DescentStrategy::Secant(secant) => {
                let pobj = ProjectedObjective::new(
                    obj,
                    bounds,
                    Some(&**secant),
                    self.use_secant_precond,
                    self.use_secant_hess_vec,
                    eps,
                );
                pobj.reduced_inv_hess_vec(s, g, x, g, x, tol)?;
            }
            DescentStrategy::NonlinearCg(cg) => cg.run(s, g, x, obj)?,
            DescentStrategy::Steepest => s.set(g),
        }
        Ok(())
    }

    fn name_line(&self) -> String {
        format!(
            "{} with {} Linesearch satisfying {}",
            self.descent.descent_type(),
            self.line_search.name(),
            self.config.curvature
        )
    }

    fn krylov_columns(&self) -> bool {
        matches!(self.descent, DescentStrategy::NewtonKrylov { .. })
    }
}

impl<T, V> Step<T, V> for LineSearchStep<T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    fn initialize(
        &mut self,
        x: &mut V,
        obj: &mut dyn Objective<T, V>,
        bounds: &dyn BoundConstraint<T, V>,
        algo: &mut AlgorithmState<T, V>,
    ) -> Result<()> {
        let tol = T::sqrt_epsilon();
        let mut state = StepState::new(x);

        if bounds.is_activated() {
            bounds.project(x);
        }

        obj.update(x, true, algo.iter);
        algo.value = obj.value(x, tol)?;
        algo.nfval += 1;
        obj.gradient(&mut state.gradient, x, tol)?;
        algo.ngrad += 1;

        algo.gnorm = criticality(
            self.config.use_projected_gradient,
            &state.gradient,
            x,
            bounds,
        );
        algo.snorm = T::INITIAL_STEP_NORM;
        algo.iterate.set(x);

        self.krylov_iterations = 0;
        self.krylov_flag = KrylovFlag::Converged;
        self.state = Some(state);
        Ok(())
    }

    fn compute(
        &mut self,
        s: &mut V,
        x: &V,
        obj: &dyn Objective<T, V>,
        bounds: &dyn BoundConstraint<T, V>,
        algo: &mut AlgorithmState<T, V>,
    ) -> Result<()> {
        let one = T::one();
        let mut state = self
            .state
            .take()
            .ok_or_else(|| OptimizerError::invalid_state("compute called before initialize"))?;
        let g = &state.gradient;

        let eps = if bounds.is_activated() {
            algo.gnorm
        } else {
            T::zero()
        };

        if let Err(err) = self.direction(s, g, x, obj, bounds, eps) {
            self.state = Some(state);
            return Err(err);
        }

        let mut gs = self.slope(s, g, x, bounds, eps);
        self.line_search.set_data(g, eps);

        let krylov_failed =
            self.krylov_flag == KrylovFlag::NegativeCurvature && self.krylov_iterations <= 1;
        if gs >= T::zero() || krylov_failed {
            debug!(
                "{} direction is not a descent direction (gs = {:e}); using steepest descent",
                self.descent.descent_type(),
                gs.to_f64()
            );
            s.set(g);
            gs = if bounds.is_activated() {
                let mut d = s.clone();
                bounds.prune_active(&mut d, s, x, T::zero());
                -g.dot(&d)
            } else {
                -g.dot(s)
            };
        }
        s.scale(-one);

        let outcome = self.line_search.run(x, s, algo.value, gs, obj, bounds);
        let result = match outcome {
            Ok(result) => result,
            Err(err) => {
                self.state = Some(state);
                return Err(err);
            }
        };
        if !result.success {
            debug!(
                "{} line search stopped without satisfying the {} (t = {:e})",
                self.line_search.name(),
                self.config.curvature,
                result.step_size.to_f64()
            );
        }

        self.ls_nfval = result.function_evals;
        self.ls_ngrad = result.gradient_evals;
        algo.nfval += result.function_evals;
        algo.ngrad += result.gradient_evals;

        s.scale(result.step_size);
        if bounds.is_activated() {
            s.plus(x);
            bounds.project(s);
            s.axpy(-one, x);
        }

        state.search_size = result.step_size;
        state.descent.set(s);
        algo.snorm = s.norm();
        algo.value = result.new_value;

        self.state = Some(state);
        Ok(())
    }

    fn update(
        &mut self,
        x: &mut V,
        s: &V,
        obj: &mut dyn Objective<T, V>,
        bounds: &dyn BoundConstraint<T, V>,
        algo: &mut AlgorithmState<T, V>,
    ) -> Result<()> {
        let tol = self.gradient_tolerance(algo.gnorm);
        let Some(state) = self.state.as_mut() else {
            return Err(OptimizerError::invalid_state(
                "update called before initialize",
            ));
        };

        algo.iter += 1;
        x.axpy(T::one(), s);
        obj.update(x, true, algo.iter);

        let previous = self.update_secant.then(|| state.gradient.clone());
        obj.gradient(&mut state.gradient, x, tol)?;
        algo.ngrad += 1;

        if let Some(previous) = previous {
            if let Some(secant) = self.descent.secant_mut() {
                secant.update(&state.gradient, &previous, s, algo.snorm, algo.iter + 1);
            }
        }

        algo.iterate.set(x);
        algo.gnorm = criticality(
            self.config.use_projected_gradient,
            &state.gradient,
            x,
            bounds,
        );
        Ok(())
    }

    fn print_header(&self) -> String {
        let mut hist = format!(
            "  {:<6}{:<15}{:<15}{:<15}{:<10}{:<10}{:<10}{:<10}",
            "iter", "value", "gnorm", "snorm", "#fval", "#grad", "ls_#fval", "ls_#grad"
        );
        if self.krylov_columns() {
            hist.push_str(&format!("{:<10}{:<10}", "iterCG", "flagCG"));
        }
        hist.push('\n');
        hist
    }

    fn print_name(&self) -> String {
        let mut hist = format!("\n{}\n", self.name_line());
        if let DescentStrategy::NewtonKrylov { krylov, .. } = &self.descent {
            hist.push_str(&format!("Krylov Type: {}\n", krylov.kind()));
        }
        if let Some(secant) = self.descent.secant() {
            hist.push_str(&format!("Secant Type: {}\n", secant.kind()));
        }
        if let DescentStrategy::NonlinearCg(cg) = &self.descent {
            hist.push_str(&format!("Nonlinear CG Type: {}\n", cg.kind()));
        }
        hist
    }

    fn print(&self, algo: &AlgorithmState<T, V>, header: bool) -> String {
        let mut hist = String::new();
        if algo.iter == 0 {
            hist.push_str(&self.print_name());
        }
        if header {
            hist.push_str(&self.print_header());
        }

        hist.push_str(&format!(
            "  {:<6}{:<15}{:<15}",
            algo.iter,
            scientific(algo.value),
            scientific(algo.gnorm)
        ));
        if algo.iter > 0 {
            hist.push_str(&format!(
                "{:<15}{:<10}{:<10}{:<10}{:<10}",
                scientific(algo.snorm),
                algo.nfval,
                algo.ngrad,
                self.ls_nfval,
                self.ls_ngrad
            ));
            if self.krylov_columns() {
                hist.push_str(&format!(
                    "{:<10}{:<10}",
                    self.krylov_iterations,
                    self.krylov_flag.code()
                ));
            }
        }
        hist.push('\n');
        hist
    }
}

/// Criticality measure at `x`: the gradient norm without bounds, otherwise
/// the projected gradient norm or the norm of the projected gradient map
/// `P(x - g) - x`.
fn criticality<T, V>(
    use_projected_gradient: bool,
    g: &V,
    x: &V,
    bounds: &dyn BoundConstraint<T, V>,
) -> T
where
    T: Scalar,
    V: Vector<T>,
{
    if !bounds.is_activated() {
        return g.norm();
    }
    if use_projected_gradient {
        let mut pg = g.clone();
        bounds.compute_projected_gradient(&mut pg, x);
        pg.norm()
    } else {
        let mut xnew = x.clone();
        xnew.axpy(-T::one(), g);
        bounds.project(&mut xnew);
        xnew.axpy(-T::one(), x);
        xnew.norm()
    }
}

/// Formats `value` like `1.234560e-03`: six fractional digits and a signed
/// exponent of at least two digits.
pub fn scientific<T: Scalar>(value: T) -> String {
    let formatted = format!("{:.6e}", value.to_f64());
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => formatted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secant::Lbfgs;
    use descentopt_core::{
        bounds::Unconstrained,
        config::{KrylovType, NonlinearCgType, SecantType},
        objective::QuadraticObjective,
    };
    use nalgebra::{DVector, Dyn};
    use pretty_assertions::assert_eq;

    type Vec2 = DVector<f64>;

    fn start(
        step: &mut LineSearchStep<f64, Vec2>,
        x: &mut Vec2,
    ) -> AlgorithmState<f64, Vec2> {
        let mut obj = QuadraticObjective::simple(Dyn(2));
        let mut algo = AlgorithmState::new(&*x);
        step.initialize(x, &mut obj, &Unconstrained, &mut algo)
            .unwrap();
        algo
    }

    #[test]
    fn test_scientific_format() {
        assert_eq!(scientific(1.0), "1.000000e+00");
        assert_eq!(scientific(0.0), "0.000000e+00");
        assert_eq!(scientific(-1234.5678), "-1.234568e+03");
        assert_eq!(scientific(2.5e-7), "2.500000e-07");
        assert_eq!(scientific(1e-300), "1.000000e-300");
    }

    #[test]
    fn test_print_name_lines() {
        let step = LineSearchStep::<f64, Vec2>::new(StepConfig::new()).unwrap();
        assert_eq!(
            step.print_name(),
            "\nQuasi-Newton Method with Cubic Interpolation Linesearch satisfying \
             Strong Wolfe Conditions\nSecant Type: Limited-Memory BFGS\n"
        );

        let config = StepConfig::new()
            .with_descent(DescentType::NewtonKrylov)
            .with_krylov(KrylovType::ConjugateResiduals)
            .with_secant(SecantType::Lsr1)
            .with_secant_preconditioning(true);
        let step = LineSearchStep::<f64, Vec2>::new(config).unwrap();
        assert_eq!(
            step.print_name(),
            "\nNewton-Krylov with Cubic Interpolation Linesearch satisfying \
             Strong Wolfe Conditions\nKrylov Type: Conjugate Residuals\n\
             Secant Type: Limited-Memory SR1\n"
        );

        let config = StepConfig::new()
            .with_descent(DescentType::NonlinearCg)
            .with_nonlinear_cg(NonlinearCgType::FletcherReeves);
        let step = LineSearchStep::<f64, Vec2>::new(config).unwrap();
        assert!(step
            .print_name()
            .ends_with("Nonlinear CG Type: Fletcher-Reeves\n"));
    }

    #[test]
    fn test_header_columns() {
        let step = LineSearchStep::<f64, Vec2>::new(StepConfig::new()).unwrap();
        assert_eq!(
            step.print_header(),
            "  iter  value          gnorm          snorm          #fval     #grad     \
             ls_#fval  ls_#grad  \n"
        );

        let config = StepConfig::new().with_descent(DescentType::NewtonKrylov);
        let step = LineSearchStep::<f64, Vec2>::new(config).unwrap();
        assert!(step.print_header().ends_with("iterCG    flagCG    \n"));
    }

    #[test]
    fn test_print_rows() {
        let config = StepConfig::new().with_descent(DescentType::SteepestDescent);
        let mut step = LineSearchStep::<f64, Vec2>::new(config).unwrap();
        let mut x = DVector::from_vec(vec![3.0, 4.0]);
        let mut algo = start(&mut step, &mut x);

        let first = step.print(&algo, false);
        assert_eq!(
            first,
            "\nSteepest Descent with Cubic Interpolation Linesearch satisfying \
             Strong Wolfe Conditions\n  0     1.250000e+01   5.000000e+00   \n"
        );

        let mut obj = QuadraticObjective::simple(Dyn(2));
        let mut s = DVector::zeros(2);
        step.compute(&mut s, &x, &obj, &Unconstrained, &mut algo)
            .unwrap();
        step.update(&mut x, &s, &mut obj, &Unconstrained, &mut algo)
            .unwrap();
        assert_eq!(
            step.print(&algo, false),
            "  1     0.000000e+00   0.000000e+00   5.000000e+00   2         3         \
             1         1         \n"
        );
    }

    #[test]
    fn test_compute_requires_initialize() {
        let mut step = LineSearchStep::<f64, Vec2>::new(StepConfig::new()).unwrap();
        let obj = QuadraticObjective::simple(Dyn(2));
        let x = DVector::from_vec(vec![1.0, 1.0]);
        let mut algo = AlgorithmState::new(&x);
        let mut s = DVector::zeros(2);
        let err = step
            .compute(&mut s, &x, &obj, &Unconstrained, &mut algo)
            .unwrap_err();
        assert!(matches!(err, OptimizerError::InvalidState { .. }));
    }

    #[test]
    fn test_inexact_gradient_tolerance() {
        let config = StepConfig::new().with_inexact(false, true, false);
        let step = LineSearchStep::<f64, Vec2>::new(config).unwrap();
        assert_eq!(step.gradient_tolerance(5.0), 0.1);
        assert!((step.gradient_tolerance(0.5) - 0.05).abs() < 1e-15);

        let exact = LineSearchStep::<f64, Vec2>::new(StepConfig::new()).unwrap();
        assert_eq!(exact.gradient_tolerance(5.0), f64::EPSILON.sqrt());
    }

    #[test]
    fn test_user_secant_is_kept() {
        let config = StepConfig::new().with_descent(DescentType::Secant);
        let secant: Box<dyn Secant<f64, Vec2>> = Box::new(Lbfgs::new(3));
        let step = LineSearchStep::with_secant(config, secant).unwrap();
        assert_eq!(
            step.descent().secant().map(|s| s.kind()),
            Some(SecantType::Lbfgs)
        );
        assert!(step.use_secant_hess_vec);
        assert!(step.update_secant);
    }
}
