//! Typed configuration for the line-search step.
//!
//! The enumerations below name every algorithmic choice the step exposes.
//! Each one parses from, and displays as, the option string used in a
//! [`ParameterList`], so a list like
//!
//! ```text
//! Descent Type            = "Newton-Krylov"
//! Krylov Type             = "Conjugate Residuals"
//! Linesearch Type         = "Backtracking"
//! ```
//!
//! becomes a [`StepConfig`] through [`StepConfig::from_parameters`].

use crate::{
    config::parameters::ParameterList,
    error::{OptimizerError, Result},
    optimization::line_search::LineSearchParams,
    types::Scalar,
};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Declares an option enum together with its display names and parser.
macro_rules! option_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal $(| $alias:literal)* ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[ $( Self::$variant, )+ ];

            /// Option string naming this variant.
            pub fn name(self) -> &'static str {
                match self {
                    $( Self::$variant => $text, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $name {
            type Err = OptimizerError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $( $text $(| $alias)* => Ok(Self::$variant), )+
                    other => Err(OptimizerError::invalid_configuration(
                        concat!("unknown ", $label),
                        $label,
                        other,
                    )),
                }
            }
        }
    };
}

option_enum! {
    /// How the search direction is produced.
    DescentType, "Descent Type" {
        /// `s = g`
        SteepestDescent => "Steepest Descent",
        /// Nonlinear conjugate gradient recurrence
        NonlinearCg => "Nonlinear CG",
        /// Quasi-Newton direction from a secant approximation
        Secant => "Quasi-Newton Method",
        /// Exact Newton direction from the objective's inverse Hessian
        Newton => "Newton's Method",
        /// Inexact Newton direction from a Krylov solve
        NewtonKrylov => "Newton-Krylov",
    }
}

option_enum! {
    /// How trial step lengths are chosen.
    LineSearchType, "Linesearch Type" {
        /// Geometric shrinking `t <- rho t`
        Backtracking => "Backtracking",
        /// Safeguarded quadratic then cubic interpolation
        CubicInterpolation => "Cubic Interpolation",
        /// Bracketing with interval halving
        Bisection => "Bisection",
        /// Bracketing with golden-ratio sectioning
        GoldenSection => "Golden Section",
    }
}

option_enum! {
    /// Curvature condition paired with sufficient decrease.
    CurvatureCondition, "Linesearch Curvature Condition" {
        /// `phi'(t) >= c2 phi'(0)`
        Wolfe => "Wolfe Conditions",
        /// `|phi'(t)| <= c2 |phi'(0)|`
        StrongWolfe => "Strong Wolfe Conditions",
        /// `c2 phi'(0) <= phi'(t) <= -c3 phi'(0)`
        GeneralizedWolfe => "Generalized Wolfe Conditions",
        /// `c2 phi'(0) <= phi'(t) <= (2 c1 - 1) phi'(0)`
        ApproximateWolfe => "Approximate Wolfe Conditions",
        /// `phi(0) + (1 - c1) t phi'(0) <= phi(t)`
        Goldstein => "Goldstein Conditions",
    }
}

option_enum! {
    /// Formula for the nonlinear CG parameter `beta`.
    NonlinearCgType, "Nonlinear CG Type" {
        /// Hestenes-Stiefel
        HestenesStiefel => "Hestenes-Stiefel",
        /// Fletcher-Reeves
        FletcherReeves => "Fletcher-Reeves",
        /// Daniel's method, which applies the Hessian
        Daniel => "Daniel (uses Hessian)",
        /// Polak-Ribiere
        PolakRibiere => "Polak-Ribiere",
        /// Fletcher's conjugate descent
        FletcherConjugateDescent => "Fletcher Conjugate Descent",
        /// Liu-Storey
        LiuStorey => "Liu-Storey",
        /// Dai-Yuan
        DaiYuan => "Dai-Yuan",
        /// Hager-Zhang
        HagerZhang => "Hager-Zhang" | "Hagar-Zhang",
        /// Oren-Luenberger
        OrenLuenberger => "Oren-Luenberger",
    }
}

option_enum! {
    /// Limited-memory secant approximation.
    SecantType, "Secant Type" {
        /// Limited-memory BFGS
        Lbfgs => "Limited-Memory BFGS",
        /// Limited-memory DFP
        Ldfp => "Limited-Memory DFP",
        /// Limited-memory symmetric rank one
        Lsr1 => "Limited-Memory SR1",
        /// Barzilai-Borwein scaled identity
        BarzilaiBorwein => "Barzilai-Borwein",
    }
}

option_enum! {
    /// Krylov solver for the Newton system.
    KrylovType, "Krylov Type" {
        /// Conjugate gradients
        ConjugateGradients => "Conjugate Gradients",
        /// Conjugate residuals
        ConjugateResiduals => "Conjugate Residuals",
    }
}

/// Complete configuration of a line-search step.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StepConfig<T: Scalar> {
    /// Descent direction strategy
    pub descent: DescentType,
    /// Step-length selector
    pub line_search: LineSearchType,
    /// Curvature condition
    pub curvature: CurvatureCondition,
    /// Nonlinear CG formula, used by `DescentType::NonlinearCg`
    pub nonlinear_cg: NonlinearCgType,
    /// Secant approximation, used by `Secant` and secant-preconditioned Newton-Krylov
    pub secant: SecantType,
    /// Krylov solver, used by `NewtonKrylov`
    pub krylov: KrylovType,
    /// The objective value may be evaluated inexactly
    pub inexact_value: bool,
    /// The gradient may be evaluated inexactly
    pub inexact_gradient: bool,
    /// Hessian-vector products may be evaluated inexactly
    pub inexact_hess_vec: bool,
    /// Replace Hessian-vector products by the secant model
    pub use_secant_hess_vec: bool,
    /// Precondition the Krylov solve with the secant model
    pub use_secant_precond: bool,
    /// Measure criticality by the projected gradient instead of `P(x - g) - x`
    pub use_projected_gradient: bool,
    /// Absolute Krylov tolerance
    pub krylov_abs_tol: T,
    /// Relative Krylov tolerance
    pub krylov_rel_tol: T,
    /// Maximum number of Krylov iterations
    pub krylov_max_iter: usize,
    /// Number of secant pairs kept
    pub secant_storage: usize,
    /// Barzilai-Borwein step formula (1 or 2)
    pub barzilai_borwein_type: usize,
    /// Nonlinear CG restart period
    pub restart_period: usize,
    /// Line-search parameters
    pub line_search_params: LineSearchParams<T>,
}

impl<T: Scalar> Default for StepConfig<T> {
    fn default() -> Self {
        Self {
            descent: DescentType::Secant,
            line_search: LineSearchType::CubicInterpolation,
            curvature: CurvatureCondition::StrongWolfe,
            nonlinear_cg: NonlinearCgType::HagerZhang,
            secant: SecantType::Lbfgs,
            krylov: KrylovType::ConjugateGradients,
            inexact_value: false,
            inexact_gradient: false,
            inexact_hess_vec: false,
            use_secant_hess_vec: false,
            use_secant_precond: false,
            use_projected_gradient: false,
            krylov_abs_tol: <T as Scalar>::from_f64(1e-4),
            krylov_rel_tol: <T as Scalar>::from_f64(1e-2),
            krylov_max_iter: 20,
            secant_storage: 10,
            barzilai_borwein_type: 1,
            restart_period: 100,
            line_search_params: LineSearchParams::default(),
        }
    }
}

impl<T: Scalar> StepConfig<T> {
    /// Creates the default configuration (L-BFGS with cubic interpolation
    /// under the strong Wolfe conditions).
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a configuration from a parameter list; missing keys take their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Fails on unknown option strings, mistyped entries, or values that do
    /// not pass [`validate`](Self::validate).
    pub fn from_parameters(list: &ParameterList) -> Result<Self> {
        let defaults = Self::default();
        let real = |key: &str, default: T| -> Result<T> {
            list.get_real(key, Scalar::to_f64(default))
                .map(<T as Scalar>::from_f64)
        };

        // Both spellings of the preconditioning flag are in circulation.
        let use_secant_precond = if list.contains("Use Secant Preconditioning") {
            list.get_bool("Use Secant Preconditioning", false)?
        } else {
            list.get_bool("Use Secant Preconditioner", false)?
        };

        let p = &defaults.line_search_params;
        let line_search_params = LineSearchParams {
            c1: real("Sufficient Decrease Parameter", p.c1)?,
            c2: real("Curvature Conditions Parameter", p.c2)?,
            c3: real(
                "Curvature Conditions Parameter: Generalized Wolfe",
                p.c3,
            )?,
            max_evaluations: list.get_usize("Function Evaluation Limit", p.max_evaluations)?,
            initial_step_size: real("Initial Linesearch Parameter", p.initial_step_size)?,
            rho: real("Backtracking Rate", p.rho)?,
            bracketing_tolerance: real("Bracketing Tolerance", p.bracketing_tolerance)?,
        };

        let config = Self {
            descent: list.get_str("Descent Type", defaults.descent.name())?.parse()?,
            line_search: list
                .get_str("Linesearch Type", defaults.line_search.name())?
                .parse()?,
            curvature: list
                .get_str("Linesearch Curvature Condition", defaults.curvature.name())?
                .parse()?,
            nonlinear_cg: list
                .get_str("Nonlinear CG Type", defaults.nonlinear_cg.name())?
                .parse()?,
            secant: list.get_str("Secant Type", defaults.secant.name())?.parse()?,
            krylov: list.get_str("Krylov Type", defaults.krylov.name())?.parse()?,
            inexact_value: list.get_bool("Use Inexact Objective Function", false)?,
            inexact_gradient: list.get_bool("Use Inexact Gradient", false)?,
            inexact_hess_vec: list.get_bool("Use Inexact Hessian-Times-A-Vector", false)?,
            use_secant_hess_vec: list.get_bool("Use Secant Hessian-Times-A-Vector", false)?,
            use_secant_precond,
            use_projected_gradient: list
                .get_bool("Use Projected Gradient Criticality Measure", false)?,
            krylov_abs_tol: real("Absolute Krylov Tolerance", defaults.krylov_abs_tol)?,
            krylov_rel_tol: real("Relative Krylov Tolerance", defaults.krylov_rel_tol)?,
            krylov_max_iter: list
                .get_usize("Maximum Number of Krylov Iterations", defaults.krylov_max_iter)?,
            secant_storage: list.get_usize("Maximum Secant Storage", defaults.secant_storage)?,
            barzilai_borwein_type: list
                .get_usize("Barzilai-Borwein Type", defaults.barzilai_borwein_type)?,
            restart_period: list.get_usize("Restart Period", defaults.restart_period)?,
            line_search_params,
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks every numeric setting.
    pub fn validate(&self) -> Result<()> {
        self.line_search_params.validate()?;

        if self.krylov_abs_tol <= T::zero() {
            return Err(OptimizerError::invalid_configuration(
                "must be positive",
                "Absolute Krylov Tolerance",
                self.krylov_abs_tol.to_string(),
            ));
        }
        if self.krylov_rel_tol <= T::zero() {
            return Err(OptimizerError::invalid_configuration(
                "must be positive",
                "Relative Krylov Tolerance",
                self.krylov_rel_tol.to_string(),
            ));
        }
        if self.krylov_max_iter == 0 {
            return Err(OptimizerError::invalid_configuration(
                "must be positive",
                "Maximum Number of Krylov Iterations",
                "0",
            ));
        }
        if self.secant_storage == 0 {
            return Err(OptimizerError::invalid_configuration(
                "must be positive",
                "Maximum Secant Storage",
                "0",
            ));
        }
        if !matches!(self.barzilai_borwein_type, 1 | 2) {
            return Err(OptimizerError::invalid_configuration(
                "must be 1 or 2",
                "Barzilai-Borwein Type",
                self.barzilai_borwein_type.to_string(),
            ));
        }
        if self.restart_period == 0 {
            return Err(OptimizerError::invalid_configuration(
                "must be positive",
                "Restart Period",
                "0",
            ));
        }
        Ok(())
    }

    /// Whether a secant operator is updated by this configuration.
    pub fn uses_secant(&self) -> bool {
        self.descent == DescentType::Secant
            || (self.descent == DescentType::NewtonKrylov && self.use_secant_precond)
    }

    /// Sets the descent type.
    #[must_use]
    pub fn with_descent(mut self, descent: DescentType) -> Self {
        self.descent = descent;
        self
    }

    /// Sets the step-length selector.
    #[must_use]
    pub fn with_line_search(mut self, line_search: LineSearchType) -> Self {
        self.line_search = line_search;
        self
    }

    /// Sets the curvature condition.
    #[must_use]
    pub fn with_curvature(mut self, curvature: CurvatureCondition) -> Self {
        self.curvature = curvature;
        self
    }

    /// Sets the nonlinear CG formula.
    #[must_use]
    pub fn with_nonlinear_cg(mut self, nonlinear_cg: NonlinearCgType) -> Self {
        self.nonlinear_cg = nonlinear_cg;
        self
    }

    /// Sets the secant type.
    #[must_use]
    pub fn with_secant(mut self, secant: SecantType) -> Self {
        self.secant = secant;
        self
    }

    /// Sets the Krylov solver.
    #[must_use]
    pub fn with_krylov(mut self, krylov: KrylovType) -> Self {
        self.krylov = krylov;
        self
    }

    /// Sets the Krylov tolerances and iteration limit.
    #[must_use]
    pub fn with_krylov_tolerances(mut self, abs_tol: T, rel_tol: T, max_iter: usize) -> Self {
        self.krylov_abs_tol = abs_tol;
        self.krylov_rel_tol = rel_tol;
        self.krylov_max_iter = max_iter;
        self
    }

    /// Sets the number of stored secant pairs.
    #[must_use]
    pub fn with_secant_storage(mut self, storage: usize) -> Self {
        self.secant_storage = storage;
        self
    }

    /// Enables or disables secant preconditioning of the Krylov solve.
    #[must_use]
    pub fn with_secant_preconditioning(mut self, enabled: bool) -> Self {
        self.use_secant_precond = enabled;
        self
    }

    /// Enables or disables the secant Hessian model.
    #[must_use]
    pub fn with_secant_hess_vec(mut self, enabled: bool) -> Self {
        self.use_secant_hess_vec = enabled;
        self
    }

    /// Selects the projected-gradient criticality measure.
    #[must_use]
    pub fn with_projected_gradient_criticality(mut self, enabled: bool) -> Self {
        self.use_projected_gradient = enabled;
        self
    }

    /// Sets the inexactness flags for value, gradient and Hessian-vector products.
    #[must_use]
    pub fn with_inexact(mut self, value: bool, gradient: bool, hess_vec: bool) -> Self {
        self.inexact_value = value;
        self.inexact_gradient = gradient;
        self.inexact_hess_vec = hess_vec;
        self
    }

    /// Replaces the line-search parameters.
    #[must_use]
    pub fn with_line_search_params(mut self, params: LineSearchParams<T>) -> Self {
        self.line_search_params = params;
        self
    }
}
