//! Descent strategies and the collaborators each one owns.
//!
//! A [`DescentStrategy`] carries exactly what its descent type needs: the
//! nonlinear CG history, a secant operator, or a Krylov solver with an
//! optional secant model. Collaborators are built once, when the step is
//! constructed, and live for the whole run.

use crate::{
    krylov::{build_krylov, Krylov, KrylovConfig},
    nonlinear_cg::NonlinearCg,
    secant::{build_secant, Secant},
};
use descentopt_core::{
    config::{DescentType, StepConfig},
    error::{OptimizerError, Result},
    types::Scalar,
    vector::Vector,
};
use log::warn;

/// How the step produces its search direction.
#[derive(Debug)]
pub enum DescentStrategy<T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    /// `s = g`
    Steepest,
    /// Nonlinear conjugate gradients
    NonlinearCg(NonlinearCg<T, V>),
    /// Quasi-Newton with a limited-memory secant inverse Hessian
    Secant(Box<dyn Secant<T, V>>),
    /// Newton with the objective's inverse Hessian
    Newton,
    /// Inexact Newton through a Krylov solve
    NewtonKrylov {
        /// Solver for the reduced Newton system
        krylov: Box<dyn Krylov<T, V>>,
        /// Secant preconditioner or Hessian model
        secant: Option<Box<dyn Secant<T, V>>>,
    },
}

impl<T, V> DescentStrategy<T, V>
where
    T: Scalar,
    V: Vector<T> + 'static,
{
    /// Builds the strategy named by `config.descent`.
    ///
    /// `user_secant` replaces the secant the configuration would build. It
    /// is ignored, with a warning, by descent types that have no use for a
    /// secant.
    ///
    /// # Errors
    ///
    /// Fails when a collaborator cannot be built, or when Newton-Krylov is
    /// asked for a secant Hessian model that nothing would ever update.
    pub fn from_config(
        config: &StepConfig<T>,
        user_secant: Option<Box<dyn Secant<T, V>>>,
    ) -> Result<Self> {
        let built_secant = |user: Option<Box<dyn Secant<T, V>>>| match user {
            Some(secant) => Ok(secant),
            None => build_secant(
                config.secant,
                config.secant_storage,
                config.barzilai_borwein_type,
            ),
        };

        let strategy = match config.descent {
            DescentType::Secant => Self::Secant(built_secant(user_secant)?),
            DescentType::NewtonKrylov => {
                let krylov_config = KrylovConfig::new(
                    config.krylov_abs_tol,
                    config.krylov_rel_tol,
                    config.krylov_max_iter,
                )
                .with_inexact(config.inexact_hess_vec);
                let krylov = build_krylov(config.krylov, krylov_config)?;

                let wants_secant = config.use_secant_precond || config.use_secant_hess_vec;
                if config.use_secant_hess_vec && !config.use_secant_precond && user_secant.is_none() {
                    return Err(OptimizerError::invalid_configuration(
                        "a secant Hessian model needs secant preconditioning or a user secant",
                        "Use Secant Hessian-Times-A-Vector",
                        "true",
                    ));
                }
                if !wants_secant && user_secant.is_some() {
                    warn!("Newton-Krylov without secant flags ignores the supplied secant");
                }

                let secant = if wants_secant {
                    Some(built_secant(user_secant)?)
                } else {
                    None
                };
                Self::NewtonKrylov { krylov, secant }
            }
            other => {
                if user_secant.is_some() {
                    warn!("{other} does not use a secant; the supplied secant is ignored");
                }
                match other {
                    DescentType::NonlinearCg => Self::NonlinearCg(NonlinearCg::new(
                        config.nonlinear_cg,
                        config.restart_period,
                    )?),
                    DescentType::Newton => Self::Newton,
                    _ => Self::Steepest,
                }
            }
        };
        Ok(strategy)
    }
}

impl<T, V> DescentStrategy<T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    /// The descent type this strategy implements.
    pub fn descent_type(&self) -> DescentType {
        match self {
            Self::Steepest => DescentType::SteepestDescent,
            Self::NonlinearCg(_) => DescentType::NonlinearCg,
            Self::Secant(_) => DescentType::Secant,
            Self::Newton => DescentType::Newton,
            Self::NewtonKrylov { .. } => DescentType::NewtonKrylov,
        }
    }

    /// The secant operator, if this strategy carries one.
    pub fn secant(&self) -> Option<&dyn Secant<T, V>> {
        match self {
            Self::Secant(secant) => Some(&**secant),
            Self::NewtonKrylov {
                secant: Some(secant),
                ..
            } => Some(&**secant),
            _ => None,
        }
    }

    /// Mutable access to the secant operator.
    pub fn secant_mut(&mut self) -> Option<&mut (dyn Secant<T, V> + 'static)> {
        match self {
            Self::Secant(secant) => Some(&mut **secant),
            Self::NewtonKrylov {
                secant: Some(secant),
                ..
            } => Some(&mut **secant),
            _ => None,
        }
    }
}
