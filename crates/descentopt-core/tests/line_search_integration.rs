//! Line searches built from configurations, across every step selector and
//! curvature condition.

use approx::assert_relative_eq;
use descentopt_core::prelude::*;
use nalgebra::Dyn;
use pretty_assertions::assert_eq;

fn half_norm() -> QuadraticObjective<f64, Dyn> {
    QuadraticObjective::simple(Dyn(2))
}

#[test]
fn test_every_combination_accepts_exact_minimizer() {
    let obj = half_norm();
    let x = DVector::from_vec(vec![1.0, 0.0]);
    let s = -x.clone();

    for kind in LineSearchType::ALL {
        for condition in CurvatureCondition::ALL {
            let config = StepConfig::<f64>::new()
                .with_line_search(*kind)
                .with_curvature(*condition);
            let mut ls = CurvatureLineSearch::from_config(&config).unwrap();
            ls.set_data(&x, 0.0);

            let result = ls.run(&x, &s, 0.5, -1.0, &obj, &Unconstrained).unwrap();

            assert!(result.success, "{kind} / {condition}");
            assert_eq!(result.step_size, 1.0);
            assert_eq!(result.new_value, 0.0);
            assert_eq!(result.function_evals, 1);
            let expected_gradients = usize::from(*condition != CurvatureCondition::Goldstein);
            assert_eq!(result.gradient_evals, expected_gradients, "{condition}");
        }
    }
}

#[test]
fn test_parameter_list_drives_backtracking() {
    let list = ParameterList::new()
        .with("Linesearch Type", "Backtracking")
        .with("Linesearch Curvature Condition", "Wolfe Conditions")
        .with("Initial Linesearch Parameter", 4.0)
        .with("Backtracking Rate", 0.5);
    let config = StepConfig::<f64>::from_parameters(&list).unwrap();
    let mut ls = CurvatureLineSearch::from_config(&config).unwrap();

    let obj = half_norm();
    let x = DVector::from_vec(vec![6.0, 8.0]);
    let s = -x.clone();
    let result = ls.run(&x, &s, 50.0, -100.0, &obj, &Unconstrained).unwrap();

    // Trials 4, 2, 1: only t = 1 decreases phi(t) = 50 (1 - t)^2.
    assert!(result.success);
    assert_eq!(result.step_size, 1.0);
    assert_eq!(result.function_evals, 3);
    assert_eq!(LineSearch::<f64, DVector<f64>>::name(&ls), "Backtracking");
}

#[test]
fn test_bounded_search_evaluates_projected_trials() {
    let obj = half_norm();
    let bounds = BoxConstraint::lower_only(DVector::from_vec(vec![1.0, -10.0])).unwrap();
    let x = DVector::from_vec(vec![1.0, 2.0]);
    let g = x.clone();
    let s = -g.clone();

    // The first component is binding, so the slope only sees the second.
    let mut free = s.clone();
    bounds.prune_active(&mut free, &g, &x, 1.0);
    assert_eq!(free, DVector::from_vec(vec![0.0, -2.0]));
    let gs = g.dot(&free);

    let config = StepConfig::<f64>::new();
    let mut ls = CurvatureLineSearch::from_config(&config).unwrap();
    ls.set_data(&g, 1.0);
    let result = ls.run(&x, &s, 2.5, gs, &obj, &bounds).unwrap();

    assert!(result.success);
    assert_eq!(result.step_size, 1.0);
    assert_relative_eq!(result.new_value, 0.5);
}
