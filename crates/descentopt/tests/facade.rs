//! Runs through the facade prelude alone.

use approx::assert_relative_eq;
use descentopt::prelude::*;
use nalgebra::DMatrix;
use pretty_assertions::assert_eq;

#[test]
fn test_newton_solves_box_constrained_quadratic() {
    // f = 1/2 x^T diag(1, 4) x - 2 (x_0 + x_1) on [0, 1]^2, minimized at
    // (1, 0.5) where the first component sits on its upper bound.
    let a = DMatrix::from_diagonal(&DVector::from_vec(vec![1.0, 4.0]));
    let mut obj = QuadraticObjective::new(a, DVector::from_vec(vec![-2.0, -2.0]), 0.0);
    let bounds = BoxConstraint::new(DVector::zeros(2), DVector::from_vec(vec![1.0, 1.0])).unwrap();

    let config = StepConfig::new().with_descent(DescentType::Newton);
    let step: Box<dyn Step<f64, DVector<f64>>> =
        Box::new(LineSearchStep::<f64, DVector<f64>>::new(config).unwrap());
    let mut algorithm = Algorithm::new(step, StatusTest::default());
    let mut x = DVector::zeros(2);

    let result = algorithm.run(&mut x, &mut obj, &bounds).unwrap();

    assert_eq!(result.termination_reason, TerminationReason::Converged);
    assert_eq!(result.iterations, 1);
    assert_eq!(result.output.len(), 2);
    assert_relative_eq!(result.point, DVector::from_vec(vec![1.0, 0.5]), epsilon = 1e-12);
    assert_relative_eq!(result.value, -2.0, epsilon = 1e-12);
    assert_eq!(x, result.point);
}

#[test]
fn test_configuration_errors_surface_through_facade() {
    let list = ParameterList::new().with("Descent Type", "Gradient Ascent");
    let err = StepConfig::<f64>::from_parameters(&list).unwrap_err();
    assert!(matches!(err, descentopt::OptimizerError::InvalidConfiguration { .. }));
}
