//! Example: bound-constrained Rosenbrock with every descent type.
//!
//! The unconstrained minimizer (1, 1) lies outside the box, so the solution
//! sits on the upper bound of the first variable.

use descentopt::prelude::*;

/// f(x) = 100 (x_1 - x_0^2)^2 + (1 - x_0)^2
#[derive(Debug)]
struct Rosenbrock;

impl Objective<f64, DVector<f64>> for Rosenbrock {
    fn value(&self, x: &DVector<f64>, _tol: f64) -> Result<f64> {
        let (a, b) = (x[1] - x[0] * x[0], 1.0 - x[0]);
        Ok(100.0 * a * a + b * b)
    }

    fn gradient(&self, g: &mut DVector<f64>, x: &DVector<f64>, _tol: f64) -> Result<()> {
        let a = x[1] - x[0] * x[0];
        g[0] = -400.0 * a * x[0] - 2.0 * (1.0 - x[0]);
        g[1] = 200.0 * a;
        Ok(())
    }

    fn hess_vec(
        &self,
        hv: &mut DVector<f64>,
        v: &DVector<f64>,
        x: &DVector<f64>,
        _tol: f64,
    ) -> Result<()> {
        let h00 = 1200.0 * x[0] * x[0] - 400.0 * x[1] + 2.0;
        let h01 = -400.0 * x[0];
        hv[0] = h00 * v[0] + h01 * v[1];
        hv[1] = h01 * v[0] + 200.0 * v[1];
        Ok(())
    }

    fn inv_hess_vec(
        &self,
        hv: &mut DVector<f64>,
        v: &DVector<f64>,
        x: &DVector<f64>,
        _tol: f64,
    ) -> Result<()> {
        let h00 = 1200.0 * x[0] * x[0] - 400.0 * x[1] + 2.0;
        let h01 = -400.0 * x[0];
        let det = h00 * 200.0 - h01 * h01;
        if det.abs() < f64::EPSILON {
            return Err(OptimizerError::numerical_error("singular Rosenbrock Hessian"));
        }
        hv[0] = (200.0 * v[0] - h01 * v[1]) / det;
        hv[1] = (-h01 * v[0] + h00 * v[1]) / det;
        Ok(())
    }
}

fn main() -> Result<()> {
    println!("=== Bound-constrained Rosenbrock ===\n");

    let bounds = BoxConstraint::new(
        DVector::from_vec(vec![-2.0, -2.0]),
        DVector::from_vec(vec![0.8, 2.0]),
    )?;

    for descent in DescentType::ALL {
        let config = StepConfig::new()
            .with_descent(*descent)
            .with_secant_preconditioning(*descent == DescentType::NewtonKrylov);
        let step = LineSearchStep::<f64, DVector<f64>>::new(config)?;
        let mut algorithm = Algorithm::new(Box::new(step), StatusTest::new(1e-8, 1e-14, 500));

        let mut obj = Rosenbrock;
        let mut x = DVector::from_vec(vec![-1.2, 1.0]);
        let result = algorithm.run(&mut x, &mut obj, &bounds)?;

        if let Some(first) = result.output.first() {
            print!("{first}");
        }
        if let Some(last) = result.output.last() {
            print!("{last}");
        }
        println!(
            "  -> x = [{:.6}, {:.6}], {:?} after {} iterations\n",
            result.point[0], result.point[1], result.termination_reason, result.iterations
        );
    }

    Ok(())
}
