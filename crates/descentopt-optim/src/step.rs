//! The step interface driven by [`Algorithm`](crate::algorithm::Algorithm).

use descentopt_core::{
    bounds::BoundConstraint,
    error::Result,
    objective::Objective,
    optimization::AlgorithmState,
    types::Scalar,
    vector::Vector,
};

/// One iteration of an optimization method, split into trial computation
/// and acceptance.
///
/// A driver calls [`initialize`](Step::initialize) once, then alternates
/// [`compute`](Step::compute) and [`update`](Step::update) while its status
/// test passes. The algorithm state is lent to each call and written only
/// by the call in progress.
pub trait Step<T, V>
where
    T: Scalar,
    V: Vector<T>,
{
    /// Prepares the step at the starting point `x`, which may be projected
    /// onto the bounds.
    fn initialize(
        &mut self,
        x: &mut V,
        obj: &mut dyn Objective<T, V>,
        bounds: &dyn BoundConstraint<T, V>,
        algo: &mut AlgorithmState<T, V>,
    ) -> Result<()>;

    /// Computes the trial step `s` from `x`.
    fn compute(
        &mut self,
        s: &mut V,
        x: &V,
        obj: &dyn Objective<T, V>,
        bounds: &dyn BoundConstraint<T, V>,
        algo: &mut AlgorithmState<T, V>,
    ) -> Result<()>;

    /// Accepts `s`: moves `x` to `x + s` and refreshes derived data.
    fn update(
        &mut self,
        x: &mut V,
        s: &V,
        obj: &mut dyn Objective<T, V>,
        bounds: &dyn BoundConstraint<T, V>,
        algo: &mut AlgorithmState<T, V>,
    ) -> Result<()>;

    /// Column header of the progress table.
    fn print_header(&self) -> String;

    /// Description of the method.
    fn print_name(&self) -> String;

    /// One row of the progress table, preceded by the name at iteration 0
    /// and by the header when `header` is set.
    fn print(&self, algo: &AlgorithmState<T, V>, header: bool) -> String;
}
