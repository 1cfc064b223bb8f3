use argmin::core::ArgminFloat;
use argmin::solver::goldensectionsearch::GoldenSectionSearch;

use crate::{
    best_of_bracket, check_interval, run_solver, MinimizeError, Minimum, ScalarFunction,
    ScalarMinimizer, Values,
};

/// Golden-section search for unimodal functions.
///
/// The bracket shrinks until it is narrower than `tolerance` relative to
/// the interior points. The endpoints are compared against the result so
/// that minima sitting exactly on the boundary are returned exactly.
#[derive(Debug, Clone, Copy)]
pub struct GoldenSection<F> {
    pub tolerance: F,
    pub max_iterations: usize,
}

impl<F: ArgminFloat> Default for GoldenSection<F> {
    fn default() -> Self {
        GoldenSection {
            tolerance: F::epsilon().sqrt(),
            max_iterations: 200,
        }
    }
}

impl<F: ArgminFloat> GoldenSection<F> {
    pub fn with_tolerance(tolerance: F) -> Self {
        GoldenSection {
            tolerance,
            ..Default::default()
        }
    }
}

impl<F: ArgminFloat> ScalarMinimizer<F> for GoldenSection<F> {
    fn minimize<S: ScalarFunction<F>>(
        &self,
        f: &S,
        lower: F,
        upper: F,
    ) -> Result<Minimum<F>, MinimizeError> {
        check_interval(lower, upper)?;
        if lower == upper {
            return best_of_bracket(f, lower, lower, upper, 0);
        }
        let solver = GoldenSectionSearch::new(lower, upper)
            .and_then(|search| search.with_tolerance(self.tolerance))
            .map_err(|err| MinimizeError::Solver(err.to_string()))?;
        let mid = (lower + upper) / (F::one() + F::one());
        let run = run_solver(Values::of(f), solver, Some(mid), self.max_iterations)?;
        best_of_bracket(f, run.best, lower, upper, run.iterations)
    }
}
