use argmin::core::ArgminFloat;
use argmin::solver::brent::BrentOpt;

use crate::{
    best_of_bracket, check_interval, run_solver, MinimizeError, Minimum, ScalarFunction,
    ScalarMinimizer, Values,
};

/// Brent's method: parabolic interpolation with golden-section fallback.
///
/// Usually needs far fewer evaluations than [`crate::GoldenSection`] on
/// smooth objectives.
#[derive(Debug, Clone, Copy)]
pub struct Brent<F> {
    pub tolerance: F,
    pub max_iterations: usize,
}

impl<F: ArgminFloat> Default for Brent<F> {
    fn default() -> Self {
        Brent {
            tolerance: F::epsilon().sqrt(),
            max_iterations: 200,
        }
    }
}

impl<F: ArgminFloat> Brent<F> {
    pub fn with_tolerance(tolerance: F) -> Self {
        Brent {
            tolerance,
            ..Default::default()
        }
    }
}

impl<F: ArgminFloat> ScalarMinimizer<F> for Brent<F> {
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
        let solver =
            BrentOpt::new(lower, upper).set_tolerance(F::epsilon().sqrt(), self.tolerance);
        let mid = (lower + upper) / (F::one() + F::one());
        let run = run_solver(Values::of(f), solver, Some(mid), self.max_iterations)?;
        best_of_bracket(f, run.best, lower, upper, run.iterations)
    }
}
