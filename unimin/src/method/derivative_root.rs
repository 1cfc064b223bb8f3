use argmin::core::ArgminFloat;
use argmin::solver::brent::BrentRoot;

use crate::{
    check_interval, finite_or_err, run_solver, MinimizeError, Minimum, ScalarFunction,
    ScalarMinimizer, Slope,
};

/// Minimizes a convex function by finding the root of its derivative.
///
/// If the derivative does not change sign on the interval, the
/// corresponding endpoint is returned without iterating.
#[derive(Debug, Clone, Copy)]
pub struct DerivativeRoot<F> {
    pub tolerance: F,
    pub max_iterations: usize,
}

impl<F: ArgminFloat> Default for DerivativeRoot<F> {
    fn default() -> Self {
        DerivativeRoot {
            tolerance: F::epsilon().sqrt(),
            max_iterations: 200,
        }
    }
}

impl<F: ArgminFloat> DerivativeRoot<F> {
    pub fn with_tolerance(tolerance: F) -> Self {
        DerivativeRoot {
            tolerance,
            ..Default::default()
        }
    }
}

impl<F: ArgminFloat> ScalarMinimizer<F> for DerivativeRoot<F> {
    fn minimize<S: ScalarFunction<F>>(
        &self,
        f: &S,
        lower: F,
        upper: F,
    ) -> Result<Minimum<F>, MinimizeError> {
        check_interval(lower, upper)?;
        let slope = |x: F| -> Result<F, MinimizeError> {
            let d = f.derivative(x).ok_or(MinimizeError::MissingDerivative)?;
            finite_or_err(d, x)
        };
        let at = |x: F, iterations: usize| -> Result<Minimum<F>, MinimizeError> {
            Ok(Minimum {
                argmin: x,
                value: finite_or_err(f.value(x), x)?,
                iterations,
            })
        };

        if slope(lower)? >= F::zero() {
            return at(lower, 0);
        }
        if slope(upper)? <= F::zero() {
            return at(upper, 0);
        }

        let solver = BrentRoot::new(lower, upper, self.tolerance);
        let mid = (lower + upper) / (F::one() + F::one());
        let run = run_solver(Slope::of(f), solver, Some(mid), self.max_iterations)?;
        at(run.last.max(lower).min(upper), run.iterations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FnObjective;

    struct Parabola {
        center: f64,
    }

    impl ScalarFunction<f64> for Parabola {
        fn value(&self, x: f64) -> f64 {
            (x - self.center).powi(2)
        }

        fn derivative(&self, x: f64) -> Option<f64> {
            Some(2.0 * (x - self.center))
        }
    }

    #[test]
    fn finds_root_of_derivative() {
        let min = DerivativeRoot::with_tolerance(1e-10)
            .minimize(&Parabola { center: 0.7 }, 0.0, 1.0)
            .unwrap();
        assert!((min.argmin - 0.7).abs() < 1e-7);
        assert!(min.iterations > 0);
    }

    #[test]
    fn clamps_to_endpoints() {
        let left = DerivativeRoot::default()
            .minimize(&Parabola { center: -2.0 }, 0.0, 1.0)
            .unwrap();
        assert_eq!(left.argmin, 0.0);
        assert_eq!(left.iterations, 0);

        let right = DerivativeRoot::default()
            .minimize(&Parabola { center: 3.0 }, 0.0, 1.0)
            .unwrap();
        assert_eq!(right.argmin, 1.0);
    }

    #[test]
    fn needs_derivative() {
        let f = FnObjective(|x: f64| x * x);
        assert_eq!(
            DerivativeRoot::default().minimize(&f, 0.0, 1.0),
            Err(MinimizeError::MissingDerivative)
        );
    }
}
