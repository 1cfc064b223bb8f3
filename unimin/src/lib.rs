pub mod method;

use std::marker::PhantomData;

use argmin::core::{ArgminFloat, CostFunction, Executor, Solver, State};
use num_traits::Float;
use thiserror::Error;

pub use method::brent::Brent;
pub use method::derivative_root::DerivativeRoot;
pub use method::golden_section::GoldenSection;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MinimizeError {
    #[error("invalid search interval [{lower}, {upper}]")]
    InvalidInterval { lower: f64, upper: f64 },

    #[error("objective is not finite at {at}")]
    NonFinite { at: f64 },

    #[error("method requires a derivative but the objective does not provide one")]
    MissingDerivative,

    #[error("solver failed: {0}")]
    Solver(String),
}

/// A function of one variable.
///
/// `derivative` is optional; methods that need it report
/// [`MinimizeError::MissingDerivative`] when it is absent.
pub trait ScalarFunction<F: Float> {
    fn value(&self, x: F) -> F;

    fn derivative(&self, _x: F) -> Option<F> {
        None
    }
}

/// Wraps a closure as a [`ScalarFunction`] without derivative.
pub struct FnObjective<G>(pub G);

impl<F: Float, G: Fn(F) -> F> ScalarFunction<F> for FnObjective<G> {
    fn value(&self, x: F) -> F {
        (self.0)(x)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Minimum<F> {
    pub argmin: F,
    pub value: F,
    pub iterations: usize,
}

pub trait ScalarMinimizer<F: Float> {
    fn minimize<S: ScalarFunction<F>>(
        &self,
        f: &S,
        lower: F,
        upper: F,
    ) -> Result<Minimum<F>, MinimizeError>;
}

pub(crate) fn check_interval<F: Float>(lower: F, upper: F) -> Result<(), MinimizeError> {
    if !lower.is_finite() || !upper.is_finite() || lower > upper {
        return Err(MinimizeError::InvalidInterval {
            lower: lower.to_f64().unwrap_or(f64::NAN),
            upper: upper.to_f64().unwrap_or(f64::NAN),
        });
    }
    Ok(())
}

pub(crate) fn finite_or_err<F: Float>(value: F, at: F) -> Result<F, MinimizeError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(MinimizeError::NonFinite {
            at: at.to_f64().unwrap_or(f64::NAN),
        })
    }
}

/// The value of a [`ScalarFunction`] as an argmin cost.
pub(crate) struct Values<'a, S, F> {
    f: &'a S,
    marker: PhantomData<F>,
}

impl<'a, S, F> Values<'a, S, F> {
    pub(crate) fn of(f: &'a S) -> Self {
        Values {
            f,
            marker: PhantomData,
        }
    }
}

impl<S: ScalarFunction<F>, F: ArgminFloat> CostFunction for Values<'_, S, F> {
    type Param = F;
    type Output = F;

    fn cost(&self, x: &F) -> Result<F, argmin::core::Error> {
        finite_or_err(self.f.value(*x), *x).map_err(argmin::core::Error::new)
    }
}

/// The derivative of a [`ScalarFunction`] as an argmin cost, for root finding.
pub(crate) struct Slope<'a, S, F> {
    f: &'a S,
    marker: PhantomData<F>,
}

impl<'a, S, F> Slope<'a, S, F> {
    pub(crate) fn of(f: &'a S) -> Self {
        Slope {
            f,
            marker: PhantomData,
        }
    }
}

impl<S: ScalarFunction<F>, F: ArgminFloat> CostFunction for Slope<'_, S, F> {
    type Param = F;
    type Output = F;

    fn cost(&self, x: &F) -> Result<F, argmin::core::Error> {
        let d = self
            .f
            .derivative(*x)
            .ok_or(MinimizeError::MissingDerivative)
            .and_then(|d| finite_or_err(d, *x));
        d.map_err(argmin::core::Error::new)
    }
}

fn from_solver_error(err: argmin::core::Error) -> MinimizeError {
    match err.downcast::<MinimizeError>() {
        Ok(err) => err,
        Err(err) => MinimizeError::Solver(err.to_string()),
    }
}

pub(crate) type ScalarState<F> = argmin::core::IterState<F, (), (), (), (), F>;

pub(crate) struct SolverRun<F> {
    /// Parameter with the lowest cost seen.
    pub best: F,
    /// Parameter of the final iterate.
    pub last: F,
    pub iterations: usize,
}

/// Runs an argmin solver on a scalar problem.
pub(crate) fn run_solver<O, M, F>(
    problem: O,
    solver: M,
    start: Option<F>,
    max_iterations: usize,
) -> Result<SolverRun<F>, MinimizeError>
where
    O: CostFunction<Param = F, Output = F>,
    M: Solver<O, ScalarState<F>>,
    F: ArgminFloat,
{
    let result = Executor::new(problem, solver)
        .configure(|state| {
            let state = state.max_iters(max_iterations as u64);
            match start {
                Some(x) => state.param(x),
                None => state,
            }
        })
        .run()
        .map_err(from_solver_error)?;
    let state = result.state();
    let missing = || MinimizeError::Solver("no parameter was evaluated".to_string());
    let last = state.get_param().copied().ok_or_else(missing)?;
    Ok(SolverRun {
        best: state.get_best_param().copied().unwrap_or(last),
        last,
        iterations: state.get_iter() as usize,
    })
}

/// Compares the interior candidate against both endpoints, so that minima
/// on the boundary are returned exactly.
pub(crate) fn best_of_bracket<F: Float, S: ScalarFunction<F>>(
    f: &S,
    candidate: F,
    lower: F,
    upper: F,
    iterations: usize,
) -> Result<Minimum<F>, MinimizeError> {
    let mut best = Minimum {
        argmin: candidate,
        value: finite_or_err(f.value(candidate), candidate)?,
        iterations,
    };
    for x in [lower, upper] {
        let value = finite_or_err(f.value(x), x)?;
        if value < best.value {
            best.argmin = x;
            best.value = value;
        }
    }
    Ok(best)
}
