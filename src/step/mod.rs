pub mod conjugate;
pub mod objective;

use std::fmt::Display;
use std::str::FromStr;

use log::debug;
use unimin::{
    Brent, DerivativeRoot, GoldenSection, MinimizeError, Minimum, ScalarFunction, ScalarMinimizer,
};

use crate::error::SolverError;
use crate::primitives::FVal;

pub use conjugate::conjugate_target;
pub use objective::{objective_edges, LineSearchObjective, ObjectiveTerms};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSearchMethod {
    GoldenSection,
    Brent,
    /// Root of the objective's derivative.
    DerivativeRoot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
    LineSearch(LineSearchMethod),
    /// `2/(k+2)`.
    Fixed,
    /// `2/(k^1.5+2)`.
    FixedAccelerated,
}

impl Default for StepPolicy {
    fn default() -> Self {
        StepPolicy::LineSearch(LineSearchMethod::GoldenSection)
    }
}

impl FromStr for StepPolicy {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "line_search" | "line-search" | "golden" => {
                Ok(StepPolicy::LineSearch(LineSearchMethod::GoldenSection))
            }
            "brent" => Ok(StepPolicy::LineSearch(LineSearchMethod::Brent)),
            "bisection" | "derivative_root" | "derivative-root" => {
                Ok(StepPolicy::LineSearch(LineSearchMethod::DerivativeRoot))
            }
            "fixed" => Ok(StepPolicy::Fixed),
            "fixed_accelerated" | "fixed-accelerated" => Ok(StepPolicy::FixedAccelerated),
            other => Err(SolverError::UnknownStepPolicy(other.to_string())),
        }
    }
}

impl Display for StepPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StepPolicy::LineSearch(LineSearchMethod::GoldenSection) => "line_search",
            StepPolicy::LineSearch(LineSearchMethod::Brent) => "brent",
            StepPolicy::LineSearch(LineSearchMethod::DerivativeRoot) => "derivative_root",
            StepPolicy::Fixed => "fixed",
            StepPolicy::FixedAccelerated => "fixed_accelerated",
        };
        f.write_str(name)
    }
}

/// Diminishing step of iteration `k`, counting from 1.
pub fn fixed_step(k: usize) -> FVal {
    2.0 / (k as FVal + 2.0)
}

pub fn accelerated_step(k: usize) -> FVal {
    2.0 / ((k as FVal).powf(1.5) + 2.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepChoice {
    pub step: FVal,
    pub objective: FVal,
    /// The minimizer failed and the step fell back to `2/(k+2)`.
    pub line_search_failed: bool,
}

/// Picks the step of iteration `k` for the direction encoded in `objective`.
pub fn select_step<S: ScalarFunction<FVal>>(
    policy: StepPolicy,
    k: usize,
    objective: &S,
    tolerance: FVal,
) -> StepChoice {
    let fixed = |step: FVal| StepChoice {
        step,
        objective: objective.value(step),
        line_search_failed: false,
    };
    match policy {
        StepPolicy::Fixed => fixed(fixed_step(k)),
        StepPolicy::FixedAccelerated => fixed(accelerated_step(k)),
        StepPolicy::LineSearch(method) => {
            let result: Result<Minimum<FVal>, MinimizeError> = match method {
                LineSearchMethod::GoldenSection => {
                    GoldenSection::with_tolerance(tolerance).minimize(objective, 0.0, 1.0)
                }
                LineSearchMethod::Brent => {
                    Brent::with_tolerance(tolerance).minimize(objective, 0.0, 1.0)
                }
                LineSearchMethod::DerivativeRoot => {
                    DerivativeRoot::with_tolerance(tolerance).minimize(objective, 0.0, 1.0)
                }
            };
            match result {
                Ok(min) => StepChoice {
                    step: min.argmin.clamp(0.0, 1.0),
                    objective: min.value,
                    line_search_failed: false,
                },
                Err(err) => {
                    debug!("{} line search failed in iteration {}: {}", policy, k, err);
                    StepChoice {
                        step: fixed_step(k),
                        objective: 0.0,
                        line_search_failed: true,
                    }
                }
            }
        }
    }
}
