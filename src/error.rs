use thiserror::Error;

use crate::primitives::FVal;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("unknown step policy '{0}' (expected line_search, brent, derivative_root, fixed or fixed_accelerated)")]
    UnknownStepPolicy(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid network: {0}")]
    InvalidNetwork(String),

    #[error("unknown node '{0}'")]
    UnknownNode(String),

    #[error("invalid demand {demand} for pair ({origin}, {destination})")]
    InvalidDemand {
        origin: String,
        destination: String,
        demand: FVal,
    },

    #[error("no path from {origin} to {destination}")]
    NoPath { origin: String, destination: String },

    #[error("negative cycle reachable from {origin}")]
    NegativeCycle { origin: String },
}

pub type SolverResult<T> = Result<T, SolverError>;
