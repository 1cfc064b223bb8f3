pub mod aon;
pub mod budget;
pub mod col;
pub mod config;
pub mod cost;
pub mod demand;
pub mod error;
pub mod flow;
pub mod frank_wolfe;
pub mod indexer;
pub mod network;
pub mod observer;
pub mod primitives;
pub mod rebalance;
pub mod shortest_path;
pub mod stats;
pub mod step;
pub mod test;
pub mod trajectory;

pub use config::SolverConfig;
pub use error::{SolverError, SolverResult};
pub use rebalance::{solve, Problem, Solution};
