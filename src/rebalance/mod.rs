pub mod imbalance;
pub mod update;

use log::{debug, info};

use crate::budget::{Budget, Termination};
use crate::col;
use crate::config::{ImbalanceSmoothing, Reseed, SolverConfig};
use crate::demand::OdDemand;
use crate::error::{SolverError, SolverResult};
use crate::frank_wolfe::{FrankWolfe, FrankWolfeOutput};
use crate::network::{EdgeIdx, Network};
use crate::observer::Observer;
use crate::primitives::FVal;
use crate::stats::FlowStats;
use crate::trajectory::{FlowSnapshot, Trajectory};

use imbalance::{estimate_imbalance, Imbalance};

/// Network, initial demand and the edge order used for every
/// order-sensitive summation.
#[derive(Debug, Clone)]
pub struct Problem {
    pub network: Network,
    pub demand: OdDemand,
    pub edge_order: Vec<EdgeIdx>,
}

impl Problem {
    pub fn new(network: Network, demand: OdDemand) -> Self {
        let edge_order = network.edge_indices().collect();
        Problem {
            network,
            demand,
            edge_order,
        }
    }

    pub fn with_edge_order(
        network: Network,
        demand: OdDemand,
        edge_order: Vec<EdgeIdx>,
    ) -> SolverResult<Self> {
        let problem = Problem {
            network,
            demand,
            edge_order,
        };
        problem.validate()?;
        Ok(problem)
    }

    pub fn validate(&self) -> SolverResult<()> {
        self.demand.validate(&self.network)?;
        let num_edges = self.network.num_edges();
        let mut seen = col::set_with_capacity(num_edges);
        let is_permutation = self.edge_order.len() == num_edges
            && self
                .edge_order
                .iter()
                .all(|e| (e.0 as usize) < num_edges && seen.insert(*e));
        if !is_permutation {
            return Err(SolverError::InvalidNetwork(format!(
                "edge order must list each of the {} edges exactly once",
                num_edges
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OuterRecord {
    /// Counts from 1.
    pub iteration: usize,
    /// Euclidean distance to the previous imbalance estimate.
    pub imbalance_change: FVal,
    pub inner_iterations: usize,
    pub inner_termination: Termination,
    pub final_gap: FVal,
    pub stats: FlowStats,
}

#[derive(Debug, Clone)]
pub struct Solution {
    pub network: Network,
    pub demand: OdDemand,
    pub imbalance: Imbalance,
    /// Starts with the all-zero estimate.
    pub imbalance_history: Trajectory<Imbalance>,
    /// Network state after every outer iteration.
    pub outer_trajectory: Trajectory<FlowSnapshot>,
    pub inner_runs: Vec<FrankWolfeOutput>,
    pub records: Trajectory<OuterRecord>,
    pub termination: Termination,
}

/// Alternates inner Frank-Wolfe solves with imbalance re-estimation until
/// the estimate settles or the outer budget runs out.
pub fn solve(
    problem: &Problem,
    config: &SolverConfig,
    observer: &mut dyn Observer,
) -> SolverResult<Solution> {
    config.validate()?;
    problem.validate()?;
    info!("Solving on {}", problem.network.describe());
    debug!("Configuration: {:?}", config);

    let budget = Budget::start(config.max_outer_iterations, config.outer_time_limit);
    let mut network = problem.network.clone();
    let mut demand = problem.demand.clone();
    let mut imbalance = Imbalance::zeros(network.num_nodes());
    let mut imbalance_history = Trajectory::new();
    imbalance_history.push(imbalance.clone());
    let mut outer_trajectory = Trajectory::new();
    let mut inner_runs = Vec::new();
    let mut records = Trajectory::new();

    let mut outer = 0;
    let termination = loop {
        if let Some(reason) = budget.exhausted(outer) {
            break reason;
        }
        outer += 1;

        let reseed = if outer == 1 {
            Reseed::Fresh
        } else {
            config.reseed
        };
        let run = FrankWolfe::new(config, &problem.edge_order)
            .outer_iteration(outer)
            .reseed(reseed)
            .run(&network, &demand, &imbalance, observer)?;

        let beta = match config.smoothing {
            ImbalanceSmoothing::Off => 1.0,
            ImbalanceSmoothing::StepCoupled => run.last_step.unwrap_or(1.0),
        };
        network = run.network.clone();
        demand = run.demand.clone();
        let estimate = estimate_imbalance(&mut network, &imbalance, beta);
        let change = estimate.distance(&imbalance);

        let record = OuterRecord {
            iteration: outer,
            imbalance_change: change,
            inner_iterations: run.records.len(),
            inner_termination: run.termination,
            final_gap: run.final_gap,
            stats: run.stats.clone(),
        };
        observer.on_outer_iteration(&record);

        outer_trajectory.push(FlowSnapshot::capture(&network));
        imbalance_history.push(estimate.clone());
        imbalance = estimate;
        inner_runs.push(run);
        records.push(record);

        if change < config.outer_tolerance {
            break Termination::Converged;
        }
    };

    info!(
        "Outer loop stopped after {} iterations ({:?}) in {:?}",
        outer,
        termination,
        budget.elapsed()
    );
    Ok(Solution {
        network,
        demand,
        imbalance,
        imbalance_history,
        outer_trajectory,
        inner_runs,
        records,
        termination,
    })
}
