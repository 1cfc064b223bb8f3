use log::{debug, trace};
use unimin::ScalarFunction;

use crate::aon::all_or_nothing;
use crate::budget::{Budget, Termination};
use crate::config::{Direction, ImbalanceSmoothing, RebalancerRouting, Reseed, SolverConfig};
use crate::demand::{Commodity, OdDemand};
use crate::error::SolverResult;
use crate::flow::{duality_gap, linearized_cost, move_towards, set_flows, EdgeFlows};
use crate::network::{EdgeIdx, Network};
use crate::observer::Observer;
use crate::primitives::{FVal, EPS};
use crate::rebalance::imbalance::Imbalance;
use crate::rebalance::update::{
    adjust_elastic_bounds, commit_rebalancers, update_capacities, update_rebalancer_demand,
};
use crate::stats::FlowStats;
use crate::step::{
    conjugate_target, objective_edges, select_step, LineSearchObjective, ObjectiveTerms,
};
use crate::trajectory::{FlowSnapshot, Trajectory};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationRecord {
    pub outer_iteration: usize,
    /// Counts from 1.
    pub iteration: usize,
    pub step: FVal,
    pub objective: FVal,
    /// Gap measured before the step was taken.
    pub duality_gap: FVal,
    pub relative_gap: FVal,
    pub line_search_failed: bool,
}

#[derive(Debug, Clone)]
pub struct FrankWolfeOutput {
    pub network: Network,
    /// Initial state followed by the state after every iteration.
    pub trajectory: Trajectory<FlowSnapshot>,
    /// All-or-nothing targets of the iterations that took a step.
    pub targets: Trajectory<EdgeFlows>,
    pub records: Trajectory<IterationRecord>,
    /// Demand in effect during every iteration.
    pub demand_history: Trajectory<OdDemand>,
    pub demand: OdDemand,
    pub termination: Termination,
    pub last_step: Option<FVal>,
    pub final_gap: FVal,
    pub stats: FlowStats,
}

/// One inner solve for a fixed imbalance estimate.
pub struct FrankWolfe<'a> {
    config: &'a SolverConfig,
    edge_order: &'a [EdgeIdx],
    outer_iteration: usize,
    reseed: Reseed,
}

impl<'a> FrankWolfe<'a> {
    pub fn new(config: &'a SolverConfig, edge_order: &'a [EdgeIdx]) -> Self {
        FrankWolfe {
            config,
            edge_order,
            outer_iteration: 0,
            reseed: Reseed::Fresh,
        }
    }

    pub fn outer_iteration(mut self, outer_iteration: usize) -> Self {
        self.outer_iteration = outer_iteration;
        self
    }

    pub fn reseed(mut self, reseed: Reseed) -> Self {
        self.reseed = reseed;
        self
    }

    fn optimizes_rebalancers(&self) -> bool {
        self.config.rebalancer_routing == RebalancerRouting::Optimized
    }

    fn moved_commodities(&self) -> &'static [Commodity] {
        if self.optimizes_rebalancers() {
            &[Commodity::Passenger, Commodity::Rebalancer]
        } else {
            &[Commodity::Passenger]
        }
    }

    fn refresh(&self, network: &mut Network) {
        if self.config.drop_flow_on_unusable_edges {
            let dropped = network.drop_unusable_rebalancer_flow(&self.config.cost);
            if dropped > 0 {
                trace!("Dropped rebalancer flow on {} closed edges", dropped);
            }
        }
        network.refresh_costs(&self.config.cost);
    }

    /// Loads the starting flow according to the reseed policy.
    fn initialize(&self, network: &mut Network, demand: &OdDemand) -> SolverResult<()> {
        let eps = self.config.demand_eps;
        match self.reseed {
            Reseed::Fresh => {
                network.reset_flows();
                network.refresh_costs(&self.config.cost);
                let initial = all_or_nothing(network, demand, |_| true, eps)?;
                set_flows(network, &initial);
            }
            Reseed::WarmStart => {
                let mut passengers = EdgeFlows::zeros(network.num_edges());
                passengers.copy_from_network(network, Commodity::Passenger);
                set_flows(network, &passengers);
                network.refresh_costs(&self.config.cost);
                let rebalancers =
                    all_or_nothing(network, demand, |c| c == Commodity::Rebalancer, eps)?;
                let all_edges: Vec<EdgeIdx> = network.edge_indices().collect();
                move_towards(network, &rebalancers, 1.0, &all_edges, &[Commodity::Rebalancer]);
            }
        }
        self.refresh(network);
        Ok(())
    }

    /// Conjugate direction point for the all-or-nothing `target`, or the
    /// target itself if the blend is not a descent direction.
    fn conjugate_point(
        &self,
        network: &Network,
        previous: &EdgeFlows,
        target: &EdgeFlows,
        terms: ObjectiveTerms,
    ) -> EdgeFlows {
        let model = &self.config.cost;
        let edges = objective_edges(network, model, self.edge_order, terms);
        let (point, weight) =
            conjugate_target(network, previous, target, model, &edges, self.moved_commodities());
        if weight == 0.0 {
            return point;
        }
        let slope = LineSearchObjective::new(network, &point, model, self.edge_order, terms)
            .derivative(0.0)
            .unwrap_or(FVal::INFINITY);
        if slope < 0.0 {
            trace!("Conjugate weight {:.4}", weight);
            point
        } else {
            target.clone()
        }
    }

    pub fn run(
        &self,
        start: &Network,
        demand: &OdDemand,
        imbalance: &Imbalance,
        observer: &mut dyn Observer,
    ) -> SolverResult<FrankWolfeOutput> {
        let config = self.config;
        let model = &config.cost;
        let mut network = start.clone();
        let mut demand = demand.clone();

        update_rebalancer_demand(&network, &mut demand, imbalance, config.imbalance_eps);
        update_capacities(&mut network, imbalance, config.imbalance_eps);
        self.initialize(&mut network, &demand)?;

        let terms = ObjectiveTerms {
            skip_dummy_edges: config.skip_dummy_edges_in_objective,
            include_potential: config.potential_in_objective,
            rebalancer: config.rebalancer_objective,
        };

        let mut trajectory = Trajectory::new();
        trajectory.push(FlowSnapshot::capture(&network));
        let mut targets = Trajectory::new();
        let mut records = Trajectory::new();
        let mut demand_history = Trajectory::new();

        let budget = Budget::start(config.max_inner_iterations, config.inner_time_limit);
        let mut last_step: Option<FVal> = None;
        // Direction point of the previous iteration.
        let mut previous_point: Option<EdgeFlows> = None;
        let mut final_gap = FVal::INFINITY;
        let mut k = 0;
        let termination = loop {
            if let Some(reason) = budget.exhausted(k) {
                break reason;
            }
            k += 1;

            if let (Some(band), Some(rate)) = (config.elastic_bounds, last_step) {
                let adjusted = adjust_elastic_bounds(&network, &mut demand, band, rate);
                if adjusted > 0 {
                    trace!("Iteration {}: adjusted {} elastic bounds", k, adjusted);
                }
            }

            if !self.optimizes_rebalancers() {
                let beta = match config.smoothing {
                    ImbalanceSmoothing::Off => 1.0,
                    ImbalanceSmoothing::StepCoupled => last_step.unwrap_or(1.0),
                };
                commit_rebalancers(&mut network, &demand, beta, config.demand_eps)?;
                self.refresh(&mut network);
            }

            let optimized = self.optimizes_rebalancers();
            let mut target = all_or_nothing(
                &network,
                &demand,
                |c| optimized || c == Commodity::Passenger,
                config.demand_eps,
            )?;
            if !optimized {
                target.copy_from_network(&network, Commodity::Rebalancer);
            }

            let gap = duality_gap(&network, &target, model);
            let relative_gap = gap / linearized_cost(&network, model).abs().max(EPS);
            final_gap = gap;
            if gap <= config.gap_tolerance {
                debug!(
                    "Outer {} converged after {} iterations, gap {:e}",
                    self.outer_iteration,
                    k - 1,
                    gap
                );
                break Termination::Converged;
            }

            let point = match (config.direction, previous_point.take()) {
                (Direction::Conjugate, Some(previous)) => {
                    self.conjugate_point(&network, &previous, &target, terms)
                }
                _ => target.clone(),
            };

            let choice = {
                let objective =
                    LineSearchObjective::new(&network, &point, model, self.edge_order, terms);
                select_step(config.step, k, &objective, config.line_search_tolerance)
            };
            if choice.line_search_failed {
                observer.on_line_search_failure(self.outer_iteration, k);
            }

            move_towards(
                &mut network,
                &point,
                choice.step,
                self.edge_order,
                self.moved_commodities(),
            );
            self.refresh(&mut network);
            last_step = Some(choice.step);

            let record = IterationRecord {
                outer_iteration: self.outer_iteration,
                iteration: k,
                step: choice.step,
                objective: choice.objective,
                duality_gap: gap,
                relative_gap,
                line_search_failed: choice.line_search_failed,
            };
            observer.on_inner_iteration(&record, &network);
            records.push(record);
            trajectory.push(FlowSnapshot::capture(&network));
            targets.push(target);
            demand_history.push(demand.clone());
            previous_point = Some(point);
        };

        let stats = FlowStats::compute(&network, model);
        observer.on_inner_finished(self.outer_iteration, termination, &stats);
        Ok(FrankWolfeOutput {
            network,
            trajectory,
            targets,
            records,
            demand_history,
            demand,
            termination,
            last_step,
            final_gap,
            stats,
        })
    }
}
