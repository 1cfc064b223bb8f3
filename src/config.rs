use std::time::Duration;

use clap::ValueEnum;

use crate::cost::CostModel;
use crate::error::{SolverError, SolverResult};
use crate::primitives::FVal;
use crate::step::StepPolicy;

/// How the imbalance estimate follows the passenger flow between outer
/// iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImbalanceSmoothing {
    /// Replace the estimate with the fresh measurement.
    Off,
    /// Blend with weight equal to the last accepted inner step.
    StepCoupled,
}

/// Starting flow of every inner run after the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Reseed {
    /// Zero all flows and load every pair onto its shortest path.
    Fresh,
    /// Keep the previous passenger flow and reload only the rebalancers.
    WarmStart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RebalancerRouting {
    /// Rebalancer pairs are part of the linearized subproblem and move with
    /// the convex combination.
    Optimized,
    /// Rebalancer demand is committed to current shortest paths at the start
    /// of every inner iteration.
    Committed,
}

/// Treatment of rebalancer flow in the line-search objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RebalancerObjective {
    /// Integrate costs over the total flow.
    Include,
    /// Integrate over the total flow and subtract the rebalancers' own
    /// integral.
    Subtract,
}

/// Search direction of the inner iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Direction {
    /// Towards the all-or-nothing target.
    Plain,
    /// Towards a blend of the all-or-nothing target and the previous
    /// direction point, chosen to be conjugate to the previous direction
    /// with respect to the objective's Hessian.
    Conjugate,
}

/// Tolerance band `[lower, upper]` for the relative error between an
/// elastic demand bound and the flow on its dummy edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElasticBounds {
    pub lower: FVal,
    pub upper: FVal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    pub cost: CostModel,
    pub step: StepPolicy,
    pub direction: Direction,
    pub line_search_tolerance: FVal,

    /// Pairs with demand at or below this are not assigned.
    pub demand_eps: FVal,
    /// Threshold below which an imbalance counts as zero; also the
    /// capacity given to sink edges of nodes without surplus.
    pub imbalance_eps: FVal,

    pub gap_tolerance: FVal,
    pub max_inner_iterations: usize,
    pub inner_time_limit: Option<Duration>,

    pub outer_tolerance: FVal,
    pub max_outer_iterations: usize,
    pub outer_time_limit: Option<Duration>,

    pub smoothing: ImbalanceSmoothing,
    pub reseed: Reseed,
    pub rebalancer_routing: RebalancerRouting,
    pub rebalancer_objective: RebalancerObjective,
    pub skip_dummy_edges_in_objective: bool,
    pub potential_in_objective: bool,
    pub drop_flow_on_unusable_edges: bool,
    pub elastic_bounds: Option<ElasticBounds>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            cost: CostModel::default(),
            step: StepPolicy::default(),
            direction: Direction::Plain,
            line_search_tolerance: 1e-10,
            demand_eps: 1e-6,
            imbalance_eps: 1e-6,
            gap_tolerance: 1e-6,
            max_inner_iterations: 50,
            inner_time_limit: None,
            outer_tolerance: 1e-6,
            max_outer_iterations: 20,
            outer_time_limit: None,
            smoothing: ImbalanceSmoothing::Off,
            reseed: Reseed::Fresh,
            rebalancer_routing: RebalancerRouting::Committed,
            rebalancer_objective: RebalancerObjective::Include,
            skip_dummy_edges_in_objective: true,
            potential_in_objective: false,
            drop_flow_on_unusable_edges: true,
            elastic_bounds: None,
        }
    }
}

fn invalid<T>(message: impl Into<String>) -> SolverResult<T> {
    Err(SolverError::InvalidConfig(message.into()))
}

impl SolverConfig {
    pub fn validate(&self) -> SolverResult<()> {
        let non_negative = [
            ("line_search_tolerance", self.line_search_tolerance),
            ("demand_eps", self.demand_eps),
            ("imbalance_eps", self.imbalance_eps),
            ("gap_tolerance", self.gap_tolerance),
            ("outer_tolerance", self.outer_tolerance),
            ("bpr.alpha", self.cost.bpr.alpha),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return invalid(format!("{} must be finite and non-negative, got {}", name, value));
            }
        }
        if !(self.cost.bpr.beta.is_finite() && self.cost.bpr.beta >= 1.0) {
            return invalid(format!(
                "bpr.beta must be at least 1 for a convex objective, got {}",
                self.cost.bpr.beta
            ));
        }
        if !(self.cost.capacity_floor > 0.0 && self.cost.capacity_floor.is_finite()) {
            return invalid("capacity_floor must be positive");
        }
        if !(self.cost.sentinel_cost > 0.0 && self.cost.sentinel_cost.is_finite()) {
            return invalid("sentinel_cost must be positive and finite");
        }
        if !(0.0..=1.0).contains(&self.cost.system_share) {
            return invalid(format!(
                "system_share must lie in [0, 1], got {}",
                self.cost.system_share
            ));
        }
        if !self.cost.inverse_demand_shift.is_finite() {
            return invalid("inverse_demand_shift must be finite");
        }
        if self.max_inner_iterations == 0 || self.max_outer_iterations == 0 {
            return invalid("iteration caps must be positive");
        }
        if let Some(bounds) = self.elastic_bounds {
            if !(bounds.lower.is_finite() && bounds.upper.is_finite() && bounds.lower <= bounds.upper)
            {
                return invalid(format!(
                    "elastic band [{}, {}] is not a finite interval",
                    bounds.lower, bounds.upper
                ));
            }
            if self.reseed == Reseed::WarmStart {
                return invalid("warm starts cannot be combined with elastic demand bounds");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(SolverConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_inconsistent_settings() {
        let cases = [
            SolverConfig {
                gap_tolerance: -1.0,
                ..Default::default()
            },
            SolverConfig {
                max_outer_iterations: 0,
                ..Default::default()
            },
            SolverConfig {
                elastic_bounds: Some(ElasticBounds {
                    lower: 0.1,
                    upper: -0.1,
                }),
                ..Default::default()
            },
            SolverConfig {
                elastic_bounds: Some(ElasticBounds {
                    lower: -0.1,
                    upper: 0.1,
                }),
                reseed: Reseed::WarmStart,
                ..Default::default()
            },
        ];
        for config in cases {
            assert!(matches!(
                config.validate(),
                Err(SolverError::InvalidConfig(_))
            ));
        }

        let mut concave = SolverConfig::default();
        concave.cost.bpr.beta = 0.5;
        assert!(concave.validate().is_err());
        let mut no_floor = SolverConfig::default();
        no_floor.cost.capacity_floor = 0.0;
        assert!(no_floor.validate().is_err());
        let mut overweight = SolverConfig::default();
        overweight.cost.system_share = 1.5;
        assert!(overweight.validate().is_err());
    }
}
