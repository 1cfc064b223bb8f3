use unimin::ScalarFunction;

use crate::config::RebalancerObjective;
use crate::cost::CostModel;
use crate::demand::Commodity;
use crate::flow::EdgeFlows;
use crate::network::{EdgeIdx, Network};
use crate::primitives::FVal;

/// Which edges and terms enter the line-search objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectiveTerms {
    pub skip_dummy_edges: bool,
    pub include_potential: bool,
    pub rebalancer: RebalancerObjective,
}

/// Edges of `edge_order` that enter the line-search objective: usable, not
/// into the rebalancer sink and, if requested, not dummy.
pub fn objective_edges(
    network: &Network,
    model: &CostModel,
    edge_order: &[EdgeIdx],
    terms: ObjectiveTerms,
) -> Vec<EdgeIdx> {
    edge_order
        .iter()
        .copied()
        .filter(|&edge_idx| {
            let edge = network.edge(edge_idx);
            model.is_usable(edge.capacity)
                && !network.enters_sink(edge_idx)
                && !(terms.skip_dummy_edges && edge.is_dummy)
        })
        .collect()
}

/// `a ↦ Σ_e F_e(x_e + a·(y_e - x_e))` along the edge order.
///
/// Only the [`objective_edges`] contribute.
pub struct LineSearchObjective<'a> {
    network: &'a Network,
    target: &'a EdgeFlows,
    model: &'a CostModel,
    edges: Vec<EdgeIdx>,
    rebalancer: RebalancerObjective,
    include_potential: bool,
}

struct Term {
    free_flow_cost: FVal,
    capacity: FVal,
    offset: FVal,
    total: (FVal, FVal),
    rebalancer: (FVal, FVal),
}

impl<'a> LineSearchObjective<'a> {
    pub fn new(
        network: &'a Network,
        target: &'a EdgeFlows,
        model: &'a CostModel,
        edge_order: &[EdgeIdx],
        terms: ObjectiveTerms,
    ) -> Self {
        let edges = objective_edges(network, model, edge_order, terms);
        LineSearchObjective {
            network,
            target,
            model,
            edges,
            rebalancer: terms.rebalancer,
            include_potential: terms.include_potential,
        }
    }

    pub fn num_terms(&self) -> usize {
        self.edges.len()
    }

    fn terms(&self) -> impl Iterator<Item = Term> + '_ {
        self.edges.iter().map(move |&edge_idx| {
            let edge = self.network.edge(edge_idx);
            let potential = if self.include_potential {
                self.network.node(edge.to).potential
            } else {
                None
            };
            Term {
                free_flow_cost: edge.free_flow_cost,
                capacity: edge.capacity,
                offset: self.model.offset(edge.sign, potential),
                total: (edge.total_flow(), self.target.total(edge_idx)),
                rebalancer: (
                    edge.rebalancer_flow,
                    self.target.get(edge_idx, Commodity::Rebalancer),
                ),
            }
        })
    }
}

fn along((x, y): (FVal, FVal), a: FVal) -> FVal {
    x + a * (y - x)
}

impl ScalarFunction<FVal> for LineSearchObjective<'_> {
    fn value(&self, a: FVal) -> FVal {
        self.terms()
            .map(|t| {
                let total = along(t.total, a);
                let whole = self.model.edge_objective(t.free_flow_cost, total, t.capacity)
                    + t.offset * total;
                match self.rebalancer {
                    RebalancerObjective::Include => whole,
                    RebalancerObjective::Subtract => {
                        let own = along(t.rebalancer, a);
                        whole
                            - self.model.edge_objective(t.free_flow_cost, own, t.capacity)
                            - t.offset * own
                    }
                }
            })
            .sum()
    }

    fn derivative(&self, a: FVal) -> Option<FVal> {
        let slope = self
            .terms()
            .map(|t| {
                let total = along(t.total, a);
                let whole = (self.model.weight(t.free_flow_cost, total, t.capacity) + t.offset)
                    * (t.total.1 - t.total.0);
                match self.rebalancer {
                    RebalancerObjective::Include => whole,
                    RebalancerObjective::Subtract => {
                        let own = along(t.rebalancer, a);
                        whole
                            - (self.model.weight(t.free_flow_cost, own, t.capacity) + t.offset)
                                * (t.rebalancer.1 - t.rebalancer.0)
                    }
                }
            })
            .sum();
        Some(slope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{EdgeSpec, NetworkBuilder};

    fn setup() -> (Network, EdgeFlows, Vec<EdgeIdx>) {
        let mut builder = NetworkBuilder::new();
        let a = builder.edge("1", "2", EdgeSpec::road(1.0, 4.0));
        let b = builder.edge("1", "2", EdgeSpec::road(1.5, 4.0).inverse_demand());
        let c = builder.edge("1", "2", EdgeSpec::road(1.0, 4.0).dummy());
        let s = builder.edge("2", "R", EdgeSpec::road(0.1, 1.0));
        builder.rebalancer_sink("R").potential("2", 0.7);
        let mut network = builder.build().unwrap();
        network.edge_mut(a).passenger_flow = 3.0;
        network.edge_mut(a).rebalancer_flow = 1.0;
        network.edge_mut(c).passenger_flow = 2.0;
        network.edge_mut(s).rebalancer_flow = 1.0;
        let mut target = EdgeFlows::zeros(4);
        target.add_onto_path(Commodity::Passenger, &[b], 5.0);
        target.add_onto_path(Commodity::Rebalancer, &[b, s], 1.0);
        let order = network.edge_indices().collect();
        (network, target, order)
    }

    fn terms(rebalancer: RebalancerObjective) -> ObjectiveTerms {
        ObjectiveTerms {
            skip_dummy_edges: true,
            include_potential: false,
            rebalancer,
        }
    }

    #[test]
    fn excludes_dummy_and_sink_edges() {
        let (network, target, order) = setup();
        let model = CostModel::default();
        let objective =
            LineSearchObjective::new(&network, &target, &model, &order, terms(RebalancerObjective::Include));
        assert_eq!(objective.num_terms(), 2);

        let with_dummy = LineSearchObjective::new(
            &network,
            &target,
            &model,
            &order,
            ObjectiveTerms {
                skip_dummy_edges: false,
                ..terms(RebalancerObjective::Include)
            },
        );
        assert_eq!(with_dummy.num_terms(), 3);
    }

    #[test]
    fn value_at_zero_matches_current_flows() {
        let (network, target, order) = setup();
        let model = CostModel::default();
        let objective =
            LineSearchObjective::new(&network, &target, &model, &order, terms(RebalancerObjective::Include));
        let expected = model.bpr.integral(1.0, 4.0, 4.0);
        assert!((objective.value(0.0) - expected).abs() < 1e-12);

        let at_one = model.bpr.integral(1.5, 6.0, 4.0) - 80.0 * 6.0;
        assert!((objective.value(1.0) - at_one).abs() < 1e-9);
    }

    #[test]
    fn derivative_matches_finite_difference() {
        let (network, target, order) = setup();
        let model = CostModel::default();
        for mode in [RebalancerObjective::Include, RebalancerObjective::Subtract] {
            let objective = LineSearchObjective::new(&network, &target, &model, &order, terms(mode));
            let h = 1e-6;
            for a in [0.1, 0.5, 0.9] {
                let numeric = (objective.value(a + h) - objective.value(a - h)) / (2.0 * h);
                let analytic = objective.derivative(a).unwrap();
                assert!(
                    (numeric - analytic).abs() < 1e-4 * (1.0 + analytic.abs()),
                    "{:?} at {}: {} vs {}",
                    mode,
                    a,
                    numeric,
                    analytic
                );
            }
        }
    }

    #[test]
    fn subtract_removes_rebalancer_integral() {
        let (network, target, order) = setup();
        let model = CostModel::default();
        let include =
            LineSearchObjective::new(&network, &target, &model, &order, terms(RebalancerObjective::Include));
        let subtract =
            LineSearchObjective::new(&network, &target, &model, &order, terms(RebalancerObjective::Subtract));
        let own = model.bpr.integral(1.0, 1.0, 4.0);
        assert!((include.value(0.0) - subtract.value(0.0) - own).abs() < 1e-12);
    }
}
