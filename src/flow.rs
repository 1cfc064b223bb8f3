use std::fmt::Write;

use crate::cost::CostModel;
use crate::demand::Commodity;
use crate::network::{EdgeIdx, Network};
use crate::primitives::FVal;

/// Flow per edge, split by commodity.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeFlows {
    passenger: Vec<FVal>,
    rebalancer: Vec<FVal>,
}

impl EdgeFlows {
    pub fn zeros(num_edges: usize) -> Self {
        EdgeFlows {
            passenger: vec![0.0; num_edges],
            rebalancer: vec![0.0; num_edges],
        }
    }

    /// The flows currently stored on the network's edges.
    pub fn of_network(network: &Network) -> Self {
        let (passenger, rebalancer) = network
            .edges()
            .map(|(_, edge)| (edge.passenger_flow, edge.rebalancer_flow))
            .unzip();
        EdgeFlows {
            passenger,
            rebalancer,
        }
    }

    pub fn num_edges(&self) -> usize {
        self.passenger.len()
    }

    pub fn commodity(&self, commodity: Commodity) -> &[FVal] {
        match commodity {
            Commodity::Passenger => &self.passenger,
            Commodity::Rebalancer => &self.rebalancer,
        }
    }

    fn commodity_mut(&mut self, commodity: Commodity) -> &mut Vec<FVal> {
        match commodity {
            Commodity::Passenger => &mut self.passenger,
            Commodity::Rebalancer => &mut self.rebalancer,
        }
    }

    pub fn get(&self, edge_idx: EdgeIdx, commodity: Commodity) -> FVal {
        self.commodity(commodity)[edge_idx.0 as usize]
    }

    pub fn total(&self, edge_idx: EdgeIdx) -> FVal {
        self.passenger[edge_idx.0 as usize] + self.rebalancer[edge_idx.0 as usize]
    }

    pub fn add_onto_path(&mut self, commodity: Commodity, path: &[EdgeIdx], value: FVal) {
        let flows = self.commodity_mut(commodity);
        for &edge_idx in path {
            flows[edge_idx.0 as usize] += value;
        }
    }

    /// Overwrites one commodity with the values stored on the network.
    pub fn copy_from_network(&mut self, network: &Network, commodity: Commodity) {
        let flows = self.commodity_mut(commodity);
        for (edge_idx, edge) in network.edges() {
            flows[edge_idx.0 as usize] = match commodity {
                Commodity::Passenger => edge.passenger_flow,
                Commodity::Rebalancer => edge.rebalancer_flow,
            };
        }
    }

    /// `self ← weight·other + (1-weight)·self` for the given commodities.
    pub fn blend(&mut self, other: &EdgeFlows, weight: FVal, commodities: &[Commodity]) {
        for &commodity in commodities {
            let theirs = other.commodity(commodity);
            for (own, &value) in self.commodity_mut(commodity).iter_mut().zip(theirs) {
                *own = weight * value + (1.0 - weight) * *own;
            }
        }
    }

    pub fn describe(&self, network: &Network) -> String {
        let mut out = String::new();
        for (edge_idx, edge) in network.edges() {
            let fm = self.get(edge_idx, Commodity::Passenger);
            let fr = self.get(edge_idx, Commodity::Rebalancer);
            if fm == 0.0 && fr == 0.0 {
                continue;
            }
            let _ = writeln!(
                out,
                "{} -> {}: passengers {:.4}, rebalancers {:.4}",
                network.node_id(edge.from),
                network.node_id(edge.to),
                fm,
                fr
            );
        }
        out
    }
}

/// Writes `flows` onto the network's edges.
pub fn set_flows(network: &mut Network, flows: &EdgeFlows) {
    for idx in 0..network.num_edges() {
        let edge_idx = EdgeIdx(idx as u32);
        let edge = network.edge_mut(edge_idx);
        edge.passenger_flow = flows.passenger[idx];
        edge.rebalancer_flow = flows.rebalancer[idx];
    }
}

/// Convex combination `f ← (1-step)·f + step·y` for the given commodities,
/// visiting edges in `edge_order`. Non-negative inputs stay non-negative.
pub fn move_towards(
    network: &mut Network,
    target: &EdgeFlows,
    step: FVal,
    edge_order: &[EdgeIdx],
    commodities: &[Commodity],
) {
    for &edge_idx in edge_order {
        let idx = edge_idx.0 as usize;
        let edge = network.edge_mut(edge_idx);
        for &commodity in commodities {
            match commodity {
                Commodity::Passenger => {
                    edge.passenger_flow =
                        (1.0 - step) * edge.passenger_flow + step * target.passenger[idx];
                }
                Commodity::Rebalancer => {
                    edge.rebalancer_flow =
                        (1.0 - step) * edge.rebalancer_flow + step * target.rebalancer[idx];
                }
            }
        }
    }
}

/// `Σ (x_e - y_e)·cost_e` over usable edges, with total flows.
pub fn duality_gap(network: &Network, target: &EdgeFlows, model: &CostModel) -> FVal {
    network
        .edges()
        .filter(|(_, edge)| model.is_usable(edge.capacity))
        .map(|(edge_idx, edge)| (edge.total_flow() - target.total(edge_idx)) * edge.cost)
        .sum()
}

/// `Σ x_e·cost_e` over usable edges; normalizes the duality gap.
pub fn linearized_cost(network: &Network, model: &CostModel) -> FVal {
    network
        .edges()
        .filter(|(_, edge)| model.is_usable(edge.capacity))
        .map(|(_, edge)| edge.total_flow() * edge.cost)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{EdgeSpec, NetworkBuilder};

    fn two_links() -> (Network, EdgeIdx, EdgeIdx) {
        let mut builder = NetworkBuilder::new();
        let a = builder.edge("1", "2", EdgeSpec::road(1.0, 10.0));
        let b = builder.edge("1", "2", EdgeSpec::road(2.0, 10.0));
        (builder.build().unwrap(), a, b)
    }

    #[test]
    fn convex_combination_per_commodity() {
        let (mut network, a, b) = two_links();
        network.edge_mut(a).passenger_flow = 4.0;
        network.edge_mut(a).rebalancer_flow = 2.0;
        let mut target = EdgeFlows::zeros(2);
        target.add_onto_path(Commodity::Passenger, &[b], 8.0);
        target.add_onto_path(Commodity::Rebalancer, &[b], 6.0);

        let order: Vec<_> = network.edge_indices().collect();
        move_towards(&mut network, &target, 0.25, &order, &[Commodity::Passenger]);
        assert_eq!(network.edge(a).passenger_flow, 3.0);
        assert_eq!(network.edge(b).passenger_flow, 2.0);
        assert_eq!(network.edge(a).rebalancer_flow, 2.0);
        assert_eq!(network.edge(b).rebalancer_flow, 0.0);

        move_towards(&mut network, &target, 1.0, &order, &[Commodity::Rebalancer]);
        assert_eq!(network.edge(a).rebalancer_flow, 0.0);
        assert_eq!(network.edge(b).rebalancer_flow, 6.0);
    }

    #[test]
    fn blend_touches_only_listed_commodities() {
        let (_, a, b) = two_links();
        let mut mine = EdgeFlows::zeros(2);
        mine.add_onto_path(Commodity::Passenger, &[a], 4.0);
        mine.add_onto_path(Commodity::Rebalancer, &[a], 1.0);
        let mut theirs = EdgeFlows::zeros(2);
        theirs.add_onto_path(Commodity::Passenger, &[b], 4.0);
        theirs.add_onto_path(Commodity::Rebalancer, &[b], 3.0);

        mine.blend(&theirs, 0.25, &[Commodity::Passenger]);
        assert_eq!(mine.commodity(Commodity::Passenger), &[3.0, 1.0]);
        assert_eq!(mine.commodity(Commodity::Rebalancer), &[1.0, 0.0]);
    }

    #[test]
    fn duality_gap_of_all_or_nothing_target() {
        let (mut network, a, b) = two_links();
        let model = CostModel::default();
        network.edge_mut(b).passenger_flow = 5.0;
        network.refresh_costs(&model);

        let mut target = EdgeFlows::zeros(2);
        target.add_onto_path(Commodity::Passenger, &[a], 5.0);
        let cost_b = network.edge(b).cost;
        let expected = 5.0 * cost_b - 5.0 * network.edge(a).cost;
        assert!((duality_gap(&network, &target, &model) - expected).abs() < 1e-12);
        assert!(duality_gap(&network, &target, &model) > 0.0);
        assert!((linearized_cost(&network, &model) - 5.0 * cost_b).abs() < 1e-12);

        set_flows(&mut network, &target);
        assert_eq!(EdgeFlows::of_network(&network), target);
    }
}
