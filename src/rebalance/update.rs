use crate::aon::all_or_nothing;
use crate::config::ElasticBounds;
use crate::demand::{Commodity, OdDemand, OdPair};
use crate::error::SolverResult;
use crate::flow::move_towards;
use crate::network::{EdgeIdx, Network};
use crate::primitives::{FVal, EPS};

use super::imbalance::Imbalance;

/// Every node in deficit sends its deficit to the sink; all other nodes
/// send nothing.
pub fn update_rebalancer_demand(
    network: &Network,
    demand: &mut OdDemand,
    imbalance: &Imbalance,
    eps: FVal,
) {
    let Some(sink) = network.sink() else {
        return;
    };
    for (node_idx, _) in network.nodes() {
        if node_idx == sink {
            continue;
        }
        let ri = imbalance.get(node_idx);
        let value = if ri < -eps { -ri } else { 0.0 };
        demand.set(OdPair::new(node_idx, sink), value);
    }
}

/// Opens each node's sink edge as far as its surplus; nodes without surplus
/// keep a capacity of `eps`. Returns the number of edges updated.
pub fn update_capacities(network: &mut Network, imbalance: &Imbalance, eps: FVal) -> usize {
    let updates: Vec<(EdgeIdx, FVal)> = network
        .nodes()
        .filter(|&(node_idx, _)| !network.is_sink(node_idx) && !network.is_terminal(node_idx))
        .filter_map(|(node_idx, _)| {
            let edge_idx = network.sink_edge(node_idx)?;
            let ri = imbalance.get(node_idx);
            Some((edge_idx, if ri > eps { ri } else { eps }))
        })
        .collect();
    for &(edge_idx, capacity) in updates.iter() {
        network.edge_mut(edge_idx).capacity = capacity;
    }
    updates.len()
}

/// Moves elastic demand bounds towards the flow on their dummy edges
/// whenever the relative error leaves `band`. Returns how many moved.
pub fn adjust_elastic_bounds(
    network: &Network,
    demand: &mut OdDemand,
    band: ElasticBounds,
    rate: FVal,
) -> usize {
    let updates: Vec<(OdPair, FVal)> = demand
        .iter()
        .filter(|(pair, _)| {
            pair.commodity(network) == Commodity::Passenger && network.is_terminal(pair.destination)
        })
        .filter_map(|(pair, bound)| {
            let edge_idx = network.dummy_edge(pair.origin, pair.destination)?;
            let flow = network.edge(edge_idx).passenger_flow;
            let relative = (flow - bound) / bound.max(EPS);
            if band.lower <= relative && relative <= band.upper {
                return None;
            }
            Some((pair, bound + rate * (flow - bound)))
        })
        .collect();
    for &(pair, bound) in updates.iter() {
        demand.set(pair, bound);
    }
    updates.len()
}

/// Assigns the rebalancer demand to current shortest paths and blends it
/// into the rebalancer flow with weight `beta`. Costs are left stale.
pub fn commit_rebalancers(
    network: &mut Network,
    demand: &OdDemand,
    beta: FVal,
    demand_eps: FVal,
) -> SolverResult<()> {
    let target = all_or_nothing(network, demand, |c| c == Commodity::Rebalancer, demand_eps)?;
    let all_edges: Vec<EdgeIdx> = network.edge_indices().collect();
    move_towards(network, &target, beta, &all_edges, &[Commodity::Rebalancer]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::CostModel;
    use crate::network::{EdgeSpec, NetworkBuilder};

    fn star() -> Network {
        let mut builder = NetworkBuilder::new();
        builder.edge("1", "2", EdgeSpec::road(1.0, 10.0));
        builder.edge("2", "1", EdgeSpec::road(1.0, 10.0));
        builder.edge("1", "R", EdgeSpec::road(0.1, 1.0));
        builder.edge("2", "R", EdgeSpec::road(0.1, 1.0));
        builder.edge("t", "R", EdgeSpec::road(0.1, 1.0));
        builder.rebalancer_sink("R").dummy_node("t", "2");
        builder.build().unwrap()
    }

    #[test]
    fn deficits_become_rebalancer_demand_and_surpluses_capacity() {
        let mut network = star();
        let idx = |id: &str| network.node_idx(id).unwrap();
        let (n1, n2, r, t) = (idx("1"), idx("2"), idx("R"), idx("t"));
        let mut values = vec![0.0; network.num_nodes()];
        values[n1.0 as usize] = 3.0;
        values[n2.0 as usize] = -3.0;
        let imbalance = Imbalance::from_values(values);

        let mut demand = OdDemand::new();
        update_rebalancer_demand(&network, &mut demand, &imbalance, 1e-6);
        assert_eq!(demand.get(&OdPair::new(n2, r)), Some(3.0));
        assert_eq!(demand.get(&OdPair::new(n1, r)), Some(0.0));
        assert_eq!(demand.get(&OdPair::new(r, r)), None);

        assert_eq!(update_capacities(&mut network, &imbalance, 1e-6), 2);
        assert_eq!(network.edge(network.sink_edge(n1).unwrap()).capacity, 3.0);
        assert_eq!(network.edge(network.sink_edge(n2).unwrap()).capacity, 1e-6);
        assert_eq!(network.edge(network.sink_edge(t).unwrap()).capacity, 1.0);
    }

    #[test]
    fn committed_rebalancers_follow_open_sink_edges() {
        let mut network = star();
        let model = CostModel::default();
        let idx = |id: &str| network.node_idx(id).unwrap();
        let (n1, n2) = (idx("1"), idx("2"));
        let mut values = vec![0.0; network.num_nodes()];
        values[n1.0 as usize] = 3.0;
        values[n2.0 as usize] = -3.0;
        let imbalance = Imbalance::from_values(values);
        let mut demand = OdDemand::new();
        update_rebalancer_demand(&network, &mut demand, &imbalance, 1e-6);
        update_capacities(&mut network, &imbalance, 1e-6);
        network.refresh_costs(&model);

        commit_rebalancers(&mut network, &demand, 1.0, 1e-6).unwrap();
        let via = network
            .node(n2)
            .outgoing
            .iter()
            .copied()
            .find(|&e| network.edge(e).to == n1)
            .unwrap();
        assert_eq!(network.edge(via).rebalancer_flow, 3.0);
        assert_eq!(network.edge(network.sink_edge(n1).unwrap()).rebalancer_flow, 3.0);
        assert_eq!(network.edge(network.sink_edge(n2).unwrap()).rebalancer_flow, 0.0);

        commit_rebalancers(&mut network, &OdDemand::new(), 0.5, 1e-6).unwrap();
        assert_eq!(network.edge(via).rebalancer_flow, 1.5);
    }

    #[test]
    fn elastic_bounds_track_dummy_flow_outside_band() {
        let mut builder = NetworkBuilder::new();
        let dummy = builder.edge("1", "t", EdgeSpec::road(1.0, 100.0).dummy());
        builder.edge("1", "2", EdgeSpec::road(1.0, 100.0));
        builder.edge("2", "t", EdgeSpec::road(1.0, 100.0));
        builder.dummy_node("t", "2");
        let mut network = builder.build().unwrap();
        network.edge_mut(dummy).passenger_flow = 20.0;

        let band = ElasticBounds {
            lower: -0.1,
            upper: 0.1,
        };
        let mut demand = OdDemand::new();
        let elastic = demand.set_by_id(&network, "1", "t", 60.0).unwrap();
        let plain = demand.set_by_id(&network, "1", "2", 5.0).unwrap();
        assert_eq!(adjust_elastic_bounds(&network, &mut demand, band, 0.5), 1);
        assert_eq!(demand.get(&elastic), Some(40.0));
        assert_eq!(demand.get(&plain), Some(5.0));

        network.edge_mut(dummy).passenger_flow = 41.0;
        assert_eq!(adjust_elastic_bounds(&network, &mut demand, band, 0.5), 0);
        assert_eq!(demand.get(&elastic), Some(40.0));
    }
}
