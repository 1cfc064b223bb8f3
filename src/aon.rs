use itertools::Itertools;
use log::trace;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::col::{self, HashMap};
use crate::demand::{Commodity, OdDemand};
use crate::error::SolverResult;
use crate::flow::EdgeFlows;
use crate::network::{Network, NodeIdx};
use crate::primitives::FVal;
use crate::shortest_path::{Oracle, ShortestPathTree};

/// All-or-nothing assignment under the network's current costs.
///
/// Every pair with demand above `demand_eps` whose commodity passes
/// `include` routes its whole demand onto one shortest path. Shortest-path
/// trees are computed in parallel, one per origin; flows are accumulated
/// in demand order afterwards.
pub fn all_or_nothing(
    network: &Network,
    demand: &OdDemand,
    include: impl Fn(Commodity) -> bool,
    demand_eps: FVal,
) -> SolverResult<EdgeFlows> {
    let jobs = demand
        .iter()
        .filter(|&(pair, value)| value > demand_eps && include(pair.commodity(network)))
        .collect_vec();
    let origins: Vec<NodeIdx> = jobs.iter().map(|(pair, _)| pair.origin).unique().collect();

    let oracle = Oracle::for_network(network);
    trace!(
        "AoN over {} pairs from {} origins using {:?}",
        jobs.len(),
        origins.len(),
        oracle
    );
    let trees: Vec<ShortestPathTree> = origins
        .par_iter()
        .map(|&origin| oracle.tree(network, origin))
        .collect::<SolverResult<_>>()?;
    let mut tree_by_origin: HashMap<NodeIdx, &ShortestPathTree> =
        col::map_with_capacity(trees.len());
    for tree in trees.iter() {
        tree_by_origin.insert(tree.origin, tree);
    }

    let mut target = EdgeFlows::zeros(network.num_edges());
    for (pair, value) in jobs {
        let path = tree_by_origin[&pair.origin].path_to(network, pair.destination)?;
        target.add_onto_path(pair.commodity(network), &path.edges, value);
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::CostModel;
    use crate::demand::OdPair;
    use crate::error::SolverError;
    use crate::network::{EdgeSpec, NetworkBuilder};

    #[test]
    fn routes_each_commodity_onto_its_shortest_path() {
        let mut builder = NetworkBuilder::new();
        let direct = builder.edge("1", "2", EdgeSpec::road(1.0, 10.0));
        builder.edge("1", "2", EdgeSpec::road(3.0, 10.0));
        let to_sink = builder.edge("2", "R", EdgeSpec::road(0.1, 1.0));
        builder.rebalancer_sink("R");
        let mut network = builder.build().unwrap();
        network.refresh_costs(&CostModel::default());

        let mut demand = OdDemand::new();
        demand.set_by_id(&network, "1", "2", 5.0).unwrap();
        demand.set_by_id(&network, "2", "R", 2.0).unwrap();
        demand.set_by_id(&network, "1", "R", 1e-9).unwrap();

        let target = all_or_nothing(&network, &demand, |_| true, 1e-6).unwrap();
        assert_eq!(target.get(direct, Commodity::Passenger), 5.0);
        assert_eq!(target.get(to_sink, Commodity::Rebalancer), 2.0);
        assert_eq!(target.get(to_sink, Commodity::Passenger), 0.0);
        assert_eq!(target.get(direct, Commodity::Rebalancer), 0.0);

        let passengers_only =
            all_or_nothing(&network, &demand, |c| c == Commodity::Passenger, 1e-6).unwrap();
        assert_eq!(passengers_only.get(to_sink, Commodity::Rebalancer), 0.0);
        assert_eq!(passengers_only.get(direct, Commodity::Passenger), 5.0);
    }

    #[test]
    fn missing_path_is_an_error() {
        let mut builder = NetworkBuilder::new();
        builder.edge("1", "2", EdgeSpec::road(1.0, 10.0));
        let mut network = builder.build().unwrap();
        network.refresh_costs(&CostModel::default());

        let mut demand = OdDemand::new();
        demand.set(
            OdPair::new(network.node_idx("2").unwrap(), network.node_idx("1").unwrap()),
            1.0,
        );
        assert!(matches!(
            all_or_nothing(&network, &demand, |_| true, 1e-6),
            Err(SolverError::NoPath { .. })
        ));
    }
}
