use log::trace;

use crate::error::{SolverError, SolverResult};
use crate::network::{Network, NodeIdx};

use super::ShortestPathTree;

/// Shortest-path tree from `source` allowing negative edge costs.
///
/// Edges are scanned in index order each round, so the resulting tree is
/// deterministic. Fails if a negative cycle is reachable from `source`.
pub fn bellman_ford(network: &Network, source: NodeIdx) -> SolverResult<ShortestPathTree> {
    let mut tree = ShortestPathTree::new(source, network.num_nodes());

    for round in 0..network.num_nodes() {
        let mut changed = false;
        for (edge_idx, edge) in network.edges() {
            let Some(dist) = tree.distance(edge.from) else {
                continue;
            };
            changed |= tree.relax(edge.to, edge_idx, dist + edge.cost);
        }
        if !changed {
            trace!("Bellman-Ford from {:?} stable after {} rounds", source, round + 1);
            return Ok(tree);
        }
    }

    Err(SolverError::NegativeCycle {
        origin: network.node_id(source).to_string(),
    })
}
