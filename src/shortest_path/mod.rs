pub mod bellman_ford;
pub mod dijkstra;

use crate::error::{SolverError, SolverResult};
use crate::network::{EdgeIdx, Network, NodeIdx};
use crate::primitives::FVal;

#[derive(Debug, Clone, PartialEq)]
pub struct ShortestPath {
    pub cost: FVal,
    pub edges: Vec<EdgeIdx>,
}

/// Distances and predecessor edges from one origin under the current costs.
#[derive(Debug, Clone)]
pub struct ShortestPathTree {
    pub origin: NodeIdx,
    dist: Vec<Option<FVal>>,
    pred: Vec<Option<EdgeIdx>>,
}

impl ShortestPathTree {
    pub(crate) fn new(origin: NodeIdx, num_nodes: usize) -> Self {
        let mut dist = vec![None; num_nodes];
        dist[origin.0 as usize] = Some(0.0);
        ShortestPathTree {
            origin,
            dist,
            pred: vec![None; num_nodes],
        }
    }

    pub fn distance(&self, node: NodeIdx) -> Option<FVal> {
        self.dist[node.0 as usize]
    }

    /// Relaxes `edge_idx` into `to`; returns whether the label improved.
    pub(crate) fn relax(&mut self, to: NodeIdx, edge_idx: EdgeIdx, candidate: FVal) -> bool {
        if let Some(current) = self.dist[to.0 as usize] {
            if current <= candidate {
                return false;
            }
        }
        self.dist[to.0 as usize] = Some(candidate);
        self.pred[to.0 as usize] = Some(edge_idx);
        true
    }

    pub fn path_to(&self, network: &Network, destination: NodeIdx) -> SolverResult<ShortestPath> {
        let cost = self.distance(destination).ok_or_else(|| SolverError::NoPath {
            origin: network.node_id(self.origin).to_string(),
            destination: network.node_id(destination).to_string(),
        })?;
        let mut edges = Vec::new();
        let mut node = destination;
        while node != self.origin {
            let edge_idx = self.pred[node.0 as usize].ok_or_else(|| SolverError::NoPath {
                origin: network.node_id(self.origin).to_string(),
                destination: network.node_id(destination).to_string(),
            })?;
            edges.push(edge_idx);
            node = network.edge(edge_idx).from;
        }
        edges.reverse();
        Ok(ShortestPath { cost, edges })
    }
}

/// Which shortest-path algorithm is valid for the current costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Oracle {
    Dijkstra,
    /// Needed once inverse-demand edges turn some costs negative.
    BellmanFord,
}

impl Oracle {
    pub fn for_network(network: &Network) -> Self {
        if network.edges().any(|(_, edge)| edge.cost < 0.0) {
            Oracle::BellmanFord
        } else {
            Oracle::Dijkstra
        }
    }

    pub fn tree(&self, network: &Network, origin: NodeIdx) -> SolverResult<ShortestPathTree> {
        match self {
            Oracle::Dijkstra => Ok(dijkstra::dijkstra(network, origin)),
            Oracle::BellmanFord => bellman_ford::bellman_ford(network, origin),
        }
    }

    pub fn shortest_path(
        &self,
        network: &Network,
        origin: NodeIdx,
        destination: NodeIdx,
    ) -> SolverResult<ShortestPath> {
        self.tree(network, origin)?.path_to(network, destination)
    }
}
