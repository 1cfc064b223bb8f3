use std::collections::BinaryHeap;

use crate::col::{self, HashSet};
use crate::network::{Network, NodeIdx};
use crate::primitives::FVal;

use super::ShortestPathTree;

#[derive(Debug, Clone, PartialEq)]
struct QueueItem {
    node_id: NodeIdx,
    dist: FVal,
}
impl Eq for QueueItem {}
impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.node_id.0.cmp(&self.node_id.0))
    }
}

/// Shortest-path tree from `source` over edge costs, which must be
/// non-negative. Ties are broken towards lower node indices, and among
/// equally short paths the first relaxed edge wins.
pub fn dijkstra(network: &Network, source: NodeIdx) -> ShortestPathTree {
    let mut tree = ShortestPathTree::new(source, network.num_nodes());
    let mut settled: HashSet<NodeIdx> = col::set_with_capacity(network.num_nodes());

    let mut queue: BinaryHeap<QueueItem> = BinaryHeap::new();
    queue.push(QueueItem {
        node_id: source,
        dist: 0.0,
    });

    while let Some(QueueItem { node_id, dist }) = queue.pop() {
        if !settled.insert(node_id) {
            continue;
        }
        for &edge_idx in network.node(node_id).outgoing.iter() {
            let edge = network.edge(edge_idx);
            if settled.contains(&edge.to) {
                continue;
            }
            let candidate = dist + edge.cost;
            if tree.relax(edge.to, edge_idx, candidate) {
                queue.push(QueueItem {
                    node_id: edge.to,
                    dist: candidate,
                });
            }
        }
    }

    tree
}
