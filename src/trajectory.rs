use crate::network::{EdgePayload, Network};
use crate::primitives::FVal;

/// Copy of the mutable per-edge and per-node state of a network.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSnapshot {
    pub passenger_flow: Vec<FVal>,
    pub rebalancer_flow: Vec<FVal>,
    pub cost: Vec<FVal>,
    pub capacity: Vec<FVal>,
    pub imbalance: Vec<FVal>,
}

impl FlowSnapshot {
    pub fn capture(network: &Network) -> Self {
        let edges: Vec<&EdgePayload> = network.edges().map(|(_, edge)| edge).collect();
        FlowSnapshot {
            passenger_flow: edges.iter().map(|e| e.passenger_flow).collect(),
            rebalancer_flow: edges.iter().map(|e| e.rebalancer_flow).collect(),
            cost: edges.iter().map(|e| e.cost).collect(),
            capacity: edges.iter().map(|e| e.capacity).collect(),
            imbalance: network.nodes().map(|(_, node)| node.imbalance).collect(),
        }
    }

    /// Smallest flow of either commodity on any edge.
    pub fn min_flow(&self) -> FVal {
        self.passenger_flow
            .iter()
            .chain(self.rebalancer_flow.iter())
            .copied()
            .fold(FVal::INFINITY, FVal::min)
    }
}

/// Append-only sequence of diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory<T> {
    items: Vec<T>,
}

impl<T> Default for Trajectory<T> {
    fn default() -> Self {
        Trajectory { items: Vec::new() }
    }
}

impl<T> Trajectory<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn get(&self, idx: usize) -> Option<&T> {
        self.items.get(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<'a, T> IntoIterator for &'a Trajectory<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{EdgeSpec, NetworkBuilder};

    #[test]
    fn capture_follows_edge_order() {
        let mut builder = NetworkBuilder::new();
        let first = builder.edge("a", "b", EdgeSpec::road(1.0, 2.0));
        let second = builder.edge("b", "a", EdgeSpec::road(3.0, 4.0));
        let mut network = builder.build().unwrap();
        network.edge_mut(first).passenger_flow = 1.5;
        network.edge_mut(second).passenger_flow = 0.5;
        network.edge_mut(second).rebalancer_flow = 0.25;
        network.edge_mut(first).cost = 7.0;
        let b = network.node_idx("b").unwrap();
        network.node_mut(b).imbalance = -1.0;

        let snapshot = FlowSnapshot::capture(&network);
        assert_eq!(snapshot.passenger_flow, vec![1.5, 0.5]);
        assert_eq!(snapshot.rebalancer_flow, vec![0.0, 0.25]);
        assert_eq!(snapshot.cost[0], 7.0);
        assert_eq!(snapshot.capacity, vec![2.0, 4.0]);
        assert_eq!(snapshot.imbalance[b.0 as usize], -1.0);
        assert_eq!(snapshot.min_flow(), 0.0);
    }

    #[test]
    fn trajectory_keeps_push_order() {
        let mut trajectory = Trajectory::new();
        assert!(trajectory.is_empty());
        trajectory.push(1);
        trajectory.push(2);
        assert_eq!(trajectory.len(), 2);
        assert_eq!(trajectory.first(), Some(&1));
        assert_eq!(trajectory.last(), Some(&2));
        assert_eq!(trajectory.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
    }
}
