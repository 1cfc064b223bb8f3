use crate::network::{Network, NodeIdx};
use crate::primitives::FVal;

/// Net passenger outflow per node, indexed by [`NodeIdx`].
#[derive(Debug, Clone, PartialEq)]
pub struct Imbalance(Vec<FVal>);

impl Imbalance {
    pub fn zeros(num_nodes: usize) -> Self {
        Imbalance(vec![0.0; num_nodes])
    }

    pub fn from_values(values: Vec<FVal>) -> Self {
        Imbalance(values)
    }

    pub fn get(&self, node_idx: NodeIdx) -> FVal {
        self.0[node_idx.0 as usize]
    }

    pub fn values(&self) -> &[FVal] {
        &self.0
    }

    /// Euclidean distance between two estimates.
    pub fn distance(&self, other: &Imbalance) -> FVal {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<FVal>()
            .sqrt()
    }

    /// `(1-beta)·self + beta·fresh`.
    pub fn smoothed(&self, fresh: &Imbalance, beta: FVal) -> Imbalance {
        Imbalance(
            self.0
                .iter()
                .zip(fresh.0.iter())
                .map(|(old, new)| (1.0 - beta) * old + beta * new)
                .collect(),
        )
    }
}

/// `Σ out f_m - Σ in f_m` per node, over edges that count towards imbalance.
pub fn measure_imbalance(network: &Network) -> Imbalance {
    let mut values = vec![0.0; network.num_nodes()];
    for (edge_idx, edge) in network.edges() {
        if !network.counts_towards_imbalance(edge_idx) {
            continue;
        }
        values[edge.from.0 as usize] += edge.passenger_flow;
        values[edge.to.0 as usize] -= edge.passenger_flow;
    }
    Imbalance(values)
}

/// Measures the imbalance, blends it into `previous` with weight `beta`
/// and stores the result on the nodes.
pub fn estimate_imbalance(network: &mut Network, previous: &Imbalance, beta: FVal) -> Imbalance {
    let estimate = previous.smoothed(&measure_imbalance(network), beta);
    for (idx, &value) in estimate.values().iter().enumerate() {
        network.node_mut(NodeIdx(idx as u32)).imbalance = value;
    }
    estimate
}
