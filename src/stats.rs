use crate::cost::CostModel;
use crate::network::Network;
use crate::primitives::FVal;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowStats {
    pub passenger_volume: FVal,
    pub rebalancer_volume: FVal,
    /// `Σ_e x_e·BPR(x_e)` over usable edges.
    pub total_travel_cost: FVal,
    pub used_edges: usize,
    pub closed_edges: usize,
    /// Largest flow-to-capacity ratio on a usable edge.
    pub max_saturation: FVal,
}

impl FlowStats {
    pub fn compute(network: &Network, model: &CostModel) -> Self {
        let mut stats = FlowStats::default();
        for (_, edge) in network.edges() {
            stats.passenger_volume += edge.passenger_flow;
            stats.rebalancer_volume += edge.rebalancer_flow;
            if !model.is_usable(edge.capacity) {
                stats.closed_edges += 1;
                continue;
            }
            let flow = edge.total_flow();
            if flow > 0.0 {
                stats.used_edges += 1;
            }
            stats.total_travel_cost += model.travel_cost(edge);
            stats.max_saturation = stats.max_saturation.max(flow / edge.capacity);
        }
        stats
    }
}
