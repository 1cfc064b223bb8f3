use crate::cost::CostModel;
use crate::demand::Commodity;
use crate::flow::EdgeFlows;
use crate::network::{EdgeIdx, Network};
use crate::primitives::FVal;

/// Cap on the weight of the previous direction point.
pub const MAX_CONJUGATE_WEIGHT: FVal = 0.99;

/// Weight `α` of the previous direction point `s` such that
/// `α·s + (1-α)·y - x` is conjugate to `s - x` under the diagonal Hessian
/// of the objective at the current flow `x`, over the given edges.
///
/// Falls back to 0 (plain Frank-Wolfe) when the ratio is undefined or
/// negative, and is capped at [`MAX_CONJUGATE_WEIGHT`].
pub fn conjugate_weight(
    network: &Network,
    previous: &EdgeFlows,
    target: &EdgeFlows,
    model: &CostModel,
    edges: &[EdgeIdx],
) -> FVal {
    let (mut numerator, mut denominator) = (0.0, 0.0);
    for &edge_idx in edges {
        let edge = network.edge(edge_idx);
        let x = edge.total_flow();
        let curvature = model.weight_derivative(edge.free_flow_cost, x, edge.capacity);
        let s = previous.total(edge_idx);
        let y = target.total(edge_idx);
        numerator += (s - x) * curvature * (y - x);
        denominator += (s - x) * curvature * (y - s);
    }
    let ratio = numerator / denominator;
    if !ratio.is_finite() || ratio < 0.0 {
        0.0
    } else {
        ratio.min(MAX_CONJUGATE_WEIGHT)
    }
}

/// The conjugate direction point: `target` blended with `previous` for the
/// moved commodities. Returns the point and the weight of `previous`.
pub fn conjugate_target(
    network: &Network,
    previous: &EdgeFlows,
    target: &EdgeFlows,
    model: &CostModel,
    edges: &[EdgeIdx],
    commodities: &[Commodity],
) -> (EdgeFlows, FVal) {
    let weight = conjugate_weight(network, previous, target, model, edges);
    let mut blended = target.clone();
    if weight > 0.0 {
        blended.blend(previous, weight, commodities);
    }
    (blended, weight)
}
