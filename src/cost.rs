use clap::ValueEnum;

use crate::network::{EdgePayload, Sign};
use crate::primitives::FVal;

/// Bureau of Public Roads volume-delay function `φ(1 + α(x/κ)^β)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bpr {
    pub alpha: FVal,
    pub beta: FVal,
}

impl Default for Bpr {
    fn default() -> Self {
        Bpr {
            alpha: 0.15,
            beta: 4.0,
        }
    }
}

impl Bpr {
    pub fn cost(&self, free_flow_cost: FVal, flow: FVal, capacity: FVal) -> FVal {
        free_flow_cost * (1.0 + self.alpha * (flow / capacity).powf(self.beta))
    }

    /// `∫₀ˣ cost`.
    pub fn integral(&self, free_flow_cost: FVal, flow: FVal, capacity: FVal) -> FVal {
        free_flow_cost
            * (flow
                + self.alpha / (self.beta + 1.0) * flow.powf(self.beta + 1.0)
                    / capacity.powf(self.beta))
    }

    pub fn derivative(&self, free_flow_cost: FVal, flow: FVal, capacity: FVal) -> FVal {
        free_flow_cost * self.alpha * self.beta * flow.powf(self.beta - 1.0)
            / capacity.powf(self.beta)
    }

    /// Zero where it does not exist, i.e. at zero flow for `β < 2`.
    pub fn second_derivative(&self, free_flow_cost: FVal, flow: FVal, capacity: FVal) -> FVal {
        if self.beta == 1.0 || (flow <= 0.0 && self.beta < 2.0) {
            return 0.0;
        }
        free_flow_cost * self.alpha * self.beta * (self.beta - 1.0) * flow.powf(self.beta - 2.0)
            / capacity.powf(self.beta)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Objective {
    /// Beckmann potential; edges are weighted by their travel cost.
    UserEquilibrium,
    /// Total travel cost; edges are weighted by their marginal cost.
    SystemOptimum,
    /// `(1-w)·UE + w·SO` with `w` = [`CostModel::system_share`].
    Combined,
}

/// Everything needed to turn an edge's flow into its cost.
#[derive(Debug, Clone, PartialEq)]
pub struct CostModel {
    pub bpr: Bpr,
    pub objective: Objective,
    /// Weight of the system-optimum part of [`Objective::Combined`].
    pub system_share: FVal,
    /// Subtracted from the cost of inverse-demand edges.
    pub inverse_demand_shift: FVal,
    /// Edges with a capacity below this are closed.
    pub capacity_floor: FVal,
    pub sentinel_cost: FVal,
}

impl Default for CostModel {
    fn default() -> Self {
        CostModel {
            bpr: Bpr::default(),
            objective: Objective::UserEquilibrium,
            system_share: 0.5,
            inverse_demand_shift: 80.0,
            capacity_floor: 1e-5,
            sentinel_cost: 1e22,
        }
    }
}

impl CostModel {
    pub fn is_usable(&self, capacity: FVal) -> bool {
        capacity >= self.capacity_floor
    }

    /// Gradient of the objective with respect to the edge's flow, before
    /// the inverse-demand shift and potential are applied.
    fn system_weight(&self) -> FVal {
        match self.objective {
            Objective::UserEquilibrium => 0.0,
            Objective::SystemOptimum => 1.0,
            Objective::Combined => self.system_share,
        }
    }

    pub fn weight(&self, free_flow_cost: FVal, flow: FVal, capacity: FVal) -> FVal {
        let cost = self.bpr.cost(free_flow_cost, flow, capacity);
        match self.system_weight() {
            w if w == 0.0 => cost,
            w => cost + w * flow * self.bpr.derivative(free_flow_cost, flow, capacity),
        }
    }

    /// Derivative of [`CostModel::weight`] in the flow.
    pub fn weight_derivative(&self, free_flow_cost: FVal, flow: FVal, capacity: FVal) -> FVal {
        let slope = self.bpr.derivative(free_flow_cost, flow, capacity);
        match self.system_weight() {
            w if w == 0.0 => slope,
            w => {
                slope
                    + w * (slope
                        + flow * self.bpr.second_derivative(free_flow_cost, flow, capacity))
            }
        }
    }

    /// Objective contribution of `flow` on an edge, before the inverse-demand
    /// shift and potential are applied.
    pub fn edge_objective(&self, free_flow_cost: FVal, flow: FVal, capacity: FVal) -> FVal {
        let w = self.system_weight();
        let mut value = 0.0;
        if w < 1.0 {
            value += (1.0 - w) * self.bpr.integral(free_flow_cost, flow, capacity);
        }
        if w > 0.0 {
            value += w * flow * self.bpr.cost(free_flow_cost, flow, capacity);
        }
        value
    }

    /// Constant per-unit term added to an edge's weight.
    pub fn offset(&self, sign: Sign, potential: Option<FVal>) -> FVal {
        let shift = match sign {
            Sign::Positive => 0.0,
            Sign::Negative => -self.inverse_demand_shift,
        };
        shift + potential.unwrap_or(0.0)
    }

    /// Current cost of `edge` given the potential of its head node.
    pub fn edge_cost(&self, edge: &EdgePayload, potential: Option<FVal>) -> FVal {
        if !self.is_usable(edge.capacity) {
            return self.sentinel_cost;
        }
        self.weight(edge.free_flow_cost, edge.total_flow(), edge.capacity)
            + self.offset(edge.sign, potential)
    }

    /// Travel time spent by all flow on the edge.
    pub fn travel_cost(&self, edge: &EdgePayload) -> FVal {
        let flow = edge.total_flow();
        flow * self.bpr.cost(edge.free_flow_cost, flow, edge.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NodeIdx;

    fn edge(free_flow_cost: FVal, capacity: FVal, flow: FVal, sign: Sign) -> EdgePayload {
        EdgePayload {
            from: NodeIdx(0),
            to: NodeIdx(1),
            free_flow_cost,
            capacity,
            sign,
            is_dummy: false,
            passenger_flow: flow,
            rebalancer_flow: 0.0,
            cost: 0.0,
        }
    }

    #[test]
    fn bpr_values() {
        let bpr = Bpr::default();
        assert_eq!(bpr.cost(2.0, 0.0, 10.0), 2.0);
        assert!((bpr.cost(1.0, 10.0, 10.0) - 1.15).abs() < 1e-12);
        assert!((bpr.integral(1.0, 10.0, 10.0) - (10.0 + 0.03 * 10.0)).abs() < 1e-9);
        assert!((bpr.derivative(1.0, 10.0, 10.0) - 0.06).abs() < 1e-12);
    }

    #[test]
    fn integral_is_nondecreasing_and_convex() {
        let bpr = Bpr::default();
        let h = 1e-2;
        for (phi, kappa) in [(1.0, 10.0), (2.5, 0.5), (0.1, 100.0)] {
            let f = |x: FVal| bpr.integral(phi, x, kappa);
            for i in 1..200 {
                let x = i as FVal * 0.25;
                assert!(f(x + h) >= f(x), "decreasing at {}", x);
                let second = f(x + h) - 2.0 * f(x) + f(x - h);
                assert!(second >= -1e-9, "concave at {}: {}", x, second);
            }
        }
    }

    #[test]
    fn integral_derivative_matches_cost() {
        let bpr = Bpr::default();
        let h = 1e-5;
        for x in [0.5, 3.0, 12.0] {
            let numeric = (bpr.integral(1.3, x + h, 7.0) - bpr.integral(1.3, x - h, 7.0)) / (2.0 * h);
            assert!((numeric - bpr.cost(1.3, x, 7.0)).abs() < 1e-5);
        }
    }

    #[test]
    fn edge_cost_applies_shift_potential_and_sentinel() {
        let model = CostModel::default();
        let plain = edge(1.0, 10.0, 0.0, Sign::Positive);
        assert_eq!(model.edge_cost(&plain, None), 1.0);
        assert_eq!(model.edge_cost(&plain, Some(0.5)), 1.5);

        let shifted = edge(1.0, 10.0, 0.0, Sign::Negative);
        assert_eq!(model.edge_cost(&shifted, None), 1.0 - 80.0);

        let closed = edge(1.0, 1e-6, 3.0, Sign::Positive);
        assert_eq!(model.edge_cost(&closed, Some(4.0)), model.sentinel_cost);
    }

    #[test]
    fn system_optimum_uses_marginal_cost() {
        let model = CostModel {
            objective: Objective::SystemOptimum,
            ..Default::default()
        };
        let loaded = edge(1.0, 10.0, 10.0, Sign::Positive);
        assert!((model.edge_cost(&loaded, None) - (1.15 + 10.0 * 0.06)).abs() < 1e-12);
        assert!((model.edge_objective(1.0, 10.0, 10.0) - 11.5).abs() < 1e-12);
        assert!((model.travel_cost(&loaded) - 11.5).abs() < 1e-12);
    }

    #[test]
    fn combined_objective_interpolates() {
        let with = |objective| CostModel {
            objective,
            system_share: 0.25,
            ..Default::default()
        };
        let (ue, so, mixed) = (
            with(Objective::UserEquilibrium),
            with(Objective::SystemOptimum),
            with(Objective::Combined),
        );
        let (phi, x, kappa) = (1.3, 6.0, 4.0);
        let blend = |a: FVal, b: FVal| 0.75 * a + 0.25 * b;
        assert!(
            (mixed.weight(phi, x, kappa) - blend(ue.weight(phi, x, kappa), so.weight(phi, x, kappa)))
                .abs()
                < 1e-12
        );
        assert!(
            (mixed.edge_objective(phi, x, kappa)
                - blend(ue.edge_objective(phi, x, kappa), so.edge_objective(phi, x, kappa)))
            .abs()
                < 1e-12
        );

        let h = 1e-6;
        let numeric = (mixed.edge_objective(phi, x + h, kappa)
            - mixed.edge_objective(phi, x - h, kappa))
            / (2.0 * h);
        assert!((numeric - mixed.weight(phi, x, kappa)).abs() < 1e-6);
    }

    #[test]
    fn weight_derivative_matches_finite_difference() {
        let h = 1e-6;
        for objective in [
            Objective::UserEquilibrium,
            Objective::SystemOptimum,
            Objective::Combined,
        ] {
            let model = CostModel {
                objective,
                ..Default::default()
            };
            for x in [0.5, 3.0, 12.0] {
                let numeric =
                    (model.weight(1.3, x + h, 7.0) - model.weight(1.3, x - h, 7.0)) / (2.0 * h);
                let analytic = model.weight_derivative(1.3, x, 7.0);
                assert!(
                    (numeric - analytic).abs() < 1e-5 * (1.0 + analytic.abs()),
                    "{:?} at {}",
                    objective,
                    x
                );
            }
        }

        let linear = Bpr {
            alpha: 0.15,
            beta: 1.0,
        };
        assert_eq!(linear.second_derivative(1.0, 0.0, 1.0), 0.0);
        let steep = Bpr {
            alpha: 0.15,
            beta: 1.5,
        };
        assert_eq!(steep.second_derivative(1.0, 0.0, 1.0), 0.0);
    }
}
