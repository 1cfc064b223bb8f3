use log::{info, warn};

use crate::budget::Termination;
use crate::frank_wolfe::IterationRecord;
use crate::network::Network;
use crate::rebalance::OuterRecord;
use crate::stats::FlowStats;

/// Diagnostics hook called at every loop boundary. Observers see state but
/// cannot steer the solver.
pub trait Observer {
    fn on_inner_iteration(&mut self, _record: &IterationRecord, _network: &Network) {}

    fn on_line_search_failure(&mut self, _outer_iteration: usize, _iteration: usize) {}

    fn on_inner_finished(
        &mut self,
        _outer_iteration: usize,
        _termination: Termination,
        _stats: &FlowStats,
    ) {
    }

    fn on_outer_iteration(&mut self, _record: &OuterRecord) {}
}

pub struct Silent;

impl Observer for Silent {}

/// Logs every `log_iteration_count`-th inner iteration and every outer one.
pub struct LogObserver {
    pub log_iteration_count: usize,
}

impl Observer for LogObserver {
    fn on_inner_iteration(&mut self, record: &IterationRecord, _network: &Network) {
        if self.log_iteration_count > 0 && record.iteration % self.log_iteration_count == 0 {
            info!(
                "Outer {}, iteration {}: step {:.6}, objective {:.6}, gap {:e} (relative {:e})",
                record.outer_iteration,
                record.iteration,
                record.step,
                record.objective,
                record.duality_gap,
                record.relative_gap
            );
        }
    }

    fn on_line_search_failure(&mut self, outer_iteration: usize, iteration: usize) {
        warn!(
            "Outer {}, iteration {}: objective value unavailable, reported as 0",
            outer_iteration, iteration
        );
    }

    fn on_inner_finished(
        &mut self,
        outer_iteration: usize,
        termination: Termination,
        stats: &FlowStats,
    ) {
        info!(
            "Outer {}: inner loop stopped ({:?}), {:#?}",
            outer_iteration, termination, stats
        );
    }

    fn on_outer_iteration(&mut self, record: &OuterRecord) {
        info!(
            "Outer {}: imbalance change {:e} after {} inner iterations",
            record.iteration, record.imbalance_change, record.inner_iterations
        );
    }
}
