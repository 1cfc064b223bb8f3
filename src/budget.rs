use std::time::{Duration, Instant};

/// Why a loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Converged,
    IterationCap,
    TimeLimit,
}

impl Termination {
    pub fn is_converged(&self) -> bool {
        *self == Termination::Converged
    }
}

/// Iteration and wall-clock allowance of one loop.
#[derive(Debug, Clone)]
pub struct Budget {
    max_iterations: usize,
    time_limit: Option<Duration>,
    started: Instant,
}

impl Budget {
    pub fn start(max_iterations: usize, time_limit: Option<Duration>) -> Self {
        Budget {
            max_iterations,
            time_limit,
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Checked after `completed` iterations, before starting the next one.
    pub fn exhausted(&self, completed: usize) -> Option<Termination> {
        if completed >= self.max_iterations {
            return Some(Termination::IterationCap);
        }
        match self.time_limit {
            Some(limit) if self.elapsed() >= limit => Some(Termination::TimeLimit),
            _ => None,
        }
    }
}
