//! Solver input and output types

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::services::schedule::WalkStop;
use crate::types::{Stop, TimeWindow};

/// One stop as the solvers see it: constraints plus its matrix position
#[derive(Debug, Clone)]
pub struct SolverStop {
    pub id: Uuid,
    /// Row/column of this stop in the cost matrix
    pub matrix_idx: usize,
    pub service_duration_minutes: u32,
    pub time_window: Option<TimeWindow>,
    pub priority: u32,
}

impl SolverStop {
    pub fn from_stop(stop: &Stop, matrix_idx: usize) -> Self {
        Self {
            id: stop.id,
            matrix_idx,
            service_duration_minutes: stop.service_duration_minutes,
            time_window: stop.time_window,
            priority: stop.priority,
        }
    }

    /// Constrained stops steer the window-aware solver's seed order.
    pub fn is_constrained(&self) -> bool {
        self.time_window.is_some() || self.priority > 0
    }

    pub fn walk_stop(&self) -> WalkStop {
        WalkStop {
            stop_id: self.id,
            matrix_idx: self.matrix_idx,
            service_minutes: self.service_duration_minutes,
            window: self.time_window,
        }
    }
}

/// Open tour problem: visit every stop once, departing from `origin_idx`
/// and closing the tour towards `return_idx`.
#[derive(Debug, Clone)]
pub struct TourProblem {
    pub origin_idx: usize,
    pub return_idx: usize,
    /// Departure from the origin, needed for window feasibility
    pub depart_at: DateTime<Utc>,
    pub stops: Vec<SolverStop>,
}

impl TourProblem {
    pub fn has_constraints(&self) -> bool {
        self.stops.iter().any(|s| s.is_constrained())
    }
}

/// Result of a solve: visit order as indices into `TourProblem::stops`
#[derive(Debug, Clone)]
pub struct TourSolution {
    pub order: Vec<usize>,
    pub algorithm: String,
    pub solve_time_ms: u64,
}
