//! Forced-endpoint handling
//!
//! Forced first/last stops are pulled out of the solver input and spliced
//! back around the interior order, so the solver only ever shapes the free
//! middle of the tour.

use uuid::Uuid;

use super::solver::SolverStop;

/// Solver input split around the forced endpoints
#[derive(Debug, Clone)]
pub struct ForcedSplit {
    pub forced_first: Option<SolverStop>,
    pub forced_last: Option<SolverStop>,
    /// Stops the solver is free to reorder
    pub interior: Vec<SolverStop>,
}

impl ForcedSplit {
    pub fn has_pins(&self) -> bool {
        self.forced_first.is_some() || self.forced_last.is_some()
    }
}

/// Partition stops into forced endpoints and the free interior.
/// The forced ids are validated against the stop set upstream.
pub fn split_forced(
    stops: Vec<SolverStop>,
    forced_first_id: Option<Uuid>,
    forced_last_id: Option<Uuid>,
) -> ForcedSplit {
    let mut forced_first = None;
    let mut forced_last = None;
    let mut interior = Vec::with_capacity(stops.len());

    for stop in stops {
        if Some(stop.id) == forced_first_id {
            forced_first = Some(stop);
        } else if Some(stop.id) == forced_last_id {
            forced_last = Some(stop);
        } else {
            interior.push(stop);
        }
    }

    ForcedSplit {
        forced_first,
        forced_last,
        interior,
    }
}

/// Final visit order: forced first, solver-ordered interior, forced last.
pub fn splice_order(split: &ForcedSplit, interior_order: &[usize]) -> Vec<SolverStop> {
    let mut order = Vec::with_capacity(split.interior.len() + 2);
    if let Some(first) = &split.forced_first {
        order.push(first.clone());
    }
    for &idx in interior_order {
        order.push(split.interior[idx].clone());
    }
    if let Some(last) = &split.forced_last {
        order.push(last.clone());
    }
    order
}
