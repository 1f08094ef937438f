//! Window- and priority-aware tour construction
//!
//! Constrained stops are seeded by urgency, the remainder is chained
//! greedily, and a bounded adjacent-swap pass then cuts cost without ever
//! adding a missed window. Feasibility is judged by the same timing walk
//! that produces the final schedule, so the solver cannot disagree with
//! the reported arrivals.

use tracing::debug;

use crate::services::provider::CostMatrix;
use crate::services::schedule::{walk_route, WalkStop};

use super::config::SolverConfig;
use super::problem::TourProblem;

pub fn solve_with_windows(
    problem: &TourProblem,
    matrix: &CostMatrix,
    config: &SolverConfig,
) -> Vec<usize> {
    let seed = seed_by_urgency(problem, matrix);
    improve_bounded(problem, matrix, seed, config)
}

/// Seed order: constrained stops first (priority descending, then window
/// start ascending, then input order), unconstrained stops chained greedily
/// by duration from wherever the constrained prefix ends.
fn seed_by_urgency(problem: &TourProblem, matrix: &CostMatrix) -> Vec<usize> {
    let mut constrained: Vec<usize> = (0..problem.stops.len())
        .filter(|&i| problem.stops[i].is_constrained())
        .collect();

    constrained.sort_by(|&a, &b| {
        let sa = &problem.stops[a];
        let sb = &problem.stops[b];
        sb.priority
            .cmp(&sa.priority)
            .then_with(|| {
                match (sa.time_window, sb.time_window) {
                    (Some(wa), Some(wb)) => wa.start.cmp(&wb.start),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                }
            })
            .then_with(|| a.cmp(&b))
    });

    let mut order = constrained;
    let mut current = order
        .last()
        .map(|&i| problem.stops[i].matrix_idx)
        .unwrap_or(problem.origin_idx);

    let mut remaining: Vec<usize> = (0..problem.stops.len())
        .filter(|&i| !problem.stops[i].is_constrained())
        .collect();

    while !remaining.is_empty() {
        let mut best_slot = 0;
        let mut best_cost = u64::MAX;
        for (slot, &idx) in remaining.iter().enumerate() {
            let cost = matrix.duration(current, problem.stops[idx].matrix_idx);
            if cost < best_cost {
                best_cost = cost;
                best_slot = slot;
            }
        }
        let next = remaining.swap_remove(best_slot);
        current = problem.stops[next].matrix_idx;
        order.push(next);
    }

    order
}

/// Missed windows and the travel+wait cost of an order, judged by the
/// shared timing walk.
fn evaluate(problem: &TourProblem, matrix: &CostMatrix, order: &[usize]) -> (usize, u64) {
    let walk_stops: Vec<WalkStop> = order.iter().map(|&i| problem.stops[i].walk_stop()).collect();
    let outcome = walk_route(
        problem.depart_at,
        problem.origin_idx,
        problem.return_idx,
        &walk_stops,
        matrix,
    );
    (
        outcome.unserviceable.len(),
        (outcome.total_travel_minutes + outcome.total_wait_minutes) as u64,
    )
}

/// Adjacent-swap improvement. A swap is kept when it removes a missed
/// window, or cuts cost at equal violations; it is never kept when it adds
/// a violation or exceeds the cost tolerance.
fn improve_bounded(
    problem: &TourProblem,
    matrix: &CostMatrix,
    mut order: Vec<usize>,
    config: &SolverConfig,
) -> Vec<usize> {
    let n = order.len();
    if n < 2 {
        return order;
    }

    let (mut violations, mut cost) = evaluate(problem, matrix, &order);
    let tolerance = config.improvement_tolerance_minutes as u64;

    for pass in 0..config.max_improvement_passes {
        let mut improved = false;

        for k in 0..n - 1 {
            order.swap(k, k + 1);
            let (cand_violations, cand_cost) = evaluate(problem, matrix, &order);

            let better = cand_violations < violations
                || (cand_violations == violations && cand_cost < cost);
            let acceptable = cand_violations <= violations && cand_cost <= cost + tolerance;

            if better && acceptable {
                violations = cand_violations;
                cost = cand_cost;
                improved = true;
            } else {
                order.swap(k, k + 1);
            }
        }

        if !improved {
            debug!("Window-aware improvement converged after {} passes", pass + 1);
            break;
        }
    }

    if violations > 0 {
        debug!("{} window(s) cannot be met in the final order", violations);
    }

    order
}
