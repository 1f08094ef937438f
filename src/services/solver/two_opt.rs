//! Nearest-neighbor construction and 2-opt improvement
//!
//! The unconstrained solving path. Tours are shaped by distance; durations
//! only matter once time windows are involved.

use tracing::debug;

use crate::services::provider::CostMatrix;

use super::problem::TourProblem;

/// Greedy seed: repeatedly visit the nearest unvisited stop, starting from
/// the problem origin. Ties keep the earliest input index.
pub fn construct_nearest_neighbor(problem: &TourProblem, matrix: &CostMatrix) -> Vec<usize> {
    let n = problem.stops.len();
    let mut order = Vec::with_capacity(n);
    let mut visited = vec![false; n];
    let mut current = problem.origin_idx;

    for _ in 0..n {
        let mut best = None;
        let mut best_cost = u64::MAX;
        for (idx, stop) in problem.stops.iter().enumerate() {
            if visited[idx] {
                continue;
            }
            let cost = matrix.distance(current, stop.matrix_idx);
            if cost < best_cost {
                best_cost = cost;
                best = Some(idx);
            }
        }

        if let Some(next) = best {
            visited[next] = true;
            order.push(next);
            current = problem.stops[next].matrix_idx;
        } else {
            break;
        }
    }

    order
}

/// First-improvement 2-opt sweeps.
///
/// Reversing `order[i..=j]` replaces edges (prev(i), at(i)) and
/// (at(j), next(j)) with (prev(i), at(j)) and (at(i), next(j)); the move is
/// kept when the new edge pair is strictly shorter. Position 0 borders the
/// origin and the final position borders the return point, so the closing
/// edge participates in every exchange.
pub fn improve_two_opt(
    problem: &TourProblem,
    matrix: &CostMatrix,
    mut order: Vec<usize>,
    max_passes: usize,
) -> Vec<usize> {
    let n = order.len();
    if n < 2 {
        return order;
    }

    for pass in 0..max_passes {
        let mut improved = false;

        for i in 0..n - 1 {
            for j in i + 1..n {
                let before = if i == 0 {
                    problem.origin_idx
                } else {
                    problem.stops[order[i - 1]].matrix_idx
                };
                let after = if j == n - 1 {
                    problem.return_idx
                } else {
                    problem.stops[order[j + 1]].matrix_idx
                };
                let first = problem.stops[order[i]].matrix_idx;
                let last = problem.stops[order[j]].matrix_idx;

                // Sentinel legs sit near u64::MAX; saturate so a partially
                // unroutable matrix cannot overflow the edge sums.
                let current = matrix
                    .distance(before, first)
                    .saturating_add(matrix.distance(last, after));
                let candidate = matrix
                    .distance(before, last)
                    .saturating_add(matrix.distance(first, after));

                if candidate < current {
                    order[i..=j].reverse();
                    improved = true;
                }
            }
        }

        if !improved {
            debug!("2-opt converged after {} passes", pass + 1);
            break;
        }
    }

    order
}

/// Total tour distance: origin lead-in, inter-stop legs, closing edge.
pub fn tour_cost(problem: &TourProblem, matrix: &CostMatrix, order: &[usize]) -> u64 {
    let mut cost = 0u64;
    let mut prev = problem.origin_idx;
    for &idx in order {
        cost = cost.saturating_add(matrix.distance(prev, problem.stops[idx].matrix_idx));
        prev = problem.stops[idx].matrix_idx;
    }
    if !order.is_empty() {
        cost = cost.saturating_add(matrix.distance(prev, problem.return_idx));
    }
    cost
}
