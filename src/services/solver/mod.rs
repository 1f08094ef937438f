//! Tour solvers
//!
//! Dispatch between the unconstrained path (nearest neighbor + 2-opt) and
//! the window-aware path (urgency seed + bounded swap improvement). Both
//! produce an open tour from the problem origin towards its return point.

mod config;
mod problem;
mod time_window;
mod two_opt;

pub use config::SolverConfig;
pub use problem::{SolverStop, TourProblem, TourSolution};

use std::time::Instant;

use tracing::{debug, info};

use crate::services::provider::CostMatrix;

pub struct TourSolver {
    config: SolverConfig,
}

impl TourSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn solve(&self, problem: &TourProblem, matrix: &CostMatrix) -> TourSolution {
        let started_at = Instant::now();

        if problem.stops.is_empty() {
            return TourSolution {
                order: Vec::new(),
                algorithm: "none".to_string(),
                solve_time_ms: 0,
            };
        }

        let (order, algorithm) = if problem.has_constraints() {
            let order = time_window::solve_with_windows(problem, matrix, &self.config);
            (order, "window-aware")
        } else {
            let seed = two_opt::construct_nearest_neighbor(problem, matrix);
            let seed_cost = two_opt::tour_cost(problem, matrix, &seed);
            let order = two_opt::improve_two_opt(
                problem,
                matrix,
                seed,
                self.config.max_improvement_passes,
            );
            debug!(
                "2-opt: {} -> {} meters",
                seed_cost,
                two_opt::tour_cost(problem, matrix, &order)
            );
            (order, "nearest-neighbor-2opt")
        };

        let solve_time_ms = started_at.elapsed().as_millis() as u64;
        info!(
            "Tour solved: {} stops via {} in {} ms",
            problem.stops.len(),
            algorithm,
            solve_time_ms
        );

        TourSolution {
            order,
            algorithm: algorithm.to_string(),
            solve_time_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimeWindow;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn make_stop(matrix_idx: usize) -> SolverStop {
        SolverStop {
            id: Uuid::new_v4(),
            matrix_idx,
            service_duration_minutes: 10,
            time_window: None,
            priority: 0,
        }
    }

    fn make_problem(stops: Vec<SolverStop>) -> TourProblem {
        TourProblem {
            origin_idx: 0,
            return_idx: 0,
            depart_at: Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap(),
            stops,
        }
    }

    fn mock_matrix(size: usize) -> CostMatrix {
        let mut distances = vec![vec![0u64; size]; size];
        let mut durations = vec![vec![0u64; size]; size];
        for i in 0..size {
            for j in 0..size {
                if i != j {
                    let gap = i.abs_diff(j) as u64;
                    distances[i][j] = gap * 10_000;
                    durations[i][j] = gap * 600;
                }
            }
        }
        CostMatrix {
            distances,
            durations,
            size,
            used_live_traffic: false,
        }
    }

    #[test]
    fn test_empty_problem() {
        let solver = TourSolver::new(SolverConfig::default());
        let solution = solver.solve(&make_problem(vec![]), &mock_matrix(1));

        assert!(solution.order.is_empty());
        assert_eq!(solution.algorithm, "none");
    }

    #[test]
    fn test_unconstrained_uses_two_opt_path() {
        let solver = TourSolver::new(SolverConfig::default());
        let problem = make_problem(vec![make_stop(1), make_stop(2), make_stop(3)]);

        let solution = solver.solve(&problem, &mock_matrix(4));

        assert_eq!(solution.algorithm, "nearest-neighbor-2opt");
        // Stops on a line: visit in matrix order
        assert_eq!(solution.order, vec![0, 1, 2]);
    }

    #[test]
    fn test_windows_use_window_aware_path() {
        let solver = TourSolver::new(SolverConfig::default());
        let mut windowed = make_stop(1);
        windowed.time_window = Some(TimeWindow::new(
            Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap(),
        ));
        let problem = make_problem(vec![windowed, make_stop(2)]);

        let solution = solver.solve(&problem, &mock_matrix(3));

        assert_eq!(solution.algorithm, "window-aware");
    }

    #[test]
    fn test_priorities_alone_use_window_aware_path() {
        let solver = TourSolver::new(SolverConfig::default());
        let mut urgent = make_stop(1);
        urgent.priority = 2;
        let problem = make_problem(vec![urgent, make_stop(2)]);

        let solution = solver.solve(&problem, &mock_matrix(3));

        assert_eq!(solution.algorithm, "window-aware");
    }

    #[test]
    fn test_solution_is_permutation() {
        let solver = TourSolver::new(SolverConfig::default());
        let stops: Vec<SolverStop> = (1..=6).map(make_stop).collect();
        let problem = make_problem(stops);

        let solution = solver.solve(&problem, &mock_matrix(7));

        let mut order = solution.order.clone();
        order.sort_unstable();
        assert_eq!(order, vec![0, 1, 2, 3, 4, 5]);
    }
}
