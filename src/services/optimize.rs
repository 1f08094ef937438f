//! Route optimization entry point
//!
//! Orchestrates one optimization pass: boundary validation, the
//! fingerprint skip guard, cost matrix fetch, endpoint pinning, the tour
//! solver, and the final timing walk that turns an order into a schedule.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::OptimizerConfig;
use crate::error::{OptimizeError, ProviderError};
use crate::types::{
    CostMode, OptimizationResult, OptimizeRequest, RouteWarning, WARNING_PARTIAL_MATRIX,
};

use super::fingerprint::fingerprint_stops;
use super::pinning;
use super::provider::{CostProvider, EstimateProvider, MatrixApiClient};
use super::schedule::{walk_route, WalkStop};
use super::solver::{SolverStop, TourProblem, TourSolver};

pub struct RouteOptimizer {
    config: OptimizerConfig,
    estimate: Arc<dyn CostProvider>,
    service: Option<Arc<dyn CostProvider>>,
}

impl RouteOptimizer {
    /// Build an optimizer from configuration. Service mode is available
    /// when a matrix service URL is configured.
    pub fn new(config: OptimizerConfig) -> Self {
        let estimate: Arc<dyn CostProvider> = Arc::new(EstimateProvider::with_params(
            config.road_coefficient,
            config.average_speed_kmh,
        ));
        let service: Option<Arc<dyn CostProvider>> = config.matrix_api_url.as_ref().map(|url| {
            Arc::new(MatrixApiClient::new(config.matrix_api_config(url))) as Arc<dyn CostProvider>
        });

        Self {
            config,
            estimate,
            service,
        }
    }

    /// Build an optimizer with a caller-supplied service-mode provider.
    pub fn with_service_provider(
        config: OptimizerConfig,
        service: Arc<dyn CostProvider>,
    ) -> Self {
        let estimate: Arc<dyn CostProvider> = Arc::new(EstimateProvider::with_params(
            config.road_coefficient,
            config.average_speed_kmh,
        ));

        Self {
            config,
            estimate,
            service: Some(service),
        }
    }

    fn provider_for(&self, mode: CostMode) -> Result<&Arc<dyn CostProvider>, ProviderError> {
        match mode {
            CostMode::Estimate => Ok(&self.estimate),
            CostMode::Service => self.service.as_ref().ok_or(ProviderError::NotConfigured),
        }
    }

    pub async fn optimize(
        &self,
        request: &OptimizeRequest,
    ) -> Result<OptimizationResult, OptimizeError> {
        let started_at = Instant::now();

        request.validate()?;

        // Skip only when nothing changed and no endpoint pins were added;
        // pins reshape the tour even for an identical stop set.
        let fingerprint = fingerprint_stops(&request.stops);
        let skip_allowed = !request.force
            && request.forced_first_id.is_none()
            && request.forced_last_id.is_none();
        if skip_allowed && request.previous_fingerprint.as_deref() == Some(fingerprint.as_str()) {
            info!(
                "Stop set unchanged since {}, skipping optimization",
                request
                    .optimized_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "the previous run".to_string())
            );
            return Ok(OptimizationResult::skipped(fingerprint));
        }

        let provider = self.provider_for(request.mode)?;
        let depart_at = request.departure();

        // Depot is row 0; stops follow in input order.
        let mut locations = Vec::with_capacity(request.stops.len() + 1);
        locations.push(request.depot.coordinates);
        locations.extend(request.stops.iter().map(|s| s.coordinates));

        debug!(
            "Requesting cost matrix for {} locations via {}",
            locations.len(),
            provider.name()
        );
        let matrix = provider.matrix(&locations, depart_at).await?;

        let mut warnings: Vec<RouteWarning> = Vec::new();
        if matrix.has_unreachable_cells() {
            warn!("Cost matrix has unroutable legs");
            warnings.push(RouteWarning {
                stop_id: None,
                warning_type: WARNING_PARTIAL_MATRIX.to_string(),
                message: "Some legs could not be routed; affected stops may be unserviceable"
                    .to_string(),
            });
        }

        let solver_stops: Vec<SolverStop> = request
            .stops
            .iter()
            .enumerate()
            .map(|(i, stop)| SolverStop::from_stop(stop, i + 1))
            .collect();

        let split = pinning::split_forced(
            solver_stops,
            request.forced_first_id,
            request.forced_last_id,
        );

        let origin_idx = split
            .forced_first
            .as_ref()
            .map(|s| s.matrix_idx)
            .unwrap_or(0);
        let return_idx = split
            .forced_last
            .as_ref()
            .map(|s| s.matrix_idx)
            .unwrap_or(0);

        // The interior tour departs once the forced first stop is serviced.
        let interior_depart = match &split.forced_first {
            Some(first) => {
                let prefix = [first.walk_stop()];
                walk_route(depart_at, 0, 0, &prefix, &matrix).finish_at
            }
            None => depart_at,
        };

        let problem = TourProblem {
            origin_idx,
            return_idx,
            depart_at: interior_depart,
            stops: split.interior.clone(),
        };
        let solver = TourSolver::new(self.config.solver.clone());
        let solution = solver.solve(&problem, &matrix);

        // One walk over the full spliced order produces the schedule,
        // totals, and the depot return leg.
        let final_order = pinning::splice_order(&split, &solution.order);
        let walk_stops: Vec<WalkStop> = final_order.iter().map(|s| s.walk_stop()).collect();
        let outcome = walk_route(depart_at, 0, 0, &walk_stops, &matrix);

        warnings.extend(outcome.warnings);

        let result = OptimizationResult {
            order: final_order.iter().map(|s| s.id).collect(),
            stops: outcome.stops,
            total_distance_meters: outcome.total_distance_meters,
            total_duration_minutes: outcome.total_duration_minutes,
            total_wait_minutes: outcome.total_wait_minutes,
            unserviceable_stops: outcome.unserviceable,
            warnings,
            used_live_traffic: matrix.used_live_traffic,
            has_time_windows: request.has_time_windows(),
            has_priority_stops: request.has_priority_stops(),
            return_to_depot: outcome.return_leg,
            fingerprint,
            already_optimized: false,
            algorithm: solution.algorithm,
            solve_time_ms: started_at.elapsed().as_millis() as u64,
        };

        info!(
            "Route optimized: {} stops, {:.1} km, {} min, {} unserviceable ({})",
            result.order.len(),
            result.total_distance_meters as f64 / 1000.0,
            result.total_duration_minutes,
            result.unserviceable_stops.len(),
            result.algorithm
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InputError;
    use crate::services::provider::{CostMatrix, LegCost, UNREACHABLE_COST};
    use crate::types::{Coordinates, Depot, Stop, TimeWindow};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, min, 0).unwrap()
    }

    fn make_stop(lat: f64, lng: f64) -> Stop {
        Stop {
            id: Uuid::new_v4(),
            coordinates: Coordinates::new(lat, lng),
            service_duration_minutes: 10,
            time_window: None,
            priority: 0,
        }
    }

    fn make_request(stops: Vec<Stop>, mode: CostMode) -> OptimizeRequest {
        OptimizeRequest {
            depot: Depot {
                coordinates: Coordinates::new(0.0, 0.0),
                departure_at: at(8, 0),
                default_service_minutes: 30,
            },
            stops,
            forced_first_id: None,
            forced_last_id: None,
            depart_at: None,
            mode,
            previous_fingerprint: None,
            optimized_at: None,
            force: false,
        }
    }

    fn uniform_matrix(size: usize, dist_m: u64, dur_s: u64) -> CostMatrix {
        let mut distances = vec![vec![0u64; size]; size];
        let mut durations = vec![vec![0u64; size]; size];
        for i in 0..size {
            for j in 0..size {
                if i != j {
                    distances[i][j] = dist_m;
                    durations[i][j] = dur_s;
                }
            }
        }
        CostMatrix {
            distances,
            durations,
            size,
            used_live_traffic: true,
        }
    }

    /// Serves a fixed matrix and counts provider calls.
    struct FixedMatrixProvider {
        matrix: CostMatrix,
        calls: AtomicUsize,
    }

    impl FixedMatrixProvider {
        fn new(matrix: CostMatrix) -> Self {
            Self {
                matrix,
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CostProvider for FixedMatrixProvider {
        async fn matrix(
            &self,
            _locations: &[Coordinates],
            _depart_at: DateTime<Utc>,
        ) -> Result<CostMatrix, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.matrix.clone())
        }

        async fn leg(
            &self,
            _from: Coordinates,
            _to: Coordinates,
            _depart_at: DateTime<Utc>,
        ) -> Result<LegCost, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(LegCost {
                distance_meters: 0,
                duration_seconds: 0,
                used_live_traffic: true,
            })
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl CostProvider for FailingProvider {
        async fn matrix(
            &self,
            _locations: &[Coordinates],
            _depart_at: DateTime<Utc>,
        ) -> Result<CostMatrix, ProviderError> {
            Err(ProviderError::Timeout)
        }

        async fn leg(
            &self,
            _from: Coordinates,
            _to: Coordinates,
            _depart_at: DateTime<Utc>,
        ) -> Result<LegCost, ProviderError> {
            Err(ProviderError::Timeout)
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    // ------------------------------------------------------------------
    // Tour shape
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_unit_square_perimeter_tour() {
        // Depot and three stops on the corners of a one-degree square at
        // the equator; the only non-crossing tour is the perimeter.
        let a = make_stop(0.0, 1.0);
        let b = make_stop(1.0, 1.0);
        let c = make_stop(1.0, 0.0);
        let expected = vec![a.id, b.id, c.id];

        let optimizer = RouteOptimizer::new(OptimizerConfig::default());
        let request = make_request(vec![a, b, c], CostMode::Estimate);

        let result = optimizer.optimize(&request).await.unwrap();

        assert_eq!(result.order, expected);
        assert_eq!(result.algorithm, "nearest-neighbor-2opt");
        assert!(!result.used_live_traffic);

        // Perimeter: four sides of ~111 km, road coefficient 1.3
        let total_km = result.total_distance_meters as f64 / 1000.0;
        assert!(total_km > 570.0 && total_km < 590.0, "got {} km", total_km);
        assert!(result.return_to_depot.is_some());
    }

    #[tokio::test]
    async fn test_schedule_chains_arrivals() {
        let stops = vec![
            make_stop(0.1, 0.0),
            make_stop(0.2, 0.0),
            make_stop(0.3, 0.0),
        ];
        let provider = Arc::new(FixedMatrixProvider::new(uniform_matrix(4, 10_000, 600)));
        let optimizer =
            RouteOptimizer::with_service_provider(OptimizerConfig::default(), provider);
        let request = make_request(stops, CostMode::Service);

        let result = optimizer.optimize(&request).await.unwrap();

        assert_eq!(result.stops.len(), 3);
        assert_eq!(result.stops[0].estimated_arrival, at(8, 10));
        assert_eq!(result.stops[0].estimated_departure, at(8, 20));

        for pair in result.stops.windows(2) {
            let expected = pair[0].estimated_departure
                + Duration::minutes(pair[1].travel_minutes_from_previous as i64);
            assert_eq!(pair[1].estimated_arrival, expected);
        }

        // 4 legs of 10 min + 30 min of service
        assert_eq!(result.total_duration_minutes, 70);
        assert_eq!(result.return_to_depot.as_ref().unwrap().arrival, at(9, 10));
        assert!(result.used_live_traffic);
    }

    #[tokio::test]
    async fn test_order_is_a_permutation_of_input() {
        let stops: Vec<Stop> = (1..=5).map(|i| make_stop(0.1 * i as f64, 0.05)).collect();
        let mut expected: Vec<Uuid> = stops.iter().map(|s| s.id).collect();

        let optimizer = RouteOptimizer::new(OptimizerConfig::default());
        let request = make_request(stops, CostMode::Estimate);

        let result = optimizer.optimize(&request).await.unwrap();

        let mut got = result.order.clone();
        got.sort();
        expected.sort();
        assert_eq!(got, expected);
        assert_eq!(result.stops.len(), 5);
    }

    // ------------------------------------------------------------------
    // Time windows
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_missed_window_reported_not_fatal() {
        let mut stop = make_stop(0.1, 0.0);
        stop.time_window = Some(TimeWindow::new(at(9, 0), at(9, 10)));
        let id = stop.id;

        // 20-minute leg, departure 09:00: arrival 09:20 misses the window
        let provider = Arc::new(FixedMatrixProvider::new(uniform_matrix(2, 15_000, 1_200)));
        let optimizer =
            RouteOptimizer::with_service_provider(OptimizerConfig::default(), provider);
        let mut request = make_request(vec![stop], CostMode::Service);
        request.depart_at = Some(at(9, 0));

        let result = optimizer.optimize(&request).await.unwrap();

        assert_eq!(result.order, vec![id]);
        assert_eq!(result.unserviceable_stops, vec![id]);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.warning_type == "TIME_WINDOW_MISSED" && w.stop_id == Some(id)));
        assert_eq!(result.algorithm, "window-aware");
        assert!(result.has_time_windows);
    }

    #[tokio::test]
    async fn test_window_wait_counted() {
        let mut stop = make_stop(0.1, 0.0);
        stop.time_window = Some(TimeWindow::new(at(9, 0), at(10, 0)));

        let provider = Arc::new(FixedMatrixProvider::new(uniform_matrix(2, 10_000, 600)));
        let optimizer =
            RouteOptimizer::with_service_provider(OptimizerConfig::default(), provider);
        let request = make_request(vec![stop], CostMode::Service);

        let result = optimizer.optimize(&request).await.unwrap();

        // Arrive 08:10, wait 50 minutes for the window
        assert_eq!(result.stops[0].wait_minutes, 50);
        assert_eq!(result.total_wait_minutes, 50);
        assert_eq!(result.stops[0].estimated_departure, at(9, 10));
        assert!(result.unserviceable_stops.is_empty());
    }

    // ------------------------------------------------------------------
    // Forced endpoints
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_forced_endpoints_bracket_the_tour() {
        let a = make_stop(0.1, 0.0);
        let b = make_stop(0.2, 0.0);
        let c = make_stop(0.3, 0.0);
        let d = make_stop(0.4, 0.0);
        let (a_id, b_id, c_id, d_id) = (a.id, b.id, c.id, d.id);

        let provider = Arc::new(FixedMatrixProvider::new(uniform_matrix(5, 10_000, 600)));
        let optimizer =
            RouteOptimizer::with_service_provider(OptimizerConfig::default(), provider);
        let mut request = make_request(vec![a, b, c, d], CostMode::Service);
        request.forced_first_id = Some(d_id);
        request.forced_last_id = Some(b_id);

        let result = optimizer.optimize(&request).await.unwrap();

        assert_eq!(result.order.len(), 4);
        assert_eq!(result.order[0], d_id);
        assert_eq!(result.order[3], b_id);
        let middle: Vec<Uuid> = result.order[1..3].to_vec();
        assert!(middle.contains(&a_id));
        assert!(middle.contains(&c_id));

        // Depot leg folds into the forced first stop's entry
        assert_eq!(result.stops[0].stop_id, d_id);
        assert_eq!(result.stops[0].travel_minutes_from_previous, 10);
        assert_eq!(result.stops[0].estimated_arrival, at(8, 10));

        // Return leg runs from the forced last stop
        assert_eq!(result.return_to_depot.as_ref().unwrap().duration_minutes, 10);
    }

    #[tokio::test]
    async fn test_forced_endpoints_skip_suppressed() {
        let a = make_stop(0.1, 0.0);
        let b = make_stop(0.2, 0.0);
        let a_id = a.id;

        let provider = Arc::new(FixedMatrixProvider::new(uniform_matrix(3, 10_000, 600)));
        let optimizer = RouteOptimizer::with_service_provider(
            OptimizerConfig::default(),
            provider.clone(),
        );

        let mut request = make_request(vec![a, b], CostMode::Service);
        let first = optimizer.optimize(&request).await.unwrap();

        // Same stop set, but a pin arrived: must re-optimize
        request.previous_fingerprint = Some(first.fingerprint.clone());
        request.forced_first_id = Some(a_id);
        let second = optimizer.optimize(&request).await.unwrap();

        assert!(!second.already_optimized);
        assert_eq!(provider.call_count(), 2);
    }

    // ------------------------------------------------------------------
    // Fingerprint skip
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_unchanged_stop_set_skips_without_provider_calls() {
        let stops = vec![make_stop(0.1, 0.0), make_stop(0.2, 0.0)];
        let provider = Arc::new(FixedMatrixProvider::new(uniform_matrix(3, 10_000, 600)));
        let optimizer = RouteOptimizer::with_service_provider(
            OptimizerConfig::default(),
            provider.clone(),
        );

        let mut request = make_request(stops, CostMode::Service);
        let first = optimizer.optimize(&request).await.unwrap();
        assert!(!first.already_optimized);
        assert_eq!(provider.call_count(), 1);

        request.previous_fingerprint = Some(first.fingerprint.clone());
        request.optimized_at = Some(at(7, 0));
        let second = optimizer.optimize(&request).await.unwrap();

        assert!(second.already_optimized);
        assert_eq!(second.fingerprint, first.fingerprint);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_force_overrides_skip() {
        let stops = vec![make_stop(0.1, 0.0)];
        let provider = Arc::new(FixedMatrixProvider::new(uniform_matrix(2, 10_000, 600)));
        let optimizer = RouteOptimizer::with_service_provider(
            OptimizerConfig::default(),
            provider.clone(),
        );

        let mut request = make_request(stops, CostMode::Service);
        let first = optimizer.optimize(&request).await.unwrap();

        request.previous_fingerprint = Some(first.fingerprint.clone());
        request.force = true;
        let second = optimizer.optimize(&request).await.unwrap();

        assert!(!second.already_optimized);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_changed_stop_set_reoptimizes() {
        let a = make_stop(0.1, 0.0);
        let provider = Arc::new(FixedMatrixProvider::new(uniform_matrix(3, 10_000, 600)));
        let optimizer = RouteOptimizer::with_service_provider(
            OptimizerConfig::default(),
            provider.clone(),
        );

        let request = make_request(vec![a.clone()], CostMode::Service);
        let first = optimizer.optimize(&request).await.unwrap();

        let mut grown = make_request(vec![a, make_stop(0.2, 0.0)], CostMode::Service);
        grown.previous_fingerprint = Some(first.fingerprint.clone());
        let second = optimizer.optimize(&grown).await.unwrap();

        assert!(!second.already_optimized);
        assert_ne!(second.fingerprint, first.fingerprint);
        assert_eq!(provider.call_count(), 2);
    }

    // ------------------------------------------------------------------
    // Errors and edge cases
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_invalid_input_rejected_before_provider() {
        let provider = Arc::new(FixedMatrixProvider::new(uniform_matrix(1, 0, 0)));
        let optimizer = RouteOptimizer::with_service_provider(
            OptimizerConfig::default(),
            provider.clone(),
        );

        let request = make_request(vec![], CostMode::Service);
        let result = optimizer.optimize(&request).await;

        assert!(matches!(
            result,
            Err(OptimizeError::Input(InputError::NoStops))
        ));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let optimizer = RouteOptimizer::with_service_provider(
            OptimizerConfig::default(),
            Arc::new(FailingProvider),
        );

        let request = make_request(vec![make_stop(0.1, 0.0)], CostMode::Service);
        let result = optimizer.optimize(&request).await;

        assert!(matches!(
            result,
            Err(OptimizeError::Provider(ProviderError::Timeout))
        ));
    }

    #[tokio::test]
    async fn test_service_mode_without_provider() {
        let optimizer = RouteOptimizer::new(OptimizerConfig::default());

        let request = make_request(vec![make_stop(0.1, 0.0)], CostMode::Service);
        let result = optimizer.optimize(&request).await;

        assert!(matches!(
            result,
            Err(OptimizeError::Provider(ProviderError::NotConfigured))
        ));
    }

    #[tokio::test]
    async fn test_estimate_mode_ignores_broken_service() {
        let optimizer = RouteOptimizer::with_service_provider(
            OptimizerConfig::default(),
            Arc::new(FailingProvider),
        );

        let request = make_request(vec![make_stop(0.1, 0.0)], CostMode::Estimate);
        assert!(optimizer.optimize(&request).await.is_ok());
    }

    #[tokio::test]
    async fn test_partial_matrix_warning() {
        let mut matrix = uniform_matrix(3, 10_000, 600);
        // Unused direction; the tour itself stays routable
        matrix.durations[2][1] = UNREACHABLE_COST;
        matrix.distances[2][1] = UNREACHABLE_COST;

        let provider = Arc::new(FixedMatrixProvider::new(matrix));
        let optimizer =
            RouteOptimizer::with_service_provider(OptimizerConfig::default(), provider);

        let request = make_request(
            vec![make_stop(0.1, 0.0), make_stop(0.2, 0.0)],
            CostMode::Service,
        );
        let result = optimizer.optimize(&request).await.unwrap();

        assert!(result
            .warnings
            .iter()
            .any(|w| w.warning_type == "PARTIAL_MATRIX"));
        assert!(result.unserviceable_stops.is_empty());
    }

    #[tokio::test]
    async fn test_single_stop_route() {
        let stop = make_stop(0.1, 0.0);
        let id = stop.id;

        let optimizer = RouteOptimizer::new(OptimizerConfig::default());
        let request = make_request(vec![stop], CostMode::Estimate);

        let result = optimizer.optimize(&request).await.unwrap();

        assert_eq!(result.order, vec![id]);
        assert_eq!(result.stops.len(), 1);
        assert!(result.return_to_depot.is_some());
    }
}
