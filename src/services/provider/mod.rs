//! Travel cost providers
//!
//! Two implementations behind one seam: a haversine-based estimate that
//! needs no network, and an HTTP client for a distance matrix service with
//! time-dependent costing. The optimizer picks one per request.

pub mod matrix_api;
pub mod throttle;

pub use matrix_api::{MatrixApiClient, MatrixApiConfig};
pub use throttle::{CircuitBreaker, RateLimiter};

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::OptimizerConfig;
use crate::error::ProviderError;
use crate::services::geo;
use crate::types::{Coordinates, CostMode};

/// Sentinel cost for legs the upstream service could not route.
/// Large enough that no solver ever prefers such a leg, small enough
/// that summing a few cannot overflow.
pub const UNREACHABLE_COST: u64 = u64::MAX / 2;

/// Distance and duration matrices between a set of locations
#[derive(Debug, Clone)]
pub struct CostMatrix {
    /// Distance in meters, `distances[from][to]`
    pub distances: Vec<Vec<u64>>,
    /// Duration in seconds, `durations[from][to]`
    pub durations: Vec<Vec<u64>>,
    /// Number of locations
    pub size: usize,
    /// Whether the costs came from time-dependent (traffic) data
    pub used_live_traffic: bool,
}

impl CostMatrix {
    pub fn empty() -> Self {
        Self {
            distances: Vec::new(),
            durations: Vec::new(),
            size: 0,
            used_live_traffic: false,
        }
    }

    pub fn distance(&self, from: usize, to: usize) -> u64 {
        self.distances[from][to]
    }

    pub fn duration(&self, from: usize, to: usize) -> u64 {
        self.durations[from][to]
    }

    /// True when any off-diagonal cell carries the unreachable sentinel.
    pub fn has_unreachable_cells(&self) -> bool {
        (0..self.size).any(|i| {
            (0..self.size).any(|j| {
                i != j
                    && (self.distances[i][j] >= UNREACHABLE_COST
                        || self.durations[i][j] >= UNREACHABLE_COST)
            })
        })
    }
}

/// Cost of a single leg between two locations
#[derive(Debug, Clone, Copy)]
pub struct LegCost {
    pub distance_meters: u64,
    pub duration_seconds: u64,
    pub used_live_traffic: bool,
}

/// Travel cost lookup between coordinates.
///
/// `depart_at` lets time-dependent implementations pick traffic conditions;
/// the estimate implementation ignores it.
#[async_trait]
pub trait CostProvider: Send + Sync {
    /// Full cost matrix over `locations`, index-aligned with the input.
    async fn matrix(
        &self,
        locations: &[Coordinates],
        depart_at: DateTime<Utc>,
    ) -> Result<CostMatrix, ProviderError>;

    /// Cost of a single leg.
    async fn leg(
        &self,
        from: Coordinates,
        to: Coordinates,
        depart_at: DateTime<Utc>,
    ) -> Result<LegCost, ProviderError>;

    /// Batch leg lookup with per-leg failure isolation, so callers can
    /// degrade one leg without losing the rest.
    async fn legs(
        &self,
        pairs: &[(Coordinates, Coordinates)],
        depart_at: DateTime<Utc>,
    ) -> Vec<Result<LegCost, ProviderError>> {
        let mut results = Vec::with_capacity(pairs.len());
        for &(from, to) in pairs {
            results.push(self.leg(from, to, depart_at).await);
        }
        results
    }

    /// Implementation name for logging
    fn name(&self) -> &str;
}

/// Deterministic haversine-based provider. No I/O, no failures.
pub struct EstimateProvider {
    road_coefficient: f64,
    average_speed_kmh: f64,
}

impl EstimateProvider {
    pub fn new() -> Self {
        Self::with_params(
            crate::defaults::DEFAULT_ROAD_COEFFICIENT,
            crate::defaults::DEFAULT_AVERAGE_SPEED_KMH,
        )
    }

    pub fn with_params(road_coefficient: f64, average_speed_kmh: f64) -> Self {
        Self {
            road_coefficient,
            average_speed_kmh,
        }
    }
}

impl Default for EstimateProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CostProvider for EstimateProvider {
    async fn matrix(
        &self,
        locations: &[Coordinates],
        _depart_at: DateTime<Utc>,
    ) -> Result<CostMatrix, ProviderError> {
        let n = locations.len();
        let mut distances = vec![vec![0u64; n]; n];
        let mut durations = vec![vec![0u64; n]; n];

        for i in 0..n {
            for j in 0..n {
                if i != j {
                    distances[i][j] = geo::estimate_distance_meters(
                        &locations[i],
                        &locations[j],
                        self.road_coefficient,
                    );
                    durations[i][j] = geo::estimate_duration_seconds(
                        &locations[i],
                        &locations[j],
                        self.road_coefficient,
                        self.average_speed_kmh,
                    );
                }
            }
        }

        Ok(CostMatrix {
            distances,
            durations,
            size: n,
            used_live_traffic: false,
        })
    }

    async fn leg(
        &self,
        from: Coordinates,
        to: Coordinates,
        _depart_at: DateTime<Utc>,
    ) -> Result<LegCost, ProviderError> {
        Ok(LegCost {
            distance_meters: geo::estimate_distance_meters(&from, &to, self.road_coefficient),
            duration_seconds: geo::estimate_duration_seconds(
                &from,
                &to,
                self.road_coefficient,
                self.average_speed_kmh,
            ),
            used_live_traffic: false,
        })
    }

    fn name(&self) -> &str {
        "estimate"
    }
}

/// Create the provider for the requested mode.
///
/// Service mode probes the matrix service first so an unreachable backend
/// surfaces here rather than mid-optimization. The caller decides whether
/// to retry in estimate mode.
pub async fn create_cost_provider(
    config: &OptimizerConfig,
    mode: CostMode,
) -> Result<Arc<dyn CostProvider>, ProviderError> {
    match mode {
        CostMode::Estimate => {
            info!("Using estimate cost provider");
            Ok(Arc::new(EstimateProvider::with_params(
                config.road_coefficient,
                config.average_speed_kmh,
            )))
        }
        CostMode::Service => {
            let base_url = config
                .matrix_api_url
                .clone()
                .ok_or(ProviderError::NotConfigured)?;

            let client = MatrixApiClient::new(config.matrix_api_config(&base_url));
            match client.check_health().await {
                Ok(()) => {
                    info!("Matrix service at {} is healthy", base_url);
                    Ok(Arc::new(client))
                }
                Err(err) => {
                    warn!("Matrix service at {} unavailable: {}", base_url, err);
                    Err(ProviderError::Unavailable(err.to_string()))
                }
            }
        }
    }
}
