//! Distance matrix service client
//!
//! Speaks the Valhalla-style `sources_to_targets` protocol over HTTP.
//! Transient failures are retried with jittered exponential backoff,
//! repeated failures open a circuit breaker, and per-leg batches are
//! paced so a burst of recalculations cannot hammer the service.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::defaults;
use crate::error::ProviderError;
use crate::types::Coordinates;

use super::throttle::{CircuitBreaker, RateLimiter};
use super::{CostMatrix, CostProvider, LegCost, UNREACHABLE_COST};

/// Snap radius in meters for matching coordinates to the road network
const SNAP_RADIUS_METERS: u32 = 500;

/// Timeout for the health probe, separate from matrix requests
const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct MatrixApiConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub leg_pacing_ms: u64,
    pub breaker_threshold: u32,
    pub breaker_recovery_secs: u64,
}

impl Default for MatrixApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8002".to_string(),
            timeout_seconds: defaults::DEFAULT_REQUEST_TIMEOUT_SECS,
            retry_max_attempts: defaults::DEFAULT_RETRY_MAX_ATTEMPTS,
            retry_base_delay_ms: defaults::DEFAULT_RETRY_BASE_DELAY_MS,
            leg_pacing_ms: defaults::DEFAULT_LEG_PACING_MS,
            breaker_threshold: defaults::DEFAULT_CIRCUIT_BREAKER_THRESHOLD,
            breaker_recovery_secs: defaults::DEFAULT_CIRCUIT_BREAKER_RECOVERY_SECS,
        }
    }
}

impl MatrixApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}

pub struct MatrixApiClient {
    client: reqwest::Client,
    config: MatrixApiConfig,
    limiter: RateLimiter,
    pub(crate) breaker: CircuitBreaker,
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Clone, Serialize)]
struct ApiLocation {
    lat: f64,
    lon: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    radius: Option<u32>,
}

impl ApiLocation {
    fn from_coordinates(c: &Coordinates) -> Self {
        Self {
            lat: c.lat,
            lon: c.lng,
            radius: Some(SNAP_RADIUS_METERS),
        }
    }
}

/// Departure time hint. Type 0 asks for current conditions, type 1 for a
/// departure at the given local instant.
#[derive(Debug, Clone, Serialize)]
struct ApiDateTime {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct MatrixRequest {
    sources: Vec<ApiLocation>,
    targets: Vec<ApiLocation>,
    costing: String,
    units: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_time: Option<ApiDateTime>,
}

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    sources_to_targets: Vec<Vec<MatrixCell>>,
}

#[derive(Debug, Deserialize)]
struct MatrixCell {
    /// Distance in kilometers; None when no route exists
    distance: Option<f64>,
    /// Travel time in seconds; None when no route exists
    time: Option<f64>,
}

// =============================================================================
// Client
// =============================================================================

impl MatrixApiClient {
    pub fn new(config: MatrixApiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        let limiter = RateLimiter::new(config.leg_pacing_ms);
        let breaker = CircuitBreaker::new(config.breaker_threshold, config.breaker_recovery_secs);

        Self {
            client,
            config,
            limiter,
            breaker,
        }
    }

    /// Probe the service status endpoint.
    pub async fn check_health(&self) -> Result<(), ProviderError> {
        let url = format!("{}/status", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ProviderError::Upstream {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }

    fn build_request(
        sources: &[Coordinates],
        targets: &[Coordinates],
        depart_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> MatrixRequest {
        MatrixRequest {
            sources: sources.iter().map(ApiLocation::from_coordinates).collect(),
            targets: targets.iter().map(ApiLocation::from_coordinates).collect(),
            costing: "auto".to_string(),
            units: "kilometers".to_string(),
            date_time: Some(date_time_for(depart_at, now)),
        }
    }

    async fn send_once(&self, request: &MatrixRequest) -> Result<MatrixResponse, ProviderError> {
        let url = format!("{}/sources_to_targets", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ProviderError::Unauthorized {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(ProviderError::Upstream {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        response
            .json::<MatrixResponse>()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))
    }

    async fn send_with_retries(
        &self,
        request: &MatrixRequest,
    ) -> Result<MatrixResponse, ProviderError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send_once(request).await {
                Ok(response) => {
                    self.breaker.record_success();
                    return Ok(response);
                }
                Err(err) if err.is_transient() && attempt < self.config.retry_max_attempts => {
                    let delay = backoff_delay(self.config.retry_base_delay_ms, attempt);
                    warn!(
                        "Matrix request attempt {} failed ({}), retrying in {:?}",
                        attempt, err, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    self.breaker.record_failure().await;
                    return Err(err);
                }
            }
        }
    }
}

/// Retry delay for a 1-based attempt: doubling base plus jitter.
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let exp = base_ms.saturating_mul(1 << (attempt - 1).min(8));
    let jitter = rand::thread_rng().gen_range(0..=base_ms / 2);
    Duration::from_millis(exp + jitter)
}

fn map_reqwest_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Network(err.to_string())
    }
}

/// Departure hint for the upstream. Past or current instants ask for
/// current conditions; future instants ask for a depart-at forecast.
fn date_time_for(depart_at: DateTime<Utc>, now: DateTime<Utc>) -> ApiDateTime {
    if depart_at <= now {
        ApiDateTime {
            kind: 0,
            value: None,
        }
    } else {
        ApiDateTime {
            kind: 1,
            value: Some(depart_at.format("%Y-%m-%dT%H:%M").to_string()),
        }
    }
}

/// Convert a wire response into a cost matrix, filling unroutable cells
/// with the sentinel so one broken pair cannot sink the whole run.
fn convert_response(response: MatrixResponse, size: usize) -> Result<CostMatrix, ProviderError> {
    if response.sources_to_targets.len() != size {
        return Err(ProviderError::MalformedResponse(format!(
            "expected {} rows, got {}",
            size,
            response.sources_to_targets.len()
        )));
    }

    let mut distances = vec![vec![0u64; size]; size];
    let mut durations = vec![vec![0u64; size]; size];

    for (i, row) in response.sources_to_targets.iter().enumerate() {
        if row.len() != size {
            return Err(ProviderError::MalformedResponse(format!(
                "expected {} columns in row {}, got {}",
                size,
                i,
                row.len()
            )));
        }
        for (j, cell) in row.iter().enumerate() {
            match (cell.distance, cell.time) {
                (Some(km), Some(secs)) => {
                    distances[i][j] = (km * 1000.0) as u64;
                    durations[i][j] = secs as u64;
                }
                _ => {
                    if i != j {
                        warn!("Leg {} -> {} not routable, using sentinel cost", i, j);
                    }
                    distances[i][j] = if i == j { 0 } else { UNREACHABLE_COST };
                    durations[i][j] = if i == j { 0 } else { UNREACHABLE_COST };
                }
            }
        }
    }

    Ok(CostMatrix {
        distances,
        durations,
        size,
        used_live_traffic: true,
    })
}

#[async_trait::async_trait]
impl CostProvider for MatrixApiClient {
    async fn matrix(
        &self,
        locations: &[Coordinates],
        depart_at: DateTime<Utc>,
    ) -> Result<CostMatrix, ProviderError> {
        let n = locations.len();
        if n == 0 {
            return Ok(CostMatrix::empty());
        }
        if n == 1 {
            return Ok(CostMatrix {
                distances: vec![vec![0]],
                durations: vec![vec![0]],
                size: 1,
                used_live_traffic: true,
            });
        }

        if self.breaker.is_open() {
            return Err(ProviderError::Unavailable(
                "circuit breaker open".to_string(),
            ));
        }

        debug!("Requesting {}x{} cost matrix", n, n);
        let request = Self::build_request(locations, locations, depart_at, Utc::now());
        let response = self.send_with_retries(&request).await?;
        convert_response(response, n)
    }

    async fn leg(
        &self,
        from: Coordinates,
        to: Coordinates,
        depart_at: DateTime<Utc>,
    ) -> Result<LegCost, ProviderError> {
        if self.breaker.is_open() {
            return Err(ProviderError::Unavailable(
                "circuit breaker open".to_string(),
            ));
        }

        let request = Self::build_request(&[from], &[to], depart_at, Utc::now());
        let response = self.send_with_retries(&request).await?;

        let cell = response
            .sources_to_targets
            .first()
            .and_then(|row| row.first())
            .ok_or_else(|| {
                ProviderError::MalformedResponse("empty sources_to_targets".to_string())
            })?;

        match (cell.distance, cell.time) {
            (Some(km), Some(secs)) => Ok(LegCost {
                distance_meters: (km * 1000.0) as u64,
                duration_seconds: secs as u64,
                used_live_traffic: true,
            }),
            _ => Err(ProviderError::Unroutable),
        }
    }

    async fn legs(
        &self,
        pairs: &[(Coordinates, Coordinates)],
        depart_at: DateTime<Utc>,
    ) -> Vec<Result<LegCost, ProviderError>> {
        let mut results = Vec::with_capacity(pairs.len());
        for &(from, to) in pairs {
            self.limiter.wait().await;
            results.push(self.leg(from, to, depart_at).await);
        }
        results
    }

    fn name(&self) -> &str {
        "matrix-api"
    }
}
