//! Engine configuration
//!
//! Loaded once from the environment at startup, or built programmatically
//! via `Default` and field overrides in tests and embedders.

use anyhow::{Context, Result};

use crate::defaults;
use crate::services::provider::MatrixApiConfig;
use crate::services::solver::SolverConfig;

/// Configuration for [`RouteOptimizer`](crate::RouteOptimizer) and the
/// cost providers it builds.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Base URL of the distance matrix service. None disables service mode.
    pub matrix_api_url: Option<String>,

    /// HTTP timeout for a single matrix request
    pub request_timeout_secs: u64,

    /// Attempts per matrix call before a transient failure becomes fatal
    pub retry_max_attempts: u32,

    /// Base delay for exponential retry backoff
    pub retry_base_delay_ms: u64,

    /// Minimum interval between per-leg calls in a batch
    pub leg_pacing_ms: u64,

    /// Consecutive failures before the matrix client stops calling out
    pub breaker_threshold: u32,

    /// Backoff period once the breaker has opened
    pub breaker_recovery_secs: u64,

    /// Straight-line to road-distance multiplier for estimate mode
    pub road_coefficient: f64,

    /// Average speed in km/h for estimated travel times
    pub average_speed_kmh: f64,

    /// Solver tuning shared by both solving paths
    pub solver: SolverConfig,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            matrix_api_url: None,
            request_timeout_secs: defaults::DEFAULT_REQUEST_TIMEOUT_SECS,
            retry_max_attempts: defaults::DEFAULT_RETRY_MAX_ATTEMPTS,
            retry_base_delay_ms: defaults::DEFAULT_RETRY_BASE_DELAY_MS,
            leg_pacing_ms: defaults::DEFAULT_LEG_PACING_MS,
            breaker_threshold: defaults::DEFAULT_CIRCUIT_BREAKER_THRESHOLD,
            breaker_recovery_secs: defaults::DEFAULT_CIRCUIT_BREAKER_RECOVERY_SECS,
            road_coefficient: defaults::DEFAULT_ROAD_COEFFICIENT,
            average_speed_kmh: defaults::DEFAULT_AVERAGE_SPEED_KMH,
            solver: SolverConfig::default(),
        }
    }
}

impl OptimizerConfig {
    /// Load configuration from environment variables. Unset variables fall
    /// back to the compiled defaults; malformed values are errors.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let base = Self::default();

        Ok(Self {
            matrix_api_url: std::env::var("MATRIX_API_URL").ok(),
            request_timeout_secs: env_parsed(
                "MATRIX_REQUEST_TIMEOUT_SECS",
                base.request_timeout_secs,
            )?,
            retry_max_attempts: env_parsed("MATRIX_RETRY_MAX_ATTEMPTS", base.retry_max_attempts)?,
            retry_base_delay_ms: env_parsed("MATRIX_RETRY_BASE_DELAY_MS", base.retry_base_delay_ms)?,
            leg_pacing_ms: env_parsed("MATRIX_LEG_PACING_MS", base.leg_pacing_ms)?,
            breaker_threshold: env_parsed("MATRIX_BREAKER_THRESHOLD", base.breaker_threshold)?,
            breaker_recovery_secs: env_parsed(
                "MATRIX_BREAKER_RECOVERY_SECS",
                base.breaker_recovery_secs,
            )?,
            road_coefficient: env_parsed("ESTIMATE_ROAD_COEFFICIENT", base.road_coefficient)?,
            average_speed_kmh: env_parsed("ESTIMATE_AVERAGE_SPEED_KMH", base.average_speed_kmh)?,
            solver: SolverConfig {
                max_improvement_passes: env_parsed(
                    "SOLVER_MAX_IMPROVEMENT_PASSES",
                    base.solver.max_improvement_passes,
                )?,
                improvement_tolerance_minutes: env_parsed(
                    "SOLVER_IMPROVEMENT_TOLERANCE_MINUTES",
                    base.solver.improvement_tolerance_minutes,
                )?,
            },
        })
    }

    /// Matrix client configuration for the given base URL.
    pub fn matrix_api_config(&self, base_url: &str) -> MatrixApiConfig {
        MatrixApiConfig {
            base_url: base_url.to_string(),
            timeout_seconds: self.request_timeout_secs,
            retry_max_attempts: self.retry_max_attempts,
            retry_base_delay_ms: self.retry_base_delay_ms,
            leg_pacing_ms: self.leg_pacing_ms,
            breaker_threshold: self.breaker_threshold,
            breaker_recovery_secs: self.breaker_recovery_secs,
        }
    }
}

fn env_parsed<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{} has an unparseable value: {}", name, raw)),
        Err(_) => Ok(default),
    }
}
