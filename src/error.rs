//! Error types for the optimization and recalculation entry points
//!
//! Three layers: `InputError` for requests rejected before any work happens,
//! `ProviderError` for cost service failures, and the entry-point enums
//! `OptimizeError` / `RecalculateError` that wrap them.

use thiserror::Error;
use uuid::Uuid;

/// Request rejected at the boundary, before any provider or solver work.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("no stops to optimize")]
    NoStops,

    #[error("depot has invalid coordinates ({lat}, {lng})")]
    InvalidDepotCoordinates { lat: f64, lng: f64 },

    #[error("stop {stop_id} has invalid coordinates ({lat}, {lng})")]
    InvalidCoordinates { stop_id: Uuid, lat: f64, lng: f64 },

    #[error("stop {stop_id} has a time window that ends before it starts")]
    InvalidTimeWindow { stop_id: Uuid },

    #[error("duplicate stop id {stop_id}")]
    DuplicateStopId { stop_id: Uuid },

    #[error("forced {position} stop {stop_id} is not among the route stops")]
    ForcedStopNotFound {
        position: &'static str,
        stop_id: Uuid,
    },

    #[error("forced first and forced last both refer to stop {stop_id}")]
    ForcedEndpointsConflict { stop_id: Uuid },
}

/// Failure talking to a cost provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("distance service is not configured")]
    NotConfigured,

    #[error("distance service unavailable: {0}")]
    Unavailable(String),

    #[error("distance service denied the request (status {status})")]
    Unauthorized { status: u16 },

    #[error("distance service request timed out")]
    Timeout,

    #[error("distance service network error: {0}")]
    Network(String),

    #[error("distance service returned a malformed response: {0}")]
    MalformedResponse(String),

    #[error("no route found between the requested locations")]
    Unroutable,

    #[error("distance service returned error {status}: {body}")]
    Upstream { status: u16, body: String },
}

impl ProviderError {
    /// Transient failures are retried with backoff; the rest fail fast.
    /// 429 counts as transient since quota pressure usually clears.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Timeout | ProviderError::Network(_) => true,
            ProviderError::Upstream { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Errors from [`RouteOptimizer::optimize`](crate::RouteOptimizer::optimize).
#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Errors from [`EtaEngine::recalculate`](crate::EtaEngine::recalculate).
#[derive(Debug, Error)]
pub enum RecalculateError {
    #[error("route {0} not found")]
    RouteNotFound(Uuid),

    #[error("stop {stop_id} is not part of route {route_id}")]
    StopNotFound { route_id: Uuid, stop_id: Uuid },

    #[error("failed to load route state: {0}")]
    Store(#[source] anyhow::Error),
}
