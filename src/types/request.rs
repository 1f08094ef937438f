//! Optimization request and boundary validation

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::InputError;

use super::{Depot, Stop};

/// Cost source for a single optimization run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostMode {
    /// Haversine-based road estimate, no network calls
    Estimate,
    /// External distance matrix service, traffic-aware
    Service,
}

impl CostMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            CostMode::Estimate => "estimate",
            CostMode::Service => "service",
        }
    }
}

/// Request to optimize a route
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeRequest {
    pub depot: Depot,
    pub stops: Vec<Stop>,
    /// Stop that must be visited first
    pub forced_first_id: Option<Uuid>,
    /// Stop that must be visited last
    pub forced_last_id: Option<Uuid>,
    /// Departure override; falls back to the depot departure
    pub depart_at: Option<DateTime<Utc>>,
    pub mode: CostMode,
    /// Digest of the stop set from the previous optimization, if any
    pub previous_fingerprint: Option<String>,
    /// When the previous optimization ran, for skip logging
    pub optimized_at: Option<DateTime<Utc>>,
    /// Re-optimize even when the fingerprint matches
    #[serde(default)]
    pub force: bool,
}

impl OptimizeRequest {
    /// Effective departure instant for this run.
    pub fn departure(&self) -> DateTime<Utc> {
        self.depart_at.unwrap_or(self.depot.departure_at)
    }

    pub fn has_time_windows(&self) -> bool {
        self.stops.iter().any(|s| s.time_window.is_some())
    }

    pub fn has_priority_stops(&self) -> bool {
        self.stops.iter().any(|s| s.priority > 0)
    }

    /// Boundary validation. Rejects malformed requests before any provider
    /// call or solver work happens.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.stops.is_empty() {
            return Err(InputError::NoStops);
        }

        if !self.depot.coordinates.is_valid() {
            return Err(InputError::InvalidDepotCoordinates {
                lat: self.depot.coordinates.lat,
                lng: self.depot.coordinates.lng,
            });
        }

        let mut seen = HashSet::with_capacity(self.stops.len());
        for stop in &self.stops {
            if !seen.insert(stop.id) {
                return Err(InputError::DuplicateStopId { stop_id: stop.id });
            }
            if !stop.coordinates.is_valid() {
                return Err(InputError::InvalidCoordinates {
                    stop_id: stop.id,
                    lat: stop.coordinates.lat,
                    lng: stop.coordinates.lng,
                });
            }
            if let Some(tw) = &stop.time_window {
                if !tw.is_valid() {
                    return Err(InputError::InvalidTimeWindow { stop_id: stop.id });
                }
            }
        }

        if let (Some(first), Some(last)) = (self.forced_first_id, self.forced_last_id) {
            if first == last {
                return Err(InputError::ForcedEndpointsConflict { stop_id: first });
            }
        }
        if let Some(id) = self.forced_first_id {
            if !seen.contains(&id) {
                return Err(InputError::ForcedStopNotFound {
                    position: "first",
                    stop_id: id,
                });
            }
        }
        if let Some(id) = self.forced_last_id {
            if !seen.contains(&id) {
                return Err(InputError::ForcedStopNotFound {
                    position: "last",
                    stop_id: id,
                });
            }
        }

        Ok(())
    }
}
