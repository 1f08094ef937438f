//! Optimization result types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Warning attached to an otherwise successful run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteWarning {
    /// Stop the warning refers to, if any
    pub stop_id: Option<Uuid>,
    /// Machine-readable code, e.g. "TIME_WINDOW_MISSED"
    pub warning_type: String,
    /// Human-readable description
    pub message: String,
}

/// A scheduled stop in the optimized route
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedStop {
    pub stop_id: Uuid,
    /// Position in the route (1-based)
    pub order: u32,
    pub estimated_arrival: DateTime<Utc>,
    pub estimated_departure: DateTime<Utc>,
    /// Travel from the previous location (depot for the first stop)
    pub travel_minutes_from_previous: u32,
    pub distance_from_previous_meters: u64,
    /// Idle time spent waiting for the window to open
    pub wait_minutes: u32,
}

/// Closing leg from the last serviced stop back to the depot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnLeg {
    pub distance_meters: u64,
    pub duration_minutes: u32,
    /// When the vehicle is back at the depot
    pub arrival: DateTime<Utc>,
}

/// Result of route optimization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    /// Stop ids in visit order, forced endpoints included
    pub order: Vec<Uuid>,
    /// Schedule for every stop in `order`
    pub stops: Vec<TimedStop>,
    /// Driven meters including the depot return leg
    pub total_distance_meters: u64,
    /// Travel + service + waiting + depot return, in minutes
    pub total_duration_minutes: u32,
    pub total_wait_minutes: u32,
    /// Stops whose window could not be met; still present in `order`
    pub unserviceable_stops: Vec<Uuid>,
    pub warnings: Vec<RouteWarning>,
    /// Whether leg costs came from time-dependent (traffic) data
    pub used_live_traffic: bool,
    pub has_time_windows: bool,
    pub has_priority_stops: bool,
    /// None only when nothing was serviced
    pub return_to_depot: Option<ReturnLeg>,
    /// Digest of the stop set, stored for the next skip check
    pub fingerprint: String,
    /// True when the run was skipped because nothing changed
    pub already_optimized: bool,
    /// Which solver produced the order
    pub algorithm: String,
    pub solve_time_ms: u64,
}

impl OptimizationResult {
    /// Result for a run skipped by the fingerprint guard. The caller keeps
    /// its stored route; nothing here overrides it.
    pub fn skipped(fingerprint: String) -> Self {
        Self {
            order: Vec::new(),
            stops: Vec::new(),
            total_distance_meters: 0,
            total_duration_minutes: 0,
            total_wait_minutes: 0,
            unserviceable_stops: Vec::new(),
            warnings: Vec::new(),
            used_live_traffic: false,
            has_time_windows: false,
            has_priority_stops: false,
            return_to_depot: None,
            fingerprint,
            already_optimized: true,
            algorithm: "skipped".to_string(),
            solve_time_ms: 0,
        }
    }
}

// Warning codes shared by the optimizer and the ETA engine.
pub const WARNING_TIME_WINDOW_MISSED: &str = "TIME_WINDOW_MISSED";
pub const WARNING_UNREACHABLE: &str = "UNREACHABLE";
pub const WARNING_PARTIAL_MATRIX: &str = "PARTIAL_MATRIX";
pub const WARNING_ETA_DEGRADED: &str = "ETA_DEGRADED";
