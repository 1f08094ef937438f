//! Active trip state and ETA recalculation types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Coordinates, RouteWarning, TimeWindow};

/// Per-stop progress status during an active trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopStatus {
    Pending,
    InTransit,
    Completed,
    Failed,
    Skipped,
}

impl StopStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            StopStatus::Pending => "pending",
            StopStatus::InTransit => "in_transit",
            StopStatus::Completed => "completed",
            StopStatus::Failed => "failed",
            StopStatus::Skipped => "skipped",
        }
    }

    /// Terminal stops are done; they get no revised ETA.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            StopStatus::Completed | StopStatus::Failed | StopStatus::Skipped
        )
    }
}

/// Stored state of one stop on an active route
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopProgress {
    pub stop_id: Uuid,
    pub coordinates: Coordinates,
    pub status: StopStatus,
    pub service_duration_minutes: u32,
    pub time_window: Option<TimeWindow>,
    /// Planned arrival recorded when the trip started. Never rewritten.
    pub original_arrival: DateTime<Utc>,
    /// Latest published estimate
    pub estimated_arrival: DateTime<Utc>,
    /// Stored travel leg from the previous stop in the planned sequence
    pub travel_minutes_from_previous: u32,
}

/// Current state of an active route, loaded through the store seam
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteProgress {
    pub route_id: Uuid,
    /// Stops in planned visit order
    pub stops: Vec<StopProgress>,
    /// Last reported vehicle position, if telemetry is available
    pub vehicle_position: Option<Coordinates>,
}

/// Revised timing for one pending stop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalculatedStop {
    pub stop_id: Uuid,
    pub estimated_arrival: DateTime<Utc>,
    pub estimated_departure: DateTime<Utc>,
    pub travel_minutes_from_previous: u32,
    pub wait_minutes: u32,
    /// Planned arrival from trip start, echoed untouched
    pub original_arrival: DateTime<Utc>,
    /// Revised minus planned arrival; negative means ahead of plan
    pub delay_minutes: i64,
}

/// Result of an ETA recalculation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalculationResult {
    pub route_id: Uuid,
    pub completed_stop_id: Uuid,
    /// Pending stops downstream of the completed one, in sequence order
    pub stops: Vec<RecalculatedStop>,
    /// True when any leg fell back to stored durations
    pub degraded: bool,
    pub warnings: Vec<RouteWarning>,
}
