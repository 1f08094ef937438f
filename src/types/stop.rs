//! Stop and depot types shared by the optimizer entry points

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults::DEFAULT_SERVICE_DURATION_MINUTES;

/// Coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// WGS84 sanity check: finite and within degree bounds.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Hard visit window for a stop, as absolute instants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Windows where the end precedes the start are rejected at the boundary.
    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }
}

/// A stop to visit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub id: Uuid,
    pub coordinates: Coordinates,
    /// Time spent at the stop, in minutes
    pub service_duration_minutes: u32,
    /// Optional hard time window
    pub time_window: Option<TimeWindow>,
    /// 0 = normal, higher = more urgent
    #[serde(default)]
    pub priority: u32,
}

/// Depot the route starts from and returns to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Depot {
    pub coordinates: Coordinates,
    /// Departure instant used when the request carries no override
    pub departure_at: DateTime<Utc>,
    /// Service duration applied to stops created without one
    #[serde(default = "default_service_minutes")]
    pub default_service_minutes: u32,
}

fn default_service_minutes() -> u32 {
    DEFAULT_SERVICE_DURATION_MINUTES
}
