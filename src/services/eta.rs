//! Live ETA recalculation
//!
//! After a stop reaches a terminal status the rest of the schedule shifts.
//! The engine loads current route state through the store seam, anchors at
//! the vehicle position (or the completed stop), refreshes leg costs where
//! the visit sequence changed, and rolls revised arrivals forward. Planned
//! arrivals from trip start are read-only inputs here; delay is always
//! measured against them.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::RecalculateError;
use crate::types::{
    Coordinates, RecalculatedStop, RecalculationResult, RouteProgress, RouteWarning, StopProgress,
    WARNING_ETA_DEGRADED, WARNING_TIME_WINDOW_MISSED,
};

use super::provider::CostProvider;

/// Read seam for active route state, implemented by the caller against
/// whatever storage holds trips.
#[async_trait]
pub trait RouteStore: Send + Sync {
    /// Current sequence and per-stop state, or None for an unknown route.
    async fn load_progress(&self, route_id: Uuid) -> anyhow::Result<Option<RouteProgress>>;
}

pub struct EtaEngine {
    provider: Arc<dyn CostProvider>,
    store: Arc<dyn RouteStore>,
}

impl EtaEngine {
    pub fn new(provider: Arc<dyn CostProvider>, store: Arc<dyn RouteStore>) -> Self {
        Self { provider, store }
    }

    /// Revise ETAs for everything still pending after `completed_stop_id`
    /// finished at `completion_at`.
    pub async fn recalculate(
        &self,
        route_id: Uuid,
        completed_stop_id: Uuid,
        completion_at: DateTime<Utc>,
    ) -> Result<RecalculationResult, RecalculateError> {
        let progress = self
            .store
            .load_progress(route_id)
            .await
            .map_err(RecalculateError::Store)?
            .ok_or(RecalculateError::RouteNotFound(route_id))?;

        let completed_pos = progress
            .stops
            .iter()
            .position(|s| s.stop_id == completed_stop_id)
            .ok_or(RecalculateError::StopNotFound {
                route_id,
                stop_id: completed_stop_id,
            })?;

        // Pending stops downstream, keeping their stored sequence position.
        let pending: Vec<(usize, &StopProgress)> = progress.stops[completed_pos + 1..]
            .iter()
            .enumerate()
            .map(|(offset, stop)| (completed_pos + 1 + offset, stop))
            .filter(|(_, stop)| !stop.status.is_terminal())
            .collect();

        if pending.is_empty() {
            debug!(
                "Route {}: nothing pending after {}",
                route_id, completed_stop_id
            );
            return Ok(RecalculationResult {
                route_id,
                completed_stop_id,
                stops: Vec::new(),
                degraded: false,
                warnings: Vec::new(),
            });
        }

        let anchor = progress
            .vehicle_position
            .unwrap_or(progress.stops[completed_pos].coordinates);

        // A leg can reuse its stored duration only when its endpoints were
        // already adjacent in the stored sequence. The anchor leg never is.
        let mut fresh_pairs: Vec<(Coordinates, Coordinates)> = Vec::new();
        let mut fresh_slots: Vec<usize> = Vec::new();
        for (slot, &(seq_pos, stop)) in pending.iter().enumerate() {
            if slot == 0 {
                fresh_pairs.push((anchor, stop.coordinates));
                fresh_slots.push(slot);
            } else {
                let (prev_seq, prev) = pending[slot - 1];
                if seq_pos != prev_seq + 1 {
                    fresh_pairs.push((prev.coordinates, stop.coordinates));
                    fresh_slots.push(slot);
                }
            }
        }

        let fresh_results = self.provider.legs(&fresh_pairs, completion_at).await;

        let mut degraded = false;
        let mut warnings: Vec<RouteWarning> = Vec::new();

        // Travel minutes per pending slot: stored by default, fresh where
        // the sequence changed, stored again when a fresh lookup fails.
        let mut travel: Vec<u32> = pending
            .iter()
            .map(|(_, stop)| stop.travel_minutes_from_previous)
            .collect();
        for (result, &slot) in fresh_results.iter().zip(&fresh_slots) {
            match result {
                Ok(leg) => {
                    travel[slot] = ((leg.duration_seconds + 59) / 60) as u32;
                }
                Err(err) => {
                    let (_, stop) = pending[slot];
                    warn!(
                        "Route {}: leg to {} failed ({}), keeping stored duration",
                        route_id, stop.stop_id, err
                    );
                    degraded = true;
                }
            }
        }
        if degraded {
            warnings.push(RouteWarning {
                stop_id: None,
                warning_type: WARNING_ETA_DEGRADED.to_string(),
                message: "Some legs could not be refreshed; stored durations were used"
                    .to_string(),
            });
        }

        // Roll the schedule forward from the completion instant. Windows
        // still accrue waiting; a window missed mid-trip is advisory, the
        // driver will attempt the stop regardless.
        let mut stops = Vec::with_capacity(pending.len());
        let mut cursor = completion_at;
        for (slot, &(_, stop)) in pending.iter().enumerate() {
            let arrival = cursor + Duration::minutes(travel[slot] as i64);

            let wait_minutes = match &stop.time_window {
                Some(window) if arrival < window.start => {
                    let secs = (window.start - arrival).num_seconds();
                    ((secs + 59) / 60) as u32
                }
                _ => 0,
            };
            if let Some(window) = &stop.time_window {
                if arrival > window.end {
                    warnings.push(RouteWarning {
                        stop_id: Some(stop.stop_id),
                        warning_type: WARNING_TIME_WINDOW_MISSED.to_string(),
                        message: format!(
                            "Revised arrival {} is after the window closes at {}",
                            arrival.format("%H:%M"),
                            window.end.format("%H:%M")
                        ),
                    });
                }
            }

            let departure = arrival
                + Duration::minutes(wait_minutes as i64)
                + Duration::minutes(stop.service_duration_minutes as i64);

            stops.push(RecalculatedStop {
                stop_id: stop.stop_id,
                estimated_arrival: arrival,
                estimated_departure: departure,
                travel_minutes_from_previous: travel[slot],
                wait_minutes,
                original_arrival: stop.original_arrival,
                delay_minutes: (arrival - stop.original_arrival).num_minutes(),
            });

            cursor = departure;
        }

        info!(
            "Route {}: revised {} pending stops after {} ({} fresh legs{})",
            route_id,
            stops.len(),
            completed_stop_id,
            fresh_slots.len(),
            if degraded { ", degraded" } else { "" }
        );

        Ok(RecalculationResult {
            route_id,
            completed_stop_id,
            stops,
            degraded,
            warnings,
        })
    }
}
