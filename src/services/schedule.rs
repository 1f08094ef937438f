//! Route timing walk
//!
//! Walks an ordered set of stops from a departure instant and accumulates
//! travel, waiting, and service time against a cost matrix. The same walk
//! backs solver feasibility checks and the final schedule of an optimized
//! route, so both always agree on arrival arithmetic.
//!
//! Rules:
//! - Travel durations are rounded up to whole minutes.
//! - Arriving before a window accrues explicit waiting time; service
//!   starts when the window opens.
//! - Arriving after a window marks the stop unserviceable. It keeps its
//!   position and its would-be timing, but the cursor does not advance
//!   and its leg does not count into the totals.
//! - Legs carrying the unreachable sentinel mark the stop unserviceable
//!   the same way.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::types::{
    ReturnLeg, RouteWarning, TimeWindow, TimedStop, WARNING_TIME_WINDOW_MISSED,
    WARNING_UNREACHABLE,
};

use super::provider::{CostMatrix, UNREACHABLE_COST};

/// One stop as the walker sees it
#[derive(Debug, Clone, Copy)]
pub struct WalkStop {
    pub stop_id: Uuid,
    /// Row/column of this stop in the cost matrix
    pub matrix_idx: usize,
    pub service_minutes: u32,
    pub window: Option<TimeWindow>,
}

/// Everything a walk produces
#[derive(Debug, Clone)]
pub struct ScheduleOutcome {
    /// Schedule entries, one per input stop, in visit order
    pub stops: Vec<TimedStop>,
    /// Stops whose window or leg could not be met
    pub unserviceable: Vec<Uuid>,
    pub warnings: Vec<RouteWarning>,
    /// Driven meters including the return leg
    pub total_distance_meters: u64,
    /// Driven minutes including the return leg
    pub total_travel_minutes: u32,
    pub total_service_minutes: u32,
    pub total_wait_minutes: u32,
    /// Travel + service + waiting
    pub total_duration_minutes: u32,
    /// None when no stop was serviced
    pub return_leg: Option<ReturnLeg>,
    /// Departure from the last serviced stop, before the return leg
    pub finish_at: DateTime<Utc>,
}

/// Minutes, rounded up, for a duration in seconds.
fn travel_minutes(duration_seconds: u64) -> u32 {
    ((duration_seconds + 59) / 60) as u32
}

/// Walk `stops` in order, departing `origin_idx` at `depart_at`, closing
/// the tour towards `return_idx`.
pub fn walk_route(
    depart_at: DateTime<Utc>,
    origin_idx: usize,
    return_idx: usize,
    stops: &[WalkStop],
    matrix: &CostMatrix,
) -> ScheduleOutcome {
    let mut timed = Vec::with_capacity(stops.len());
    let mut unserviceable = Vec::new();
    let mut warnings = Vec::new();

    let mut cursor = depart_at;
    let mut prev_idx = origin_idx;
    let mut serviced = 0u32;

    let mut total_distance = 0u64;
    let mut total_travel = 0u32;
    let mut total_service = 0u32;
    let mut total_wait = 0u32;

    for (position, stop) in stops.iter().enumerate() {
        let order = (position + 1) as u32;
        let leg_duration = matrix.duration(prev_idx, stop.matrix_idx);
        let leg_distance = matrix.distance(prev_idx, stop.matrix_idx);

        if leg_duration >= UNREACHABLE_COST || leg_distance >= UNREACHABLE_COST {
            unserviceable.push(stop.stop_id);
            warnings.push(RouteWarning {
                stop_id: Some(stop.stop_id),
                warning_type: WARNING_UNREACHABLE.to_string(),
                message: "No route to this stop from the previous location".to_string(),
            });
            timed.push(TimedStop {
                stop_id: stop.stop_id,
                order,
                estimated_arrival: cursor,
                estimated_departure: cursor,
                travel_minutes_from_previous: 0,
                distance_from_previous_meters: 0,
                wait_minutes: 0,
            });
            continue;
        }

        let leg_minutes = travel_minutes(leg_duration);
        let arrival = cursor + Duration::minutes(leg_minutes as i64);

        if let Some(window) = &stop.window {
            if arrival > window.end {
                unserviceable.push(stop.stop_id);
                warnings.push(RouteWarning {
                    stop_id: Some(stop.stop_id),
                    warning_type: WARNING_TIME_WINDOW_MISSED.to_string(),
                    message: format!(
                        "Would arrive {} after the window closes at {}",
                        arrival.format("%H:%M"),
                        window.end.format("%H:%M")
                    ),
                });
                timed.push(TimedStop {
                    stop_id: stop.stop_id,
                    order,
                    estimated_arrival: arrival,
                    estimated_departure: arrival,
                    travel_minutes_from_previous: leg_minutes,
                    distance_from_previous_meters: leg_distance,
                    wait_minutes: 0,
                });
                continue;
            }
        }

        let wait_minutes = match &stop.window {
            Some(window) if arrival < window.start => {
                let secs = (window.start - arrival).num_seconds();
                ((secs + 59) / 60) as u32
            }
            _ => 0,
        };

        let departure = arrival
            + Duration::minutes(wait_minutes as i64)
            + Duration::minutes(stop.service_minutes as i64);

        timed.push(TimedStop {
            stop_id: stop.stop_id,
            order,
            estimated_arrival: arrival,
            estimated_departure: departure,
            travel_minutes_from_previous: leg_minutes,
            distance_from_previous_meters: leg_distance,
            wait_minutes,
        });

        total_distance += leg_distance;
        total_travel += leg_minutes;
        total_service += stop.service_minutes;
        total_wait += wait_minutes;

        cursor = departure;
        prev_idx = stop.matrix_idx;
        serviced += 1;
    }

    let return_leg = if serviced > 0 {
        let leg_duration = matrix.duration(prev_idx, return_idx);
        let leg_distance = matrix.distance(prev_idx, return_idx);
        if leg_duration >= UNREACHABLE_COST || leg_distance >= UNREACHABLE_COST {
            None
        } else {
            let leg_minutes = travel_minutes(leg_duration);
            total_distance += leg_distance;
            total_travel += leg_minutes;
            Some(ReturnLeg {
                distance_meters: leg_distance,
                duration_minutes: leg_minutes,
                arrival: cursor + Duration::minutes(leg_minutes as i64),
            })
        }
    } else {
        None
    };

    ScheduleOutcome {
        stops: timed,
        unserviceable,
        warnings,
        total_distance_meters: total_distance,
        total_travel_minutes: total_travel,
        total_service_minutes: total_service,
        total_wait_minutes: total_wait,
        total_duration_minutes: total_travel + total_service + total_wait,
        return_leg,
        finish_at: cursor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, min, 0).unwrap()
    }

    fn window(from: DateTime<Utc>, to: DateTime<Utc>) -> Option<TimeWindow> {
        Some(TimeWindow::new(from, to))
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
            used_live_traffic: false,
        }
    }

    fn make_stop(matrix_idx: usize, service_minutes: u32) -> WalkStop {
        WalkStop {
            stop_id: Uuid::new_v4(),
            matrix_idx,
            service_minutes,
            window: None,
        }
    }

    // ------------------------------------------------------------------
    // 1. Empty route
    // ------------------------------------------------------------------

    #[test]
    fn test_empty_route() {
        let matrix = uniform_matrix(1, 0, 0);
        let outcome = walk_route(at(8, 0), 0, 0, &[], &matrix);

        assert!(outcome.stops.is_empty());
        assert_eq!(outcome.total_distance_meters, 0);
        assert_eq!(outcome.total_duration_minutes, 0);
        assert!(outcome.return_leg.is_none());
        assert_eq!(outcome.finish_at, at(8, 0));
    }

    // ------------------------------------------------------------------
    // 2. Single stop, no window
    // ------------------------------------------------------------------

    #[test]
    fn test_single_stop() {
        let matrix = uniform_matrix(2, 10_000, 600);
        let stops = [make_stop(1, 15)];

        let outcome = walk_route(at(8, 0), 0, 0, &stops, &matrix);

        assert_eq!(outcome.stops.len(), 1);
        let stop = &outcome.stops[0];
        assert_eq!(stop.order, 1);
        assert_eq!(stop.estimated_arrival, at(8, 10));
        assert_eq!(stop.estimated_departure, at(8, 25));
        assert_eq!(stop.travel_minutes_from_previous, 10);
        assert_eq!(stop.distance_from_previous_meters, 10_000);
        assert_eq!(stop.wait_minutes, 0);

        let ret = outcome.return_leg.as_ref().unwrap();
        assert_eq!(ret.duration_minutes, 10);
        assert_eq!(ret.arrival, at(8, 35));

        assert_eq!(outcome.total_distance_meters, 20_000);
        assert_eq!(outcome.total_travel_minutes, 20);
        assert_eq!(outcome.total_service_minutes, 15);
        assert_eq!(outcome.total_duration_minutes, 35);
        assert_eq!(outcome.finish_at, at(8, 25));
    }

    // ------------------------------------------------------------------
    // 3. Travel minutes round up
    // ------------------------------------------------------------------

    #[test]
    fn test_travel_rounds_up() {
        // 601 seconds rounds to 11 minutes
        let matrix = uniform_matrix(2, 5_000, 601);
        let stops = [make_stop(1, 0)];

        let outcome = walk_route(at(8, 0), 0, 0, &stops, &matrix);
        assert_eq!(outcome.stops[0].estimated_arrival, at(8, 11));
    }

    // ------------------------------------------------------------------
    // 4. Waiting for a window to open
    // ------------------------------------------------------------------

    #[test]
    fn test_wait_for_window() {
        let matrix = uniform_matrix(2, 10_000, 600);
        let mut stop = make_stop(1, 15);
        stop.window = window(at(9, 0), at(10, 0));

        let outcome = walk_route(at(8, 0), 0, 0, &[stop], &matrix);

        let timed = &outcome.stops[0];
        assert_eq!(timed.estimated_arrival, at(8, 10));
        assert_eq!(timed.wait_minutes, 50);
        // Service starts when the window opens
        assert_eq!(timed.estimated_departure, at(9, 15));
        assert_eq!(outcome.total_wait_minutes, 50);
        assert!(outcome.unserviceable.is_empty());
    }

    // ------------------------------------------------------------------
    // 5. Missed window marks the stop unserviceable
    // ------------------------------------------------------------------

    #[test]
    fn test_missed_window() {
        let matrix = uniform_matrix(2, 10_000, 1200);
        let mut stop = make_stop(1, 15);
        // Arrival at 08:20, window closed at 08:10
        stop.window = window(at(8, 0), at(8, 10));
        let id = stop.stop_id;

        let outcome = walk_route(at(8, 0), 0, 0, &[stop], &matrix);

        assert_eq!(outcome.unserviceable, vec![id]);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].warning_type, WARNING_TIME_WINDOW_MISSED);
        assert_eq!(outcome.warnings[0].stop_id, Some(id));

        // Entry keeps its would-be timing but no service happens
        let timed = &outcome.stops[0];
        assert_eq!(timed.estimated_arrival, at(8, 20));
        assert_eq!(timed.estimated_departure, at(8, 20));

        // Nothing serviced, so no return leg and zero totals
        assert!(outcome.return_leg.is_none());
        assert_eq!(outcome.total_distance_meters, 0);
        assert_eq!(outcome.total_duration_minutes, 0);
    }

    // ------------------------------------------------------------------
    // 6. Timing after a missed stop anchors at the last serviced point
    // ------------------------------------------------------------------

    #[test]
    fn test_missed_stop_does_not_advance_cursor() {
        // origin=0, s1=1, s2=2; origin->s2 takes 20 min, s1->s2 only 5
        let mut matrix = uniform_matrix(3, 10_000, 600);
        matrix.durations[1][2] = 300;
        matrix.durations[0][2] = 1200;
        matrix.distances[0][2] = 20_000;

        let mut missed = make_stop(1, 15);
        missed.window = window(at(7, 0), at(7, 30));
        let reachable = make_stop(2, 10);

        let outcome = walk_route(at(8, 0), 0, 0, &[missed, reachable], &matrix);

        assert_eq!(outcome.unserviceable.len(), 1);
        // Second stop is reached directly from the origin
        assert_eq!(outcome.stops[1].estimated_arrival, at(8, 20));
        assert_eq!(outcome.stops[1].travel_minutes_from_previous, 20);
        assert_eq!(outcome.stops[1].distance_from_previous_meters, 20_000);
    }

    // ------------------------------------------------------------------
    // 7. Unreachable leg
    // ------------------------------------------------------------------

    #[test]
    fn test_unreachable_leg() {
        let mut matrix = uniform_matrix(3, 10_000, 600);
        matrix.durations[0][1] = UNREACHABLE_COST;
        matrix.distances[0][1] = UNREACHABLE_COST;

        let cut_off = make_stop(1, 15);
        let id = cut_off.stop_id;
        let fine = make_stop(2, 10);

        let outcome = walk_route(at(8, 0), 0, 0, &[cut_off, fine], &matrix);

        assert_eq!(outcome.unserviceable, vec![id]);
        assert_eq!(outcome.warnings[0].warning_type, WARNING_UNREACHABLE);
        assert_eq!(outcome.stops[0].travel_minutes_from_previous, 0);

        // The reachable stop is unaffected
        assert_eq!(outcome.stops[1].estimated_arrival, at(8, 10));
        assert!(outcome.return_leg.is_some());
    }

    // ------------------------------------------------------------------
    // 8. Multi-stop identities
    // ------------------------------------------------------------------

    #[test]
    fn test_multi_stop_identities() {
        let matrix = uniform_matrix(4, 5_000, 900);
        let stops = [make_stop(1, 10), make_stop(2, 20), make_stop(3, 5)];

        let outcome = walk_route(at(8, 0), 0, 0, &stops, &matrix);

        // departure = arrival + wait + service for every serviced stop
        for (walk_stop, timed) in stops.iter().zip(&outcome.stops) {
            let expected = timed.estimated_arrival
                + Duration::minutes((timed.wait_minutes + walk_stop.service_minutes) as i64);
            assert_eq!(timed.estimated_departure, expected);
        }

        // arrival = previous departure + travel
        for pair in outcome.stops.windows(2) {
            let expected = pair[0].estimated_departure
                + Duration::minutes(pair[1].travel_minutes_from_previous as i64);
            assert_eq!(pair[1].estimated_arrival, expected);
        }

        // 4 legs of 15 min (3 out + return), 35 min of service
        assert_eq!(outcome.total_travel_minutes, 60);
        assert_eq!(outcome.total_service_minutes, 35);
        assert_eq!(
            outcome.total_duration_minutes,
            outcome.total_travel_minutes
                + outcome.total_service_minutes
                + outcome.total_wait_minutes
        );
        assert_eq!(outcome.total_distance_meters, 20_000);
    }

    // ------------------------------------------------------------------
    // 9. Return towards a different closing point
    // ------------------------------------------------------------------

    #[test]
    fn test_return_to_other_index() {
        let mut matrix = uniform_matrix(3, 10_000, 600);
        matrix.durations[1][2] = 1800;
        matrix.distances[1][2] = 30_000;

        let outcome = walk_route(at(8, 0), 0, 2, &[make_stop(1, 0)], &matrix);

        let ret = outcome.return_leg.as_ref().unwrap();
        assert_eq!(ret.duration_minutes, 30);
        assert_eq!(ret.distance_meters, 30_000);
        assert_eq!(ret.arrival, at(8, 40));
    }
}
