//! Geographic calculations

use crate::types::Coordinates;

/// Earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Calculate Haversine distance between two points in kilometers
pub fn haversine_distance(from: &Coordinates, to: &Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lon = (to.lng - from.lng).to_radians();

    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Estimate road distance in meters from the straight-line distance
pub fn estimate_distance_meters(
    from: &Coordinates,
    to: &Coordinates,
    road_coefficient: f64,
) -> u64 {
    (haversine_distance(from, to) * road_coefficient * 1000.0) as u64
}

/// Estimate travel duration in seconds at the given average speed
pub fn estimate_duration_seconds(
    from: &Coordinates,
    to: &Coordinates,
    road_coefficient: f64,
    average_speed_kmh: f64,
) -> u64 {
    let road_km = haversine_distance(from, to) * road_coefficient;
    ((road_km / average_speed_kmh) * 3600.0) as u64
}
