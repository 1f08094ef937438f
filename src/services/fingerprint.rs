//! Stop-set fingerprint
//!
//! Order- and content-sensitive digest over a stop list, used to decide
//! whether re-optimization can be skipped. Covers each stop's id, exact
//! coordinate bits, and window bounds; service duration and priority do
//! not change which tour is optimal enough to warrant a re-run.

use sha2::{Digest, Sha256};

use crate::types::Stop;

/// Hex SHA-256 over the stop set, in input order.
pub fn fingerprint_stops(stops: &[Stop]) -> String {
    let mut hasher = Sha256::new();

    for stop in stops {
        hasher.update(stop.id.as_bytes());
        hasher.update(stop.coordinates.lat.to_bits().to_be_bytes());
        hasher.update(stop.coordinates.lng.to_bits().to_be_bytes());
        match &stop.time_window {
            Some(window) => {
                hasher.update([1u8]);
                hasher.update(window.start.timestamp().to_be_bytes());
                hasher.update(window.end.timestamp().to_be_bytes());
            }
            None => hasher.update([0u8]),
        }
    }

    hex::encode(hasher.finalize())
}
