//! Engine services

pub mod eta;
pub mod fingerprint;
pub mod geo;
pub mod optimize;
pub mod pinning;
pub mod provider;
pub mod schedule;
pub mod solver;
