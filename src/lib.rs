//! Route optimization and live-ETA engine for the Trasovka delivery platform.
//!
//! Two entry points: [`RouteOptimizer::optimize`] turns a depot and a stop
//! set into a feasible, low-cost visiting order with per-stop timing, and
//! [`EtaEngine::recalculate`] revises downstream arrival estimates once a
//! stop completes mid-trip. Persistence, transport, and notifications live
//! with the caller; this crate is a pure computation boundary over plain
//! data structures.

pub mod config;
pub mod defaults;
pub mod error;
pub mod services;
pub mod types;

pub use config::OptimizerConfig;
pub use error::{InputError, OptimizeError, ProviderError, RecalculateError};
pub use services::eta::{EtaEngine, RouteStore};
pub use services::fingerprint::fingerprint_stops;
pub use services::optimize::RouteOptimizer;
pub use services::provider::{
    CostMatrix, CostProvider, create_cost_provider, EstimateProvider, LegCost, MatrixApiClient,
    MatrixApiConfig,
};
pub use services::solver::SolverConfig;
pub use types::{
    Coordinates, CostMode, Depot, OptimizationResult, OptimizeRequest, RecalculatedStop,
    RecalculationResult, ReturnLeg, RouteProgress, RouteWarning, Stop, StopProgress, StopStatus,
    TimeWindow, TimedStop,
};
