//! Shared engine defaults

/// Fallback service duration for stops created without one
pub const DEFAULT_SERVICE_DURATION_MINUTES: u32 = 30;

/// Road distance coefficient for the haversine estimate (straight line to road)
pub const DEFAULT_ROAD_COEFFICIENT: f64 = 1.3;

/// Average speed in km/h for estimated travel times
pub const DEFAULT_AVERAGE_SPEED_KMH: f64 = 40.0;

/// HTTP timeout for a single matrix service request
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Attempts per matrix service call before giving up on transient failures
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;

/// Base delay for exponential retry backoff
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 250;

/// Minimum interval between per-leg matrix service calls in a batch
pub const DEFAULT_LEG_PACING_MS: u64 = 200;

/// Consecutive failures before the matrix client stops calling out
pub const DEFAULT_CIRCUIT_BREAKER_THRESHOLD: u32 = 3;

/// How long the matrix client backs off once the breaker has opened
pub const DEFAULT_CIRCUIT_BREAKER_RECOVERY_SECS: u64 = 60;

/// Improvement sweep cap shared by 2-opt and the window-aware swap pass
pub const DEFAULT_MAX_IMPROVEMENT_PASSES: usize = 100;

/// Cost slack (minutes) a window-aware move may add when it removes a violation
pub const DEFAULT_IMPROVEMENT_TOLERANCE_MINUTES: u32 = 1;
