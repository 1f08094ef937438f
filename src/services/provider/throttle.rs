//! Call pacing and failure backoff for the matrix service client

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Enforces a minimum interval between outbound calls.
///
/// Concurrent callers reserve their slot under the lock and sleep outside
/// it, so a slow sleeper never blocks the next reservation.
pub struct RateLimiter {
    next_slot: Arc<Mutex<Option<Instant>>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            next_slot: Arc::new(Mutex::new(None)),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait until the next call slot is free.
    pub async fn wait(&self) {
        let delay = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next_slot {
                Some(slot) if slot > now => slot,
                _ => now,
            };
            *next_slot = Some(slot + self.min_interval);
            slot.saturating_duration_since(now)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Stops calling out after repeated failures, until a recovery period passes.
pub struct CircuitBreaker {
    failure_count: AtomicU32,
    threshold: u32,
    last_failure: Arc<Mutex<Option<Instant>>>,
    recovery_time: Duration,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, recovery_secs: u64) -> Self {
        Self {
            failure_count: AtomicU32::new(0),
            threshold,
            last_failure: Arc::new(Mutex::new(None)),
            recovery_time: Duration::from_secs(recovery_secs),
        }
    }

    /// Whether calls should be short-circuited right now. Once the recovery
    /// period has passed the next call is let through as a probe; its result
    /// closes or re-opens the circuit.
    pub fn is_open(&self) -> bool {
        if self.failure_count.load(Ordering::Relaxed) < self.threshold {
            return false;
        }

        // Contention here means another task is recording a failure.
        match self.last_failure.try_lock() {
            Ok(last) => match *last {
                Some(at) => at.elapsed() < self.recovery_time,
                None => false,
            },
            Err(_) => true,
        }
    }

    pub fn record_success(&self) {
        self.failure_count.store(0, Ordering::Relaxed);
    }

    pub async fn record_failure(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
        let mut last = self.last_failure.lock().await;
        *last = Some(Instant::now());
    }
}
