//! Health Checks - Liveness and Readiness Probes
//!
//! `/live` answers 200 while the process runs. `/ready` answers 200
//! until graceful shutdown begins, then 503 so load balancers stop
//! routing probes here.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Shared readiness flag.
#[derive(Debug, Clone)]
pub struct HealthState {
    ready: Arc<AtomicBool>,
}

impl HealthState {
    /// Create a new health state (ready by default).
    pub fn new() -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Whether the exporter accepts probes.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    /// Mark the exporter as draining.
    pub fn set_not_ready(&self) {
        self.ready.store(false, Ordering::Relaxed);
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

/// Liveness probe: always returns 200 if the process is running.
pub async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Readiness probe: returns 503 once shutdown has started.
pub async fn readiness(State(health): State<HealthState>) -> impl IntoResponse {
    if health.is_ready() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}
