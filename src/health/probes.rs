//! Liveness and readiness evaluation.

use axum::http::StatusCode;

use crate::lifecycle::state::ServiceState;

/// Result of a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    Healthy,
    Unhealthy,
}

impl ProbeStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ProbeStatus::Healthy)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ProbeStatus::Healthy => StatusCode::OK,
            ProbeStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Healthy whenever the process can answer, unless warm-up failed for good.
pub fn liveness(state: &ServiceState) -> ProbeStatus {
    if state.warmup_failed() {
        ProbeStatus::Unhealthy
    } else {
        ProbeStatus::Healthy
    }
}

/// Healthy iff warm-up finished and shutdown has not begun.
pub fn readiness(state: &ServiceState) -> ProbeStatus {
    if state.is_accepting_traffic() {
        ProbeStatus::Healthy
    } else {
        ProbeStatus::Unhealthy
    }
}
