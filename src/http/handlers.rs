//! Route handlers.

use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rand::Rng;

use crate::config::HandlerConfig;
use crate::health::probes::{self, ProbeStatus};
use crate::http::server::AppState;
use crate::lifecycle::state::StateSnapshot;

/// `GET /`: simulated work, or 503 once shutdown has begun.
pub async fn root_handler(State(state): State<AppState>) -> Response {
    if state.service.is_shutting_down() {
        tracing::debug!("Rejecting request during shutdown");
        return (StatusCode::SERVICE_UNAVAILABLE, "Server is shutting down\n").into_response();
    }

    let processing = processing_time(&state.handler);
    tracing::info!(processing_time = ?processing, "Processing request");
    tokio::time::sleep(processing).await;

    (
        StatusCode::OK,
        format!("Hello from Managed Lifecycle App!\nProcessing time: {processing:?}\n"),
    )
        .into_response()
}

/// `GET /health`: liveness.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, &'static str) {
    let status = probes::liveness(&state.service);
    let body = match status {
        ProbeStatus::Healthy => "healthy\n",
        ProbeStatus::Unhealthy => "unhealthy\n",
    };
    (status.status_code(), body)
}

/// `GET /ready`: readiness.
pub async fn ready_handler(State(state): State<AppState>) -> (StatusCode, &'static str) {
    let status = probes::readiness(&state.service);
    let body = match status {
        ProbeStatus::Healthy => "ready\n",
        ProbeStatus::Unhealthy => "not ready\n",
    };
    (status.status_code(), body)
}

/// `GET /status`: JSON snapshot of the lifecycle state.
pub async fn status_handler(State(state): State<AppState>) -> Json<StateSnapshot> {
    Json(state.service.snapshot())
}

/// Any other path. Registered explicitly so admission also covers it.
pub async fn not_found_handler() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "not found\n")
}

fn processing_time(config: &HandlerConfig) -> Duration {
    let ms = rand::thread_rng().gen_range(config.min_processing_ms..=config.max_processing_ms);
    Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processing_time_stays_in_range() {
        let config = HandlerConfig {
            min_processing_ms: 20,
            max_processing_ms: 30,
        };
        for _ in 0..100 {
            let t = processing_time(&config);
            assert!(t >= Duration::from_millis(20) && t <= Duration::from_millis(30));
        }
    }

    #[test]
    fn fixed_processing_time() {
        let config = HandlerConfig {
            min_processing_ms: 7,
            max_processing_ms: 7,
        };
        assert_eq!(processing_time(&config), Duration::from_millis(7));
    }
}
