//! One-shot warm-up task.
//!
//! Runs concurrently with the transport, which may already be accepting
//! connections. The readiness probe, not connection acceptance, keeps
//! traffic away until warm-up finishes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::lifecycle::state::ServiceState;

/// Initialization failed; the service will never become ready.
#[derive(Debug, Error)]
pub enum WarmupError {
    #[error("warm-up failed: {0}")]
    Failed(String),
}

/// Background initialization that flips readiness on success.
pub struct WarmupTask {
    service: Arc<ServiceState>,
    duration: Duration,
}

impl WarmupTask {
    pub fn new(service: Arc<ServiceState>, duration: Duration) -> Self {
        Self { service, duration }
    }

    /// Run the simulated initialization on the runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Simulated initialization: a fixed sleep that cannot fail.
    pub async fn run(self) {
        let duration = self.duration;
        self.run_with(async move {
            tokio::time::sleep(duration).await;
            Ok(())
        })
        .await
    }

    /// Drive `init` to completion, then record the outcome.
    ///
    /// On success readiness is set exactly once. On failure readiness stays
    /// false and the liveness probe starts failing.
    pub async fn run_with<F>(self, init: F)
    where
        F: Future<Output = Result<(), WarmupError>>,
    {
        tracing::info!(duration = ?self.duration, "Warm-up started");
        match init.await {
            Ok(()) => {
                self.service.set_ready();
                tracing::info!("Warm-up complete, service ready");
            }
            Err(e) => {
                self.service.mark_warmup_failed();
                tracing::error!(error = %e, "Warm-up failed, service will stay unready");
            }
        }
    }
}
