//! The transport seam used by the shutdown orchestrator.

use std::future::Future;

use thiserror::Error;
use tokio::time::Instant;

/// Failure to stop the transport within its budget.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport did not close before the shutdown deadline")]
    Timeout,

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport task failed: {0}")]
    Task(String),
}

/// What the orchestrator needs from the host transport.
pub trait Transport: Send {
    /// Refuse new connections and wait for open ones to close, no later
    /// than `deadline`.
    fn stop_accepting(
        &mut self,
        deadline: Instant,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}
