//! OS signal handling.
//!
//! SIGTERM ("please terminate") and SIGINT (interactive interrupt) are
//! equivalent triggers for the graceful shutdown sequence. Only the first
//! signal is acted on.

use std::fmt;
use std::io;

/// Which termination signal arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    Terminate,
    Interrupt,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationSignal::Terminate => f.write_str("SIGTERM"),
            TerminationSignal::Interrupt => f.write_str("SIGINT"),
        }
    }
}

/// Wait for SIGTERM or SIGINT.
///
/// Fails only if the signal handlers cannot be installed.
#[cfg(unix)]
pub async fn wait_for_termination() -> io::Result<TerminationSignal> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;

    let received = tokio::select! {
        _ = terminate.recv() => TerminationSignal::Terminate,
        _ = interrupt.recv() => TerminationSignal::Interrupt,
    };
    tracing::info!(signal = %received, "Termination signal received");
    Ok(received)
}

#[cfg(not(unix))]
pub async fn wait_for_termination() -> io::Result<TerminationSignal> {
    tokio::signal::ctrl_c().await?;
    tracing::info!(signal = %TerminationSignal::Interrupt, "Termination signal received");
    Ok(TerminationSignal::Interrupt)
}
