//! Shutdown orchestration.
//!
//! # State Machine
//! ```text
//! Running ──signal──▶ Draining ──in-flight == 0 or deadline──▶ Stopping
//!     ──transport closed (or failed)──▶ CleaningUp ──all steps run──▶ Terminated
//! ```
//!
//! The drain loop and the transport close share one deadline. Cleanup always
//! runs, with its own budget, even after a forced drain or a transport
//! failure.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};

use crate::config::ShutdownConfig;
use crate::lifecycle::cleanup::{CleanupReport, CleanupSequence};
use crate::lifecycle::state::{LifecyclePhase, ServiceState};
use crate::lifecycle::transport::{Transport, TransportError};
use crate::observability::metrics;

/// How the drain phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every admitted request finished before the deadline.
    Clean { waited: Duration },
    /// The deadline fired first; the orchestrator moved on anyway.
    TimedOut { in_flight: usize },
}

impl DrainOutcome {
    pub fn is_clean(&self) -> bool {
        matches!(self, DrainOutcome::Clean { .. })
    }
}

/// Why a shutdown did not complete gracefully.
#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("failed to stop transport: {0}")]
    TransportClose(#[from] TransportError),

    #[error("{in_flight} request(s) still in flight when the drain deadline expired")]
    DrainTimeout { in_flight: usize },

    #[error("shutdown deadline exceeded before cleanup started")]
    DeadlineExceeded,

    #[error("cleanup incomplete, failed steps: {}", .failed.join(", "))]
    CleanupIncomplete { failed: Vec<String> },
}

/// Everything that happened during one shutdown run.
#[derive(Debug)]
pub struct ShutdownReport {
    pub drain: DrainOutcome,
    pub transport: Result<(), TransportError>,
    /// The shared deadline had already passed when cleanup started.
    pub deadline_exceeded: bool,
    pub cleanup: CleanupReport,
    pub elapsed: Duration,
}

impl ShutdownReport {
    /// Collapse the report into a single verdict.
    ///
    /// Transport failure outranks a drain timeout, which outranks a late
    /// finish, which outranks cleanup failures.
    pub fn into_result(self) -> Result<Self, ShutdownError> {
        let ShutdownReport {
            drain,
            transport,
            deadline_exceeded,
            cleanup,
            elapsed,
        } = self;

        transport?;
        if let DrainOutcome::TimedOut { in_flight } = drain {
            return Err(ShutdownError::DrainTimeout { in_flight });
        }
        if deadline_exceeded {
            return Err(ShutdownError::DeadlineExceeded);
        }
        if !cleanup.is_success() {
            return Err(ShutdownError::CleanupIncomplete {
                failed: cleanup.failed_steps(),
            });
        }

        Ok(ShutdownReport {
            drain,
            transport: Ok(()),
            deadline_exceeded,
            cleanup,
            elapsed,
        })
    }

    fn outcome_label(&self) -> &'static str {
        match (&self.transport, self.drain) {
            (Err(_), _) => "transport_failure",
            (Ok(()), DrainOutcome::TimedOut { .. }) => "drain_timeout",
            _ if self.deadline_exceeded => "deadline_exceeded",
            _ if !self.cleanup.is_success() => "cleanup_incomplete",
            _ => "clean",
        }
    }
}

/// Runs the shutdown sequence once, after a termination signal.
pub struct ShutdownOrchestrator<T> {
    service: Arc<ServiceState>,
    transport: T,
    cleanup: CleanupSequence,
    drain_timeout: Duration,
    poll_interval: Duration,
    cleanup_timeout: Duration,
    cleanup_step_timeout: Duration,
}

impl<T: Transport> ShutdownOrchestrator<T> {
    pub fn new(
        service: Arc<ServiceState>,
        transport: T,
        cleanup: CleanupSequence,
        config: &ShutdownConfig,
    ) -> Self {
        Self {
            service,
            transport,
            cleanup,
            drain_timeout: config.drain_timeout(),
            poll_interval: config.poll_interval(),
            cleanup_timeout: config.cleanup_timeout(),
            cleanup_step_timeout: config.cleanup_step_timeout(),
        }
    }

    /// Drive the state machine from `Running` to `Terminated`.
    pub async fn run(mut self) -> ShutdownReport {
        let started = Instant::now();
        let deadline = started + self.drain_timeout;

        // Running → Draining
        self.service.set_shutting_down();
        self.service.advance_phase(LifecyclePhase::Draining);
        tracing::info!(
            grace_period = ?self.drain_timeout,
            in_flight = self.service.snapshot_in_flight(),
            "Graceful shutdown started, rejecting new requests"
        );

        let drain = drain_in_flight(&self.service, deadline, self.poll_interval).await;

        // Draining → Stopping
        self.service.advance_phase(LifecyclePhase::Stopping);
        tracing::info!("Stopping transport");
        let transport = self.transport.stop_accepting(deadline).await;
        match &transport {
            Ok(()) => tracing::info!("Transport stopped"),
            Err(e) => tracing::error!(error = %e, "Transport failed to stop"),
        }

        // Stopping → CleaningUp
        let deadline_exceeded = Instant::now() >= deadline;
        self.service.advance_phase(LifecyclePhase::CleaningUp);
        let cleanup = self
            .cleanup
            .run(Instant::now() + self.cleanup_timeout, self.cleanup_step_timeout)
            .await;

        // CleaningUp → Terminated
        self.service.advance_phase(LifecyclePhase::Terminated);
        let report = ShutdownReport {
            drain,
            transport,
            deadline_exceeded,
            cleanup,
            elapsed: started.elapsed(),
        };
        let outcome = report.outcome_label();
        metrics::record_shutdown(outcome);
        tracing::info!(outcome, elapsed = ?report.elapsed, "Shutdown sequence finished");
        report
    }
}

/// Wait for the in-flight counter to reach zero, or for `deadline`.
///
/// Polls every `poll_interval`, starting immediately, so an idle service
/// exits on the first check.
pub async fn drain_in_flight(
    service: &ServiceState,
    deadline: Instant,
    poll_interval: Duration,
) -> DrainOutcome {
    let started = Instant::now();
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let expired = sleep_until(deadline);
    tokio::pin!(expired);

    loop {
        tokio::select! {
            biased;

            _ = &mut expired => {
                let in_flight = service.snapshot_in_flight();
                tracing::warn!(in_flight, "Drain deadline reached, forcing shutdown");
                return DrainOutcome::TimedOut { in_flight };
            }
            _ = ticker.tick() => {
                let in_flight = service.snapshot_in_flight();
                if in_flight == 0 {
                    let waited = started.elapsed();
                    tracing::info!(waited = ?waited, "All in-flight requests finished");
                    return DrainOutcome::Clean { waited };
                }
                tracing::info!(in_flight, "Waiting for in-flight requests");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::cleanup::{FnStep, StepResult};
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct RecordingTransport {
        stopped_at: Arc<Mutex<Option<Instant>>>,
        fail: bool,
    }

    impl RecordingTransport {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn stopped_at(&self) -> Option<Instant> {
            *self.stopped_at.lock().unwrap()
        }
    }

    impl Transport for RecordingTransport {
        async fn stop_accepting(&mut self, _deadline: Instant) -> Result<(), TransportError> {
            *self.stopped_at.lock().unwrap() = Some(Instant::now());
            if self.fail {
                Err(TransportError::Timeout)
            } else {
                Ok(())
            }
        }
    }

    fn orchestrator<T: Transport>(
        service: &Arc<ServiceState>,
        transport: T,
        cleanup: CleanupSequence,
        drain_ms: u64,
        poll_ms: u64,
    ) -> ShutdownOrchestrator<T> {
        let config = ShutdownConfig {
            poll_interval_ms: poll_ms,
            cleanup_timeout_secs: 5,
            cleanup_step_timeout_ms: 1_000,
            ..ShutdownConfig::default()
        };
        let mut orch = ShutdownOrchestrator::new(Arc::clone(service), transport, cleanup, &config);
        orch.drain_timeout = Duration::from_millis(drain_ms);
        orch
    }

    #[tokio::test(start_paused = true)]
    async fn idle_service_drains_immediately() {
        let service = Arc::new(ServiceState::new());
        let transport = RecordingTransport::default();
        let start = Instant::now();

        let report = orchestrator(&service, transport.clone(), CleanupSequence::new(), 30_000, 1_000)
            .run()
            .await;

        assert_eq!(report.drain, DrainOutcome::Clean { waited: Duration::ZERO });
        assert!(transport.stopped_at().unwrap() - start <= Duration::from_secs(1));
        assert!(service.is_shutting_down());
        assert_eq!(service.phase(), LifecyclePhase::Terminated);
        assert!(report.into_result().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_last_request_then_next_tick() {
        let service = Arc::new(ServiceState::new());
        let transport = RecordingTransport::default();
        let start = Instant::now();

        for finish_ms in [500, 1_200, 2_700] {
            let guard = service.admit();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(finish_ms)).await;
                drop(guard);
            });
        }

        let report = orchestrator(&service, transport.clone(), CleanupSequence::new(), 30_000, 1_000)
            .run()
            .await;

        assert_eq!(report.drain, DrainOutcome::Clean { waited: Duration::from_secs(3) });
        assert_eq!(transport.stopped_at().unwrap() - start, Duration::from_secs(3));
        assert_eq!(service.snapshot_in_flight(), 0);
        assert!(report.into_result().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_request_forces_shutdown_at_deadline() {
        let service = Arc::new(ServiceState::new());
        let transport = RecordingTransport::default();
        let start = Instant::now();
        let _stuck = service.admit();

        let report = orchestrator(&service, transport.clone(), CleanupSequence::new(), 2_500, 1_000)
            .run()
            .await;

        assert_eq!(report.drain, DrainOutcome::TimedOut { in_flight: 1 });
        assert_eq!(transport.stopped_at().unwrap() - start, Duration::from_millis(2_500));
        assert!(report.deadline_exceeded);
        assert!(matches!(
            report.into_result(),
            Err(ShutdownError::DrainTimeout { in_flight: 1 })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn readiness_flips_before_drain_completes() {
        let service = Arc::new(ServiceState::new());
        service.set_ready();
        let guard = service.admit();

        let handle = {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                orchestrator(&service, RecordingTransport::default(), CleanupSequence::new(), 10_000, 1_000)
                    .run()
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!service.is_accepting_traffic());
        assert_eq!(service.phase(), LifecyclePhase::Draining);

        drop(guard);
        let report = handle.await.unwrap();
        assert!(report.drain.is_clean());
    }

    #[tokio::test]
    async fn transport_failure_is_fatal_but_cleanup_still_runs() {
        let service = Arc::new(ServiceState::new());
        let ran = Arc::new(Mutex::new(false));
        let cleanup = {
            let ran = Arc::clone(&ran);
            CleanupSequence::new().with_step(FnStep::new("close pool", move || {
                *ran.lock().unwrap() = true;
                Ok(())
            }))
        };

        let report = orchestrator(&service, RecordingTransport::failing(), cleanup, 1_000, 50)
            .run()
            .await;

        assert!(*ran.lock().unwrap());
        assert_eq!(report.cleanup.steps[0].result, StepResult::Completed);
        assert!(matches!(
            report.into_result(),
            Err(ShutdownError::TransportClose(TransportError::Timeout))
        ));
    }

    #[tokio::test]
    async fn cleanup_runs_after_forced_drain() {
        let service = Arc::new(ServiceState::new());
        let _stuck = service.admit();
        let cleanup = CleanupSequence::new()
            .with_step(FnStep::new("release files", || Ok(())))
            .with_step(FnStep::new("flush telemetry", || Ok(())));

        let report = orchestrator(&service, RecordingTransport::default(), cleanup, 100, 20)
            .run()
            .await;

        assert!(!report.drain.is_clean());
        assert!(report.cleanup.is_success());
        assert_eq!(report.cleanup.steps.len(), 2);
        assert_eq!(service.phase(), LifecyclePhase::Terminated);
    }

    #[tokio::test]
    async fn failed_cleanup_step_is_reported() {
        let service = Arc::new(ServiceState::new());
        let cleanup = CleanupSequence::new()
            .with_step(FnStep::new("close pool", || {
                Err(crate::lifecycle::cleanup::CleanupError::Failed("refused".into()))
            }));

        let report = orchestrator(&service, RecordingTransport::default(), cleanup, 1_000, 50)
            .run()
            .await;

        assert!(report.drain.is_clean());
        match report.into_result() {
            Err(ShutdownError::CleanupIncomplete { failed }) => assert_eq!(failed, vec!["close pool"]),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
