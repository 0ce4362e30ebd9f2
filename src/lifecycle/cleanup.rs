//! Ordered teardown steps run at the end of shutdown.
//!
//! # Design Decisions
//! - Steps are synchronous and run one at a time, each on its own detached
//!   thread; an overrun step is abandoned and never holds up runtime shutdown
//! - Each step is bounded by `min(step timeout, remaining cleanup budget)`
//! - A failed, panicked or timed-out step is logged; the next step still runs
//! - The sequence reports per-step outcomes instead of failing fast

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::{timeout_at, Instant};

use crate::config::CleanupConfig;
use crate::observability::metrics;

/// A cleanup step reported failure.
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("cleanup step failed: {0}")]
    Failed(String),
}

/// A single teardown action.
pub trait CleanupStep: Send + Sync {
    fn name(&self) -> &str;

    fn run(&self) -> Result<(), CleanupError>;
}

/// A step that blocks for a nominal duration and always succeeds.
#[derive(Debug, Clone)]
pub struct SimulatedStep {
    name: String,
    duration: Duration,
}

impl SimulatedStep {
    pub fn new(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            duration,
        }
    }
}

impl CleanupStep for SimulatedStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self) -> Result<(), CleanupError> {
        std::thread::sleep(self.duration);
        Ok(())
    }
}

/// A step backed by a closure.
pub struct FnStep<F> {
    name: String,
    f: F,
}

impl<F> FnStep<F>
where
    F: Fn() -> Result<(), CleanupError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> CleanupStep for FnStep<F>
where
    F: Fn() -> Result<(), CleanupError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self) -> Result<(), CleanupError> {
        (self.f)()
    }
}

/// How a single step ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    Completed,
    Failed(String),
    Panicked,
    TimedOut,
}

impl StepResult {
    pub fn is_success(&self) -> bool {
        matches!(self, StepResult::Completed)
    }

    fn label(&self) -> &'static str {
        match self {
            StepResult::Completed => "completed",
            StepResult::Failed(_) => "failed",
            StepResult::Panicked => "panicked",
            StepResult::TimedOut => "timed_out",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub name: String,
    pub result: StepResult,
    pub elapsed: Duration,
}

/// Aggregate result of a cleanup run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub steps: Vec<StepOutcome>,
}

impl CleanupReport {
    pub fn is_success(&self) -> bool {
        self.steps.iter().all(|s| s.result.is_success())
    }

    pub fn failed_steps(&self) -> Vec<String> {
        self.steps
            .iter()
            .filter(|s| !s.result.is_success())
            .map(|s| s.name.clone())
            .collect()
    }
}

/// Ordered list of teardown steps, run once by the orchestrator.
#[derive(Clone, Default)]
pub struct CleanupSequence {
    steps: Vec<Arc<dyn CleanupStep>>,
}

impl CleanupSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated steps as listed in the configuration.
    pub fn from_config(config: &CleanupConfig) -> Self {
        config.steps.iter().fold(Self::new(), |seq, step| {
            seq.with_step(SimulatedStep::new(
                step.name.clone(),
                Duration::from_millis(step.duration_ms),
            ))
        })
    }

    /// Append a step; steps run in insertion order.
    pub fn with_step(mut self, step: impl CleanupStep + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order, never aborting early.
    pub async fn run(&self, deadline: Instant, step_timeout: Duration) -> CleanupReport {
        let mut report = CleanupReport::default();

        for step in &self.steps {
            let name = step.name().to_string();
            let started = Instant::now();
            let step_deadline = deadline.min(started + step_timeout);
            tracing::info!(step = %name, "Running cleanup step");

            let result = run_step(Arc::clone(step), step_deadline).await;

            metrics::record_cleanup_step(&name, result.label());
            report.steps.push(StepOutcome {
                name,
                result,
                elapsed: started.elapsed(),
            });
        }

        if report.is_success() {
            tracing::info!(steps = report.steps.len(), "All cleanup steps complete");
        } else {
            tracing::warn!(failed = ?report.failed_steps(), "Cleanup finished with failures");
        }
        report
    }
}

/// Run one step on a detached thread, waiting for it until `deadline`.
async fn run_step(step: Arc<dyn CleanupStep>, deadline: Instant) -> StepResult {
    let name = step.name().to_string();
    let (tx, rx) = oneshot::channel();

    let spawned = std::thread::Builder::new()
        .name("cleanup-step".into())
        .spawn(move || {
            let _ = tx.send(step.run());
        });
    if let Err(e) = spawned {
        tracing::warn!(step = %name, error = %e, "Cleanup step could not start, continuing");
        return StepResult::Failed(e.to_string());
    }

    match timeout_at(deadline, rx).await {
        Ok(Ok(Ok(()))) => StepResult::Completed,
        Ok(Ok(Err(e))) => {
            tracing::warn!(step = %name, error = %e, "Cleanup step failed, continuing");
            StepResult::Failed(e.to_string())
        }
        // The sender only goes away without a result when the step unwound.
        Ok(Err(_)) => {
            tracing::warn!(step = %name, "Cleanup step panicked, continuing");
            StepResult::Panicked
        }
        Err(_) => {
            tracing::warn!(step = %name, "Cleanup step timed out, continuing");
            StepResult::TimedOut
        }
    }
}
