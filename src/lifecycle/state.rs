//! Process-wide service state.
//!
//! Holds the readiness flag, the shutdown flag, the in-flight request counter
//! and the current lifecycle phase. One instance is created by the
//! composition root and shared through `Arc` with the admission middleware,
//! the probes, the warm-up task and the shutdown orchestrator.
//!
//! All fields are atomics, so readers never block. The two flags and the
//! phase only ever move forward.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::observability::metrics;

/// Lifecycle phase, ordered by progression.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    Running = 0,
    Draining = 1,
    Stopping = 2,
    CleaningUp = 3,
    Terminated = 4,
}

impl From<u8> for LifecyclePhase {
    fn from(val: u8) -> Self {
        match val {
            0 => LifecyclePhase::Running,
            1 => LifecyclePhase::Draining,
            2 => LifecyclePhase::Stopping,
            3 => LifecyclePhase::CleaningUp,
            _ => LifecyclePhase::Terminated,
        }
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecyclePhase::Running => "running",
            LifecyclePhase::Draining => "draining",
            LifecyclePhase::Stopping => "stopping",
            LifecyclePhase::CleaningUp => "cleaning_up",
            LifecyclePhase::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Shared readiness/shutdown flags and in-flight counter.
#[derive(Debug)]
pub struct ServiceState {
    ready: AtomicBool,
    shutting_down: AtomicBool,
    warmup_failed: AtomicBool,
    in_flight: AtomicUsize,
    phase: AtomicU8,
}

impl ServiceState {
    pub fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            shutting_down: AtomicBool::new(false),
            warmup_failed: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            phase: AtomicU8::new(LifecyclePhase::Running as u8),
        }
    }

    /// Count one more admitted request. Returns the new count.
    pub fn increment_in_flight(&self) -> usize {
        let count = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::in_flight_started();
        count
    }

    /// Release one admitted request. Returns the new count.
    ///
    /// Saturates at zero: an unmatched decrement is logged and ignored.
    pub fn decrement_in_flight(&self) -> usize {
        let previous = self
            .in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match previous {
            Ok(n) => {
                metrics::in_flight_finished();
                n - 1
            }
            Err(_) => {
                tracing::warn!("In-flight decrement without matching increment ignored");
                0
            }
        }
    }

    pub fn snapshot_in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Admit one unit of work. The slot is released when the guard drops.
    pub fn admit(self: &Arc<Self>) -> InFlightGuard {
        self.increment_in_flight();
        InFlightGuard {
            state: Arc::clone(self),
        }
    }

    /// Flip readiness on. Returns `true` only for the call that flipped it.
    pub fn set_ready(&self) -> bool {
        let flipped = !self.ready.swap(true, Ordering::SeqCst);
        if flipped {
            metrics::set_ready(true);
        }
        flipped
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Flip the shutdown flag on. Returns `true` only for the call that flipped it.
    pub fn set_shutting_down(&self) -> bool {
        !self.shutting_down.swap(true, Ordering::SeqCst)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Ready and not shutting down: eligible for new external traffic.
    pub fn is_accepting_traffic(&self) -> bool {
        self.is_ready() && !self.is_shutting_down()
    }

    pub fn mark_warmup_failed(&self) {
        self.warmup_failed.store(true, Ordering::SeqCst);
    }

    pub fn warmup_failed(&self) -> bool {
        self.warmup_failed.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> LifecyclePhase {
        LifecyclePhase::from(self.phase.load(Ordering::SeqCst))
    }

    /// Advance to `phase`. Moving backwards is a no-op.
    ///
    /// Returns the phase that was current before the call.
    pub fn advance_phase(&self, phase: LifecyclePhase) -> LifecyclePhase {
        let previous = LifecyclePhase::from(self.phase.fetch_max(phase as u8, Ordering::SeqCst));
        if previous < phase {
            tracing::debug!(from = %previous, to = %phase, "Lifecycle phase changed");
        }
        previous
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            phase: self.phase(),
            ready: self.is_ready(),
            shutting_down: self.is_shutting_down(),
            warmup_failed: self.warmup_failed(),
            in_flight: self.snapshot_in_flight(),
        }
    }
}

impl Default for ServiceState {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of [`ServiceState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    pub phase: LifecyclePhase,
    pub ready: bool,
    pub shutting_down: bool,
    pub warmup_failed: bool,
    pub in_flight: usize,
}

/// One admitted in-flight slot.
///
/// Decrements the counter when dropped, including during panic unwinding.
#[derive(Debug)]
pub struct InFlightGuard {
    state: Arc<ServiceState>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let remaining = self.state.decrement_in_flight();
        tracing::trace!(in_flight = remaining, "Request released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn starts_idle() {
        let state = ServiceState::new();
        assert_eq!(
            state.snapshot(),
            StateSnapshot {
                phase: LifecyclePhase::Running,
                ready: false,
                shutting_down: false,
                warmup_failed: false,
                in_flight: 0,
            }
        );
    }

    #[test]
    fn concurrent_counting_balances() {
        let state = Arc::new(ServiceState::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = Arc::clone(&state);
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        state.increment_in_flight();
                        state.decrement_in_flight();
                    }
                    for _ in 0..10 {
                        state.increment_in_flight();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(state.snapshot_in_flight(), 80);
    }

    #[test]
    fn decrement_never_goes_negative() {
        let state = ServiceState::new();
        assert_eq!(state.decrement_in_flight(), 0);
        assert_eq!(state.snapshot_in_flight(), 0);

        state.increment_in_flight();
        assert_eq!(state.decrement_in_flight(), 0);
        assert_eq!(state.decrement_in_flight(), 0);
    }

    #[test]
    fn in_flight_gauge_tracks_counter() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        ::metrics::with_local_recorder(&recorder, || {
            let state = Arc::new(ServiceState::new());
            let first = state.admit();
            let second = state.admit();
            drop(first);
            drop(second);
            // Unmatched release must not move the gauge below the counter.
            state.decrement_in_flight();
            let _third = state.admit();
            assert_eq!(state.snapshot_in_flight(), 1);
        });

        let rendered = handle.render();
        assert!(
            rendered.lines().any(|line| line == "lifecycle_in_flight_requests 0"),
            "{rendered}"
        );
    }

    #[test]
    fn guard_releases_on_drop() {
        let state = Arc::new(ServiceState::new());
        let first = state.admit();
        let second = state.admit();
        assert_eq!(state.snapshot_in_flight(), 2);

        drop(first);
        assert_eq!(state.snapshot_in_flight(), 1);
        drop(second);
        assert_eq!(state.snapshot_in_flight(), 0);
    }

    #[test]
    fn guard_releases_on_panic() {
        let state = Arc::new(ServiceState::new());
        let inner = Arc::clone(&state);
        let result = std::panic::catch_unwind(move || {
            let _guard = inner.admit();
            panic!("handler failed");
        });
        assert!(result.is_err());
        assert_eq!(state.snapshot_in_flight(), 0);
    }

    #[test]
    fn flags_are_one_way() {
        let state = ServiceState::new();
        assert!(state.set_ready());
        assert!(!state.set_ready());
        assert!(state.is_ready());

        assert!(state.set_shutting_down());
        assert!(!state.set_shutting_down());
        assert!(state.is_shutting_down());
        assert!(state.is_ready());
    }

    #[test]
    fn shutdown_blocks_traffic_even_before_ready() {
        let state = ServiceState::new();
        state.set_shutting_down();
        assert!(!state.is_accepting_traffic());
        state.set_ready();
        assert!(!state.is_accepting_traffic());
    }

    #[test]
    fn ready_stays_set_under_concurrent_readers() {
        let state = Arc::new(ServiceState::new());
        state.set_ready();
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let state = Arc::clone(&state);
                thread::spawn(move || (0..1_000).all(|_| state.is_ready()))
            })
            .collect();
        for reader in readers {
            assert!(reader.join().unwrap());
        }
    }

    #[test]
    fn phase_only_moves_forward() {
        let state = ServiceState::new();
        assert_eq!(state.advance_phase(LifecyclePhase::Stopping), LifecyclePhase::Running);
        assert_eq!(state.advance_phase(LifecyclePhase::Draining), LifecyclePhase::Stopping);
        assert_eq!(state.phase(), LifecyclePhase::Stopping);
        state.advance_phase(LifecyclePhase::Terminated);
        assert_eq!(state.phase(), LifecyclePhase::Terminated);
    }
}
