//! Health probe subsystem.
//!
//! # Data Flow
//! ```text
//! GET /health → probes::liveness  → ServiceState (warm-up failure)
//! GET /ready  → probes::readiness → ServiceState (ready && !shutting_down)
//! ```
//!
//! # Design Decisions
//! - Probes are read-only views; they never mutate state
//! - Every call recomputes from current state (no caching)
//! - Readiness fails the instant shutdown begins, before any request is rejected

pub mod probes;

pub use probes::{liveness, readiness, ProbeStatus};
