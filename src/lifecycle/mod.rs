//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     ServiceState created → transport listening → warmup.rs flips `ready`
//!
//! Request path:
//!     admission middleware → state.rs (in-flight +1 … guard drop −1)
//!
//! Shutdown (orchestrator.rs):
//!     signals.rs (SIGTERM/SIGINT)
//!     → set shutting_down (readiness fails, new work gets 503)
//!     → drain in-flight under the deadline
//!     → transport.rs stop_accepting(deadline)
//!     → cleanup.rs ordered teardown
//!     → exit code from ShutdownReport
//! ```
//!
//! # Design Decisions
//! - One `ServiceState`, created by the composition root and passed by `Arc`
//! - Flags and phase are one-way; the in-flight counter never goes negative
//! - Drain and transport close share one deadline; cleanup always runs

pub mod cleanup;
pub mod orchestrator;
pub mod shutdown;
pub mod signals;
pub mod state;
pub mod transport;
pub mod warmup;

pub use cleanup::{CleanupReport, CleanupSequence, CleanupStep};
pub use orchestrator::{DrainOutcome, ShutdownError, ShutdownOrchestrator, ShutdownReport};
pub use shutdown::Shutdown;
pub use state::{InFlightGuard, LifecyclePhase, ServiceState, StateSnapshot};
pub use transport::{Transport, TransportError};
pub use warmup::{WarmupError, WarmupTask};
