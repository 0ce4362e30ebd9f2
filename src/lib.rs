//! Lifecycle-managed HTTP service library.
//!
//! Warm-up, request admission, in-flight tracking and coordinated graceful
//! shutdown for a single-process network service.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::LifecycleConfig;
pub use http::{HttpServer, HttpTransport};
pub use lifecycle::{ServiceState, ShutdownOrchestrator};
