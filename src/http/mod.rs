//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, panic capture)
//!     → middleware/admission.rs (count the request as in flight)
//!     → handlers.rs (reject during shutdown, probes, simulated work)
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod server;

pub use server::{HttpServer, HttpTransport};
