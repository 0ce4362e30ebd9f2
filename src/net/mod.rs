//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ListenerConfig.bind_address
//!     → listener.rs (parse, bind)
//!     → tokio TcpListener handed to the HTTP transport
//! ```
//!
//! # Design Decisions
//! - Bind happens before warm-up; readiness, not accept, gates traffic

pub mod listener;

pub use listener::{bind, ListenerError};
