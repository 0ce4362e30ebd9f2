//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the lifecycle-managed service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Shutdown deadline and drain settings.
    pub shutdown: ShutdownConfig,

    /// Warm-up settings.
    pub warmup: WarmupConfig,

    /// Simulated request handling.
    pub handler: HandlerConfig,

    /// Ordered cleanup steps run at the end of shutdown.
    pub cleanup: CleanupConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Shutdown configuration.
///
/// `drain_timeout_secs` is a single budget shared by the in-flight drain and
/// the transport close. Cleanup gets its own budget, counted from the moment
/// cleanup starts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Maximum wait for graceful exit, in seconds.
    pub drain_timeout_secs: u64,

    /// Drain-check frequency in milliseconds.
    pub poll_interval_ms: u64,

    /// Total budget for the cleanup sequence, in seconds.
    pub cleanup_timeout_secs: u64,

    /// Per-step cap inside the cleanup budget, in milliseconds.
    pub cleanup_step_timeout_ms: u64,
}

impl ShutdownConfig {
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn cleanup_timeout(&self) -> Duration {
        Duration::from_secs(self.cleanup_timeout_secs)
    }

    pub fn cleanup_step_timeout(&self) -> Duration {
        Duration::from_millis(self.cleanup_step_timeout_ms)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_timeout_secs: 30,
            poll_interval_ms: 1000,
            cleanup_timeout_secs: 10,
            cleanup_step_timeout_ms: 5000,
        }
    }
}

/// Warm-up configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WarmupConfig {
    /// Simulated initialization time in milliseconds.
    pub duration_ms: u64,
}

impl WarmupConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self { duration_ms: 5000 }
    }
}

/// Simulated work performed by `GET /`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Lower bound of the processing time in milliseconds.
    pub min_processing_ms: u64,

    /// Upper bound (inclusive) of the processing time in milliseconds.
    pub max_processing_ms: u64,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            min_processing_ms: 2000,
            max_processing_ms: 4000,
        }
    }
}

/// Cleanup sequence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Steps in execution order.
    pub steps: Vec<CleanupStepConfig>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            steps: vec![
                CleanupStepConfig::new("release temporary files", 2000),
                CleanupStepConfig::new("close database connections", 1000),
                CleanupStepConfig::new("flush logs", 1000),
            ],
        }
    }
}

/// A single simulated teardown step.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CleanupStepConfig {
    /// Step name for logging/metrics.
    pub name: String,

    /// Nominal duration in milliseconds.
    #[serde(default)]
    pub duration_ms: u64,
}

impl CleanupStepConfig {
    pub fn new(name: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            duration_ms,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
