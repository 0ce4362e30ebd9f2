//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check relationships between fields (poll interval fits in the deadline)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: LifecycleConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::LifecycleConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    InvalidBindAddress(String),

    #[error("observability.metrics_address `{0}` is not a socket address")]
    InvalidMetricsAddress(String),

    #[error("shutdown.drain_timeout_secs must be greater than zero")]
    ZeroDrainTimeout,

    #[error("shutdown.poll_interval_ms must be greater than zero")]
    ZeroPollInterval,

    #[error("shutdown.poll_interval_ms ({poll_ms}) exceeds the drain timeout ({drain_ms} ms)")]
    PollIntervalTooLong { poll_ms: u64, drain_ms: u64 },

    #[error("shutdown.cleanup_timeout_secs must be greater than zero")]
    ZeroCleanupTimeout,

    #[error("shutdown.cleanup_step_timeout_ms must be greater than zero")]
    ZeroCleanupStepTimeout,

    #[error("handler.min_processing_ms ({min}) is greater than handler.max_processing_ms ({max})")]
    InvalidProcessingRange { min: u64, max: u64 },

    #[error("cleanup.steps[{0}] has an empty name")]
    EmptyStepName(usize),
}

/// Check every semantic constraint, collecting all failures.
pub fn validate_config(config: &LifecycleConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let obs = &config.observability;
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(obs.metrics_address.clone()));
    }

    let shutdown = &config.shutdown;
    if shutdown.drain_timeout_secs == 0 {
        errors.push(ValidationError::ZeroDrainTimeout);
    }
    if shutdown.poll_interval_ms == 0 {
        errors.push(ValidationError::ZeroPollInterval);
    } else if shutdown.drain_timeout_secs > 0
        && shutdown.poll_interval() > shutdown.drain_timeout()
    {
        errors.push(ValidationError::PollIntervalTooLong {
            poll_ms: shutdown.poll_interval_ms,
            drain_ms: shutdown.drain_timeout_secs.saturating_mul(1000),
        });
    }
    if shutdown.cleanup_timeout_secs == 0 {
        errors.push(ValidationError::ZeroCleanupTimeout);
    }
    if shutdown.cleanup_step_timeout_ms == 0 {
        errors.push(ValidationError::ZeroCleanupStepTimeout);
    }

    let handler = &config.handler;
    if handler.min_processing_ms > handler.max_processing_ms {
        errors.push(ValidationError::InvalidProcessingRange {
            min: handler.min_processing_ms,
            max: handler.max_processing_ms,
        });
    }

    for (i, step) in config.cleanup.steps.iter().enumerate() {
        if step.name.trim().is_empty() {
            errors.push(ValidationError::EmptyStepName(i));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
