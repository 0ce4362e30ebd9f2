//! managed-lifecycle
//!
//! An HTTP service with a managed lifecycle: warm-up gated readiness,
//! in-flight request tracking, and a deadline-bounded graceful shutdown.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request        ┌──────────────────────────────────────────────┐
//!     ──────────────────────┼─▶ http server ─▶ admission ─▶ handlers       │
//!                           │                      │            │         │
//!                           │                      ▼            ▼         │
//!                           │               ┌──────────────────────────┐  │
//!     warm-up task ─────────┼──────────────▶│       ServiceState       │  │
//!                           │               │ ready · shutting_down ·  │  │
//!                           │               │ in_flight · phase        │  │
//!                           │               └──────────────────────────┘  │
//!                           │                      ▲                      │
//!     SIGTERM / SIGINT ─────┼─▶ orchestrator ──────┘                      │
//!                           │      drain → stop transport → cleanup       │
//!                           └──────────────────────────────────────────────┘
//! ```
//!
//! Exit code 0 after a clean shutdown, 1 when shutdown failed or ran out of time.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use managed_lifecycle::config::{read_config, validation::validate_config, ConfigError};
use managed_lifecycle::lifecycle::signals::wait_for_termination;
use managed_lifecycle::lifecycle::{CleanupSequence, ShutdownOrchestrator, WarmupTask};
use managed_lifecycle::observability::{logging::init_logging, metrics::init_metrics};
use managed_lifecycle::{net, HttpServer, LifecycleConfig, ServiceState};

#[derive(Parser)]
#[command(name = "managed-lifecycle", version)]
#[command(about = "HTTP service with warm-up, in-flight tracking and graceful shutdown")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.observability);

    match run(config).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}

/// File (or defaults), then flag overrides, then a single validation pass.
fn load(cli: &Cli) -> Result<LifecycleConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => LifecycleConfig::default(),
    };
    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

async fn run(config: LifecycleConfig) -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "managed-lifecycle starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        drain_timeout_secs = config.shutdown.drain_timeout_secs,
        poll_interval_ms = config.shutdown.poll_interval_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let service = Arc::new(ServiceState::new());

    // The transport listens before warm-up finishes; /ready keeps traffic away.
    let listener = net::bind(&config.listener).await?;
    let transport = HttpServer::new(&config, Arc::clone(&service)).serve(listener)?;
    let warmup = WarmupTask::new(Arc::clone(&service), config.warmup.duration()).spawn();

    let signal = wait_for_termination().await?;
    tracing::info!(signal = %signal, "Beginning graceful shutdown");

    let report = ShutdownOrchestrator::new(
        service,
        transport,
        CleanupSequence::from_config(&config.cleanup),
        &config.shutdown,
    )
    .run()
    .await;
    warmup.abort();

    match report.into_result() {
        Ok(report) => {
            tracing::info!(elapsed = ?report.elapsed, "Shutdown complete");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!(error = %e, "Graceful shutdown failed");
            Ok(ExitCode::FAILURE)
        }
    }
}
