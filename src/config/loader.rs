//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::LifecycleConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<LifecycleConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Read and deserialize a TOML file without semantic checks.
///
/// For callers that still apply overrides and validate afterwards.
pub fn read_config(path: &Path) -> Result<LifecycleConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<LifecycleConfig, ConfigError> {
    let config: LifecycleConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.shutdown.drain_timeout_secs, 30);
        assert_eq!(config.shutdown.poll_interval_ms, 1000);
        assert_eq!(config.cleanup.steps.len(), 3);
    }

    #[test]
    fn partial_file_overrides_fields() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [shutdown]
            drain_timeout_secs = 5
            poll_interval_ms = 250

            [observability]
            log_format = "json"

            [[cleanup.steps]]
            name = "close pool"
            duration_ms = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.shutdown.drain_timeout_secs, 5);
        assert_eq!(config.shutdown.poll_interval_ms, 250);
        assert_eq!(config.shutdown.cleanup_timeout_secs, 10);
        assert_eq!(
            config.observability.log_format,
            crate::config::schema::LogFormat::Json
        );
        assert_eq!(config.cleanup.steps.len(), 1);
        assert_eq!(config.cleanup.steps[0].name, "close pool");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = parse_config("[shutdown]\ndrain_timeout_secs = 0\n").unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors, vec![ValidationError::ZeroDrainTimeout]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            parse_config("[listener\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn read_defers_validation_to_the_caller() {
        let path = std::env::temp_dir().join(format!("lifecycle-{}.toml", std::process::id()));
        fs::write(&path, "[listener]\nbind_address = \"not an address\"\n").unwrap();

        let raw = read_config(&path).unwrap();
        assert_eq!(raw.listener.bind_address, "not an address");
        assert!(matches!(load_config(&path), Err(ConfigError::Validation(_))));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
