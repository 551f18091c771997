//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::config::variables::VariableProvider;

/// Variable group for health endpoint overrides (`HEALTH_ADDR`, `HEALTH_PORT`).
pub const HEALTH_GROUP: &str = "HEALTH";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply overrides found through `provider`, then re-validate.
///
/// `HEALTH_ADDR` and `HEALTH_PORT` replace the health bind address when both
/// are present.
pub fn apply_overrides(
    mut config: AppConfig,
    provider: &dyn VariableProvider,
) -> Result<AppConfig, ConfigError> {
    if provider.ensure(HEALTH_GROUP, &["ADDR", "PORT"]).is_ok() {
        if let (Some(addr), Some(port)) = (
            provider.get(HEALTH_GROUP, "ADDR"),
            provider.get(HEALTH_GROUP, "PORT"),
        ) {
            config.health.bind_address = format!("{}:{}", addr, port);
            tracing::debug!(bind_address = %config.health.bind_address, "Health address overridden");
        }
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::variables::{MapProvider, VariableKey};
    use std::collections::HashMap;

    #[test]
    fn test_parse_rejects_invalid_values() {
        let err = parse_config("[lifecycle]\ntermination_timeout_ms = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert!(err.to_string().contains("termination_timeout_ms"));
    }

    #[test]
    fn test_parse_rejects_bad_toml() {
        assert!(matches!(parse_config("[lifecycle"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/nonexistent/runner.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_health_overrides() {
        let provider = MapProvider::new(HashMap::from([
            (VariableKey::new("HEALTH", "ADDR"), "127.0.0.1".to_string()),
            (VariableKey::new("HEALTH", "PORT"), "9000".to_string()),
        ]));
        let config = apply_overrides(AppConfig::default(), &provider).unwrap();
        assert_eq!(config.health.bind_address, "127.0.0.1:9000");
    }

    #[test]
    fn test_partial_overrides_are_ignored() {
        let provider = MapProvider::new(HashMap::from([(
            VariableKey::new("HEALTH", "PORT"),
            "9000".to_string(),
        )]));
        let config = apply_overrides(AppConfig::default(), &provider).unwrap();
        assert_eq!(config.health.bind_address, "0.0.0.0:8086");
    }
}
