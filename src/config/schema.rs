//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the runner binary.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Initialization/termination budgets and teardown policy.
    pub lifecycle: LifecycleConfig,

    /// Liveness/readiness endpoint settings.
    pub health: HealthConfig,

    /// Log filter settings.
    pub logging: LoggingConfig,

    /// Metrics exporter settings.
    pub observability: ObservabilityConfig,
}

/// Order in which initialized resources are released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseOrder {
    /// Registration order.
    #[default]
    Forward,
    /// Reverse registration order (stack unwind).
    Reverse,
}

/// Runner configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Budget for initializing every resource, in milliseconds.
    pub initialization_timeout_ms: u64,

    /// Budget for shutting down jobs and releasing resources, in milliseconds.
    pub termination_timeout_ms: u64,

    /// Release order for initialized resources.
    pub release_order: ReleaseOrder,

    /// Release already-initialized resources when a later `init` fails.
    pub release_on_init_failure: bool,

    /// Treat SIGHUP/SIGINT/SIGTERM/SIGQUIT as shutdown triggers.
    pub handle_signals: bool,
}

impl LifecycleConfig {
    /// Config with the given budgets and default policy.
    pub fn with_timeouts(initialization: Duration, termination: Duration) -> Self {
        Self {
            initialization_timeout_ms: saturating_millis(initialization),
            termination_timeout_ms: saturating_millis(termination),
            ..Self::default()
        }
    }

    pub fn initialization_timeout(&self) -> Duration {
        Duration::from_millis(self.initialization_timeout_ms)
    }

    pub fn termination_timeout(&self) -> Duration {
        Duration::from_millis(self.termination_timeout_ms)
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            initialization_timeout_ms: 60_000,
            termination_timeout_ms: 60_000,
            release_order: ReleaseOrder::Forward,
            release_on_init_failure: false,
            handle_signals: true,
        }
    }
}

/// Health endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Serve `/liveness` and `/readiness`.
    pub enabled: bool,

    /// Bind address (e.g., "0.0.0.0:8086").
    pub bind_address: String,

    /// Close the listener when the resource is released.
    pub need_close: bool,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0:8086".to_string(),
            need_close: true,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,

    /// Colored output.
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "lifecycle_runner=info,tower_http=info".to_string(),
            ansi: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Prometheus exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.lifecycle.initialization_timeout(), Duration::from_secs(60));
        assert_eq!(config.lifecycle.termination_timeout(), Duration::from_secs(60));
        assert_eq!(config.lifecycle.release_order, ReleaseOrder::Forward);
        assert!(config.lifecycle.handle_signals);
        assert!(config.health.enabled);
    }

    #[test]
    fn test_parse_lifecycle_section() {
        let config: AppConfig = toml::from_str(
            r#"
            [lifecycle]
            initialization_timeout_ms = 1500
            termination_timeout_ms = 250
            release_order = "reverse"
            release_on_init_failure = true
            "#,
        )
        .unwrap();

        assert_eq!(config.lifecycle.initialization_timeout(), Duration::from_millis(1500));
        assert_eq!(config.lifecycle.termination_timeout(), Duration::from_millis(250));
        assert_eq!(config.lifecycle.release_order, ReleaseOrder::Reverse);
        assert!(config.lifecycle.release_on_init_failure);
    }

    #[test]
    fn test_with_timeouts_saturates() {
        let config = LifecycleConfig::with_timeouts(Duration::MAX, Duration::from_millis(250));
        assert_eq!(config.initialization_timeout_ms, u64::MAX);
        assert_eq!(config.termination_timeout_ms, 250);
    }
}
