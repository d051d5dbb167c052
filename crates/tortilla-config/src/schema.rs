//! Configuration schema types.
//!
//! This module defines the structure of all configuration sections.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tortilla_core::ErrorFormat;
use tortilla_telemetry::{LogConfig, LogFormat, MetricsConfig as MetricsSettings, TelemetryConfig};

/// Application section.
///
/// # Example
///
/// ```
/// use tortilla_config::AppConfig;
/// use tortilla_core::ErrorFormat;
///
/// let config: AppConfig = toml::from_str(r#"
///     name = "menu"
///     error_format = "json"
///
///     [default_headers]
///     x-frame-options = "DENY"
/// "#).unwrap();
///
/// assert_eq!(config.error_format, ErrorFormat::Json);
/// assert_eq!(config.default_headers["x-frame-options"], "DENY");
/// assert!(config.server_header);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Application name, used as the `Server` header value.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// How HTTP errors are rendered when no handler is registered.
    #[serde(default)]
    pub error_format: ErrorFormat,

    /// Send a `Server` header.
    #[serde(default = "default_true")]
    pub server_header: bool,

    /// Headers set on every response, in declaration order.
    #[serde(default)]
    pub default_headers: IndexMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            error_format: ErrorFormat::default(),
            server_header: true,
            default_headers: IndexMap::new(),
        }
    }
}

fn default_app_name() -> String {
    "tortilla".to_string()
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (`trace`, `debug`, `info`, `warn`, `error`, or per-target).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include ANSI color codes in output.
    #[serde(default)]
    pub ansi_enabled: bool,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            ansi_enabled: false,
            include_location: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Histogram bucket boundaries for request duration.
    #[serde(default = "default_histogram_buckets")]
    pub histogram_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            histogram_buckets: default_histogram_buckets(),
        }
    }
}

fn default_histogram_buckets() -> Vec<f64> {
    MetricsSettings::default().duration_buckets
}

/// Telemetry section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct TelemetrySection {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl TelemetrySection {
    /// Converts to the settings `tortilla-telemetry` installs.
    #[must_use]
    pub fn to_telemetry_config(&self) -> TelemetryConfig {
        let logging = &self.logging;
        TelemetryConfig {
            logging: LogConfig {
                enabled: logging.enabled,
                level: logging.level.clone(),
                format: logging.format,
                span_events: false,
                file_line_info: logging.include_location,
                include_target: true,
                ansi: logging.ansi_enabled,
            },
            metrics: MetricsSettings {
                enabled: self.metrics.enabled,
                duration_buckets: self.metrics.histogram_buckets.clone(),
            },
        }
    }
}

fn default_true() -> bool {
    true
}
