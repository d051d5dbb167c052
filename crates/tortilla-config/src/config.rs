//! Main configuration types.
//!
//! This module provides the top-level [`TortillaConfig`] struct and its builder.

use http::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use tortilla_telemetry::logging::create_env_filter;

use crate::{AppConfig, ConfigError, LogFormat, TelemetrySection};

/// Complete Tortilla application configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use tortilla_config::TortillaConfig;
///
/// let config = TortillaConfig::default();
/// assert_eq!(config.app.name, "tortilla");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct TortillaConfig {
    /// Application configuration.
    #[serde(default)]
    pub app: AppConfig,

    /// Telemetry configuration (logging, metrics).
    #[serde(default)]
    pub telemetry: TelemetrySection,
}

impl TortillaConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> TortillaConfigBuilder {
        TortillaConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// Fails if a default header has an invalid name or value, the log
    /// level does not parse as a filter directive, or the app name cannot
    /// be sent as a `Server` header.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in &self.app.default_headers {
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ConfigError::invalid_value(
                    format!("app.default_headers.{name}"),
                    format!("invalid header name: {e}"),
                )
            })?;
            HeaderValue::from_str(value).map_err(|e| {
                ConfigError::invalid_value(
                    format!("app.default_headers.{name}"),
                    format!("invalid header value: {e}"),
                )
            })?;
        }

        if self.app.server_header && HeaderValue::from_str(&self.app.name).is_err() {
            return Err(ConfigError::invalid_value(
                "app.name",
                "must be a valid header value when server_header is enabled",
            ));
        }

        if self.telemetry.logging.enabled {
            create_env_filter(&self.telemetry.logging.level).map_err(|e| {
                ConfigError::invalid_value("telemetry.logging.level", e.to_string())
            })?;
        }

        if self.telemetry.metrics.enabled && self.telemetry.metrics.histogram_buckets.is_empty() {
            return Err(ConfigError::invalid_value(
                "telemetry.metrics.histogram_buckets",
                "must not be empty",
            ));
        }

        Ok(())
    }

    /// Development preset: pretty debug logs with locations.
    ///
    /// ```
    /// use tortilla_config::TortillaConfig;
    ///
    /// let config = TortillaConfig::development();
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.telemetry.logging.level = "debug".to_string();
        config.telemetry.logging.format = LogFormat::Pretty;
        config.telemetry.logging.ansi_enabled = true;
        config.telemetry.logging.include_location = true;
        config
    }

    /// Production preset: JSON info logs, no `Server` header.
    ///
    /// ```
    /// use tortilla_config::{LogFormat, TortillaConfig};
    ///
    /// let config = TortillaConfig::production();
    /// assert_eq!(config.telemetry.logging.format, LogFormat::Json);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.app.server_header = false;
        config.telemetry.logging.level = "info".to_string();
        config.telemetry.logging.format = LogFormat::Json;
        config.telemetry.logging.ansi_enabled = false;
        config
    }
}

/// Builder for [`TortillaConfig`].
#[derive(Debug, Default)]
pub struct TortillaConfigBuilder {
    app: Option<AppConfig>,
    telemetry: Option<TelemetrySection>,
}

impl TortillaConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application section.
    #[must_use]
    pub fn app(mut self, app: AppConfig) -> Self {
        self.app = Some(app);
        self
    }

    /// Set the telemetry section.
    #[must_use]
    pub fn telemetry(mut self, telemetry: TelemetrySection) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Build the configuration. Unset sections use their defaults.
    #[must_use]
    pub fn build(self) -> TortillaConfig {
        TortillaConfig {
            app: self.app.unwrap_or_default(),
            telemetry: self.telemetry.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    pub fn build_validated(self) -> Result<TortillaConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
