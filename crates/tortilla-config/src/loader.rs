//! Layered configuration loading.
//!
//! Layers apply in order, each overriding the previous one:
//!
//! 1. built-in defaults or a preset
//! 2. a TOML or JSON file (or string)
//! 3. environment variables `PREFIX__SECTION__KEY`

use std::env;
use std::fs;
use std::path::Path;

use tortilla_core::UnsupportedMediaType;

use crate::{ConfigError, LogFormat, TortillaConfig};

/// Builds a [`TortillaConfig`] from defaults, files and the environment.
///
/// # Example
///
/// ```no_run
/// use tortilla_config::ConfigLoader;
///
/// # fn main() -> Result<(), tortilla_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_production()
///     .with_optional_file("tortilla.toml")?
///     .with_dotenv()?
///     .with_env_prefix("TORTILLA")
///     .load()?;
/// # Ok(())
/// # }
/// ```
///
/// Recognized environment variables, with prefix `TORTILLA`:
///
/// | Variable | Field |
/// |----------|-------|
/// | `TORTILLA__APP__NAME` | `app.name` |
/// | `TORTILLA__APP__ERROR_FORMAT` | `app.error_format` |
/// | `TORTILLA__APP__SERVER_HEADER` | `app.server_header` |
/// | `TORTILLA__APP__DEFAULT_HEADERS__X_FRAME_OPTIONS` | `app.default_headers["x-frame-options"]` (empty removes) |
/// | `TORTILLA__TELEMETRY__LOGGING__{ENABLED,LEVEL,FORMAT,ANSI_ENABLED,INCLUDE_LOCATION}` | `telemetry.logging.*` |
/// | `TORTILLA__TELEMETRY__METRICS__ENABLED` | `telemetry.metrics.enabled` |
#[derive(Debug)]
pub struct ConfigLoader {
    config: TortillaConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Starts from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: TortillaConfig::default(),
            env_prefix: None,
        }
    }

    /// Resets to the defaults.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = TortillaConfig::default();
        self
    }

    /// Resets to [`TortillaConfig::development`].
    ///
    /// ```
    /// use tortilla_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = TortillaConfig::development();
        self
    }

    /// Resets to [`TortillaConfig::production`].
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = TortillaConfig::production();
        self
    }

    /// Loads a `.toml` or `.json` file, replacing the current layer.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                ConfigError::validation_error(format!(
                    "unsupported configuration file format: {}",
                    path.display()
                ))
            })?;

        self.config = parse(&content, format)?;
        Ok(self)
    }

    /// Like [`with_file`](Self::with_file), but a missing file is skipped.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Parses `content` as `format` (`"toml"` or `"json"`).
    ///
    /// ```
    /// use tortilla_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[app]\nname = \"menu\"", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    /// assert_eq!(config.app.name, "menu");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = parse(content, format)?;
        Ok(self)
    }

    /// Reads environment overrides with `prefix` at [`load`](Self::load).
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads a `.env` file into the process environment, if there is one.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(ConfigError::validation_error(format!(
                "failed to load .env file: {e}"
            ))),
        }
    }

    /// Applies environment overrides, then validates.
    pub fn load(mut self) -> Result<TortillaConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }
        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the current layer without environment overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> TortillaConfig {
        self.config
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let mut vars: Vec<(String, String)> = env::vars()
            .filter(|(k, _)| k.starts_with(prefix))
            .collect();
        vars.sort();

        for (key, value) in vars {
            self.apply_env_var(&key, &value, prefix)?;
        }
        Ok(())
    }

    /// Applies one `PREFIX__SECTION__KEY` variable. Unknown keys are ignored.
    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let key_without_prefix = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;

        let parts: Vec<&str> = key_without_prefix.split("__").collect();

        match parts.as_slice() {
            // App section
            ["APP", "NAME"] => {
                self.config.app.name = value.to_string();
            }
            ["APP", "ERROR_FORMAT"] => {
                self.config.app.error_format = value
                    .parse()
                    .map_err(|e: UnsupportedMediaType| ConfigError::env_parse_error(key, e.to_string()))?;
            }
            ["APP", "SERVER_HEADER"] => {
                self.config.app.server_header = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["APP", "DEFAULT_HEADERS", header] => {
                let name = header.to_ascii_lowercase().replace('_', "-");
                if value.is_empty() {
                    self.config.app.default_headers.shift_remove(&name);
                } else {
                    self.config.app.default_headers.insert(name, value.to_string());
                }
            }

            // Telemetry logging
            ["TELEMETRY", "LOGGING", "ENABLED"] => {
                self.config.telemetry.logging.enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["TELEMETRY", "LOGGING", "LEVEL"] => {
                self.config.telemetry.logging.level = value.to_string();
            }
            ["TELEMETRY", "LOGGING", "FORMAT"] => {
                self.config.telemetry.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["TELEMETRY", "LOGGING", "ANSI_ENABLED"] => {
                self.config.telemetry.logging.ansi_enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["TELEMETRY", "LOGGING", "INCLUDE_LOCATION"] => {
                self.config.telemetry.logging.include_location = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }

            // Telemetry metrics
            ["TELEMETRY", "METRICS", "ENABLED"] => {
                self.config.telemetry.metrics.enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }

            _ => {}
        }

        Ok(())
    }
}

/// Accepts `true/false`, `1/0`, `yes/no`, `on/off` in any case.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse(content: &str, format: &str) -> Result<TortillaConfig, ConfigError> {
    match format.to_lowercase().as_str() {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        other => Err(ConfigError::validation_error(format!(
            "unsupported configuration format: {other}"
        ))),
    }
}
