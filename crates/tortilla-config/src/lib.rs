//! Typed configuration for Tortilla applications.
//!
//! [`TortillaConfig`] has two sections:
//!
//! - [`AppConfig`]: application name, default error format, default headers
//! - [`TelemetrySection`]: logging and metrics
//!
//! Configuration is layered with [`ConfigLoader`]: defaults (or a preset),
//! then a TOML/JSON file, then `PREFIX__SECTION__KEY` environment variables.
//! Unknown fields are rejected.
//!
//! # Example
//!
//! ```no_run
//! use tortilla_config::ConfigLoader;
//!
//! # fn main() -> Result<(), tortilla_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_file("tortilla.toml")?
//!     .with_env_prefix("TORTILLA")
//!     .load()?;
//!
//! println!("errors render as {}", config.app.error_format);
//! # Ok(())
//! # }
//! ```
//!
//! # File format
//!
//! ```toml
//! [app]
//! name = "menu"
//! error_format = "json"
//! server_header = true
//!
//! [app.default_headers]
//! x-frame-options = "DENY"
//!
//! [telemetry.logging]
//! level = "info"
//! format = "json"
//!
//! [telemetry.metrics]
//! enabled = true
//! ```

mod config;
mod error;
mod loader;
mod schema;

pub use config::{TortillaConfig, TortillaConfigBuilder};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{AppConfig, LoggingConfig, MetricsConfig, TelemetrySection};
pub use tortilla_telemetry::LogFormat;
