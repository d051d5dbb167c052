//! Observability for Tortilla applications.
//!
//! - **Logging**: `tracing-subscriber` with JSON or pretty output
//! - **Metrics**: Prometheus-format dispatch metrics via the `metrics` facade
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `tortilla_requests_total` | Counter | `route`, `status` | Dispatched requests |
//! | `tortilla_request_duration_seconds` | Histogram | `route` | Dispatch latency |
//! | `tortilla_errors_total` | Counter | `kind` | Errors raised by middleware, hooks or views |
//! | `tortilla_in_flight_requests` | Gauge | - | Requests being dispatched |
//!
//! # Example
//!
//! ```rust,ignore
//! use tortilla_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::builder().log_level("debug").build();
//! init_telemetry(&config)?;
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::{TelemetryConfig, TelemetryConfigBuilder};
pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use self::metrics::{init_metrics, record_error, record_request, render_metrics, InFlightGuard, MetricsConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Installs logging, then metrics.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    Ok(())
}
