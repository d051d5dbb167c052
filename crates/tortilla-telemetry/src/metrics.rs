//! Dispatch metrics.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `tortilla_requests_total` | Counter | `route`, `status` |
//! | `tortilla_request_duration_seconds` | Histogram | `route` |
//! | `tortilla_errors_total` | Counter | `kind` |
//! | `tortilla_in_flight_requests` | Gauge | - |
//!
//! Recording goes through the `metrics` facade and is a no-op until a
//! recorder is installed with [`init_metrics`].

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Requests counter.
pub const REQUESTS_TOTAL: &str = "tortilla_requests_total";
/// Request duration histogram.
pub const REQUEST_DURATION_SECONDS: &str = "tortilla_request_duration_seconds";
/// Raised errors counter.
pub const ERRORS_TOTAL: &str = "tortilla_errors_total";
/// In-flight requests gauge.
pub const IN_FLIGHT_REQUESTS: &str = "tortilla_in_flight_requests";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    /// Whether to install the Prometheus recorder.
    pub enabled: bool,

    /// Histogram buckets for request duration, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// Installs the global Prometheus recorder.
///
/// No listener is started; scrape through [`render_metrics`].
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }
    if config.duration_buckets.is_empty() {
        return Err(TelemetryError::InvalidConfig(
            "duration_buckets must not be empty".to_string(),
        ));
    }

    let handle = PrometheusBuilder::new()
        .set_buckets(&config.duration_buckets)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);
    describe_metrics();
    Ok(())
}

/// Renders every metric in Prometheus text format.
///
/// Returns `None` until [`init_metrics`] has run.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn describe_metrics() {
    describe_counter!(REQUESTS_TOTAL, "Total number of dispatched requests");
    describe_histogram!(REQUEST_DURATION_SECONDS, "Dispatch duration in seconds");
    describe_counter!(ERRORS_TOTAL, "Errors raised during dispatch, by kind");
    describe_gauge!(IN_FLIGHT_REQUESTS, "Requests currently being dispatched");
}

/// Records a completed request.
pub fn record_request(route: &str, status_code: u16, duration: Duration) {
    counter!(
        REQUESTS_TOTAL,
        "route" => route.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(REQUEST_DURATION_SECONDS, "route" => route.to_string())
        .record(duration.as_secs_f64());
}

/// Records an error raised during dispatch (`"http"` or `"application"`).
pub fn record_error(kind: &str) {
    counter!(ERRORS_TOTAL, "kind" => kind.to_string()).increment(1);
}

/// Holds the in-flight gauge up for its lifetime.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Increments the gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!(IN_FLIGHT_REQUESTS).increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(IN_FLIGHT_REQUESTS).decrement(1.0);
    }
}
