//! Test client errors.

use thiserror::Error;

/// Errors raised while building a test request or reading its response.
#[derive(Debug, Error)]
pub enum TestError {
    /// The request could not be assembled.
    #[error("invalid request: {0}")]
    RequestBuild(#[from] http::Error),

    /// A header name or value is invalid.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The response body could not be read.
    #[error("failed to read body: {0}")]
    BodyRead(String),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
