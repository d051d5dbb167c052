//! Error taxonomy.
//!
//! Two families live here:
//!
//! - [`DeclarationError`]: raised while an application is being configured
//!   (bad pattern, blocking callable, unknown hook target, ...). Fatal to
//!   startup.
//! - [`DispatchError`]: anything raised while a request is being handled.
//!   It wraps a concrete error value together with its *lineage*, the
//!   ordered list of error classes it belongs to, which the
//!   [`ErrorResolver`](crate::ErrorResolver) walks to pick a handler.
//!
//! # Error classes
//!
//! An error type takes part in handler resolution by implementing
//! [`ErrorClass`]. Its ancestors are declared explicitly, nearest first:
//!
//! ```rust
//! use std::any::TypeId;
//! use tortilla_core::{lineage_of, DispatchError, ErrorClass};
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("payment failed")]
//! struct PaymentError;
//! impl ErrorClass for PaymentError {}
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("card declined")]
//! struct CardDeclined;
//! impl ErrorClass for CardDeclined {
//!     fn ancestors() -> Vec<TypeId> {
//!         lineage_of::<PaymentError>()
//!     }
//! }
//!
//! let err = DispatchError::from(CardDeclined);
//! assert_eq!(
//!     err.lineage(),
//!     &[TypeId::of::<CardDeclined>(), TypeId::of::<PaymentError>()]
//! );
//! ```

use std::any::TypeId;
use std::error::Error as StdError;
use std::fmt;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tortilla_router::PatternError;

/// Result type for request-time operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Broad classification of a request-time error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// An [`HttpError`] raised on purpose.
    Http,
    /// Anything else.
    Application,
}

impl ErrorCategory {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Application => "application",
        }
    }
}

/// An error type that can be raised during dispatch and matched by handlers.
pub trait ErrorClass: StdError + Send + Sync + 'static {
    /// Ancestor classes, nearest first, excluding `Self`.
    fn ancestors() -> Vec<TypeId>
    where
        Self: Sized,
    {
        Vec::new()
    }

    /// The category reported for this class.
    ///
    /// Classes descending from [`HttpError`] are reported as
    /// [`ErrorCategory::Http`] whatever this returns.
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Application
    }

    /// Status and detail for classes that descend from [`HttpError`].
    ///
    /// ```rust
    /// use std::any::TypeId;
    /// use http::StatusCode;
    /// use tortilla_core::{lineage_of, DispatchError, ErrorClass, HttpError};
    ///
    /// #[derive(Debug, thiserror::Error)]
    /// #[error("{0}")]
    /// struct Gone(HttpError);
    /// impl ErrorClass for Gone {
    ///     fn ancestors() -> Vec<TypeId> {
    ///         lineage_of::<HttpError>()
    ///     }
    ///     fn as_http(&self) -> Option<&HttpError> {
    ///         Some(&self.0)
    ///     }
    /// }
    ///
    /// let err = DispatchError::from(Gone(HttpError::new(StatusCode::GONE)));
    /// assert_eq!(err.status(), StatusCode::GONE);
    /// assert!(err.is_a::<HttpError>());
    /// ```
    fn as_http(&self) -> Option<&HttpError> {
        None
    }
}

/// Full lineage of `E`: `E` itself followed by its ancestors.
#[must_use]
pub fn lineage_of<E: ErrorClass>() -> Vec<TypeId> {
    let mut lineage = vec![TypeId::of::<E>()];
    lineage.extend(E::ancestors());
    lineage
}

/// An HTTP error: a status plus a detail message.
///
/// The detail defaults to `"<code> <reason phrase>"`.
///
/// ```rust
/// use http::StatusCode;
/// use tortilla_core::HttpError;
///
/// let err = HttpError::not_found();
/// assert_eq!(err.status(), StatusCode::NOT_FOUND);
/// assert_eq!(err.to_string(), "404 Not Found");
///
/// let err = HttpError::with_detail(StatusCode::FORBIDDEN, "members only");
/// assert_eq!(err.detail(), "members only");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{detail}")]
pub struct HttpError {
    status: StatusCode,
    detail: String,
}

impl HttpError {
    /// Creates an error with the default detail.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            detail: default_detail(status),
        }
    }

    /// Creates an error with a custom detail.
    #[must_use]
    pub fn with_detail(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    /// Creates an error from a numeric status.
    pub fn try_from_u16(code: u16) -> Result<Self, http::status::InvalidStatusCode> {
        StatusCode::from_u16(code).map(Self::new)
    }

    /// `400 Bad Request`.
    #[must_use]
    pub fn bad_request() -> Self {
        Self::new(StatusCode::BAD_REQUEST)
    }

    /// `401 Unauthorized`.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED)
    }

    /// `403 Forbidden`.
    #[must_use]
    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN)
    }

    /// `404 Not Found`.
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    /// `405 Method Not Allowed`.
    #[must_use]
    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED)
    }

    /// `409 Conflict`.
    #[must_use]
    pub fn conflict() -> Self {
        Self::new(StatusCode::CONFLICT)
    }

    /// `415 Unsupported Media Type`.
    #[must_use]
    pub fn unsupported_media_type() -> Self {
        Self::new(StatusCode::UNSUPPORTED_MEDIA_TYPE)
    }

    /// `500 Internal Server Error`.
    #[must_use]
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// The status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The status as a number.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// The standard reason phrase, e.g. `"Not Found"`.
    #[must_use]
    pub fn status_phrase(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("")
    }

    /// The detail message.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

fn default_detail(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(phrase) => format!("{} {phrase}", status.as_u16()),
        None => status.as_u16().to_string(),
    }
}

impl ErrorClass for HttpError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Http
    }

    fn as_http(&self) -> Option<&HttpError> {
        Some(self)
    }
}

/// A media type that no renderer knows about.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{media_type} (available: {})", .available.join(", "))]
pub struct UnsupportedMediaType {
    /// The requested media type.
    pub media_type: String,
    /// Media types that are supported.
    pub available: Vec<String>,
}

impl UnsupportedMediaType {
    /// Creates the error.
    #[must_use]
    pub fn new(media_type: impl Into<String>, available: &[&str]) -> Self {
        Self {
            media_type: media_type.into(),
            available: available.iter().map(ToString::to_string).collect(),
        }
    }
}

impl ErrorClass for UnsupportedMediaType {}

/// A request-time failure, tagged with the lineage of its concrete type.
pub struct DispatchError {
    inner: Box<dyn StdError + Send + Sync + 'static>,
    lineage: Vec<TypeId>,
    type_name: &'static str,
    category: ErrorCategory,
    http: Option<HttpError>,
}

impl DispatchError {
    /// Wraps an error class value.
    pub fn new<E: ErrorClass>(error: E) -> Self {
        let lineage = lineage_of::<E>();
        let http = error.as_http().cloned();
        let category = if http.is_some() || lineage.contains(&TypeId::of::<HttpError>()) {
            ErrorCategory::Http
        } else {
            error.category()
        };
        Self {
            inner: Box::new(error),
            lineage,
            type_name: std::any::type_name::<E>(),
            category,
            http,
        }
    }

    /// Lineage, most specific first. Empty for ad-hoc errors.
    #[must_use]
    pub fn lineage(&self) -> &[TypeId] {
        &self.lineage
    }

    /// Rust type name of the wrapped error.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    /// Status and detail of the wrapped error, if its class is an
    /// [`HttpError`] or reports one through [`ErrorClass::as_http`].
    #[must_use]
    pub fn as_http(&self) -> Option<&HttpError> {
        self.http.as_ref()
    }

    /// Status a default handler would answer with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.as_http()
            .map_or(StatusCode::INTERNAL_SERVER_ERROR, HttpError::status)
    }

    /// Borrows the wrapped error as `E`.
    #[must_use]
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    /// Returns true if the wrapped error is an `E`.
    #[must_use]
    pub fn is<E: StdError + 'static>(&self) -> bool {
        self.inner.is::<E>()
    }

    /// Returns true if `E` appears anywhere in the lineage.
    #[must_use]
    pub fn is_a<E: ErrorClass>(&self) -> bool {
        self.lineage.contains(&TypeId::of::<E>())
    }
}

impl<E: ErrorClass> From<E> for DispatchError {
    fn from(error: E) -> Self {
        Self::new(error)
    }
}

impl From<anyhow::Error> for DispatchError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<HttpError>() {
            Ok(http) => Self::new(http),
            Err(error) => Self {
                inner: error.into(),
                lineage: Vec::new(),
                type_name: std::any::type_name::<anyhow::Error>(),
                category: ErrorCategory::Application,
                http: None,
            },
        }
    }
}

impl fmt::Debug for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchError")
            .field("type", &self.type_name)
            .field("category", &self.category)
            .field("error", &self.inner)
            .finish()
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl StdError for DispatchError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source()
    }
}

/// Errors raised while declaring routes, hooks, middleware or error handlers.
#[derive(Debug, Error)]
pub enum DeclarationError {
    /// A blocking callable was registered where a non-blocking one is required.
    #[error("'{name}' must be asynchronous; offload blocking work with `.offload()`")]
    NotAsynchronous {
        /// Name of the offending callable.
        name: String,
    },

    /// The route pattern is malformed.
    #[error(transparent)]
    InvalidPattern(PatternError),

    /// The route pattern is already taken.
    #[error("route '{pattern}' is already declared")]
    DuplicateRoute {
        /// The pattern.
        pattern: String,
    },

    /// The view cannot serve requests.
    #[error("invalid view '{view}': {reason}")]
    InvalidView {
        /// The view name.
        view: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A route declares an unknown or unsupported verb.
    #[error("route '{pattern}': unsupported method '{method}'")]
    UnsupportedMethod {
        /// The pattern.
        pattern: String,
        /// The verb as given.
        method: String,
    },

    /// A route restricts itself to no methods at all.
    #[error("route '{pattern}' allows no methods")]
    NoMethods {
        /// The pattern.
        pattern: String,
    },

    /// A hook names a route, view or method that was never declared.
    #[error("hook '{hook}' targets unknown {target}")]
    UnknownHookTarget {
        /// The hook name.
        hook: String,
        /// Description of the target.
        target: String,
    },

    /// A middleware constructor rejected its arguments.
    #[error("middleware '{middleware}': {reason}")]
    InvalidArgument {
        /// Middleware name.
        middleware: String,
        /// What is wrong.
        reason: String,
    },
}

impl From<PatternError> for DeclarationError {
    fn from(error: PatternError) -> Self {
        match error {
            PatternError::Duplicate { pattern } => Self::DuplicateRoute { pattern },
            other => Self::InvalidPattern(other),
        }
    }
}
