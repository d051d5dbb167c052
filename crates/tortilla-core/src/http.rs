//! Request and response types seen by views, hooks, middleware and error handlers.
//!
//! [`Request`] is immutable and cheap to clone; every participant in a
//! dispatch gets its own handle. [`Response`] is owned and threaded through
//! the chain by value.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, Method, StatusCode, Uri};
use http_body_util::Full;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tortilla_router::Params;

use crate::error::HttpError;

/// Content type used for plain text bodies.
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
/// Content type used for HTML bodies.
pub const TEXT_HTML: &str = "text/html; charset=utf-8";
/// Content type used for JSON bodies.
pub const APPLICATION_JSON: &str = "application/json";

#[derive(Debug, Clone)]
struct RequestParts {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    params: Params,
}

/// An incoming request.
///
/// # Example
///
/// ```rust
/// use bytes::Bytes;
/// use http::Method;
/// use tortilla_core::Request;
///
/// let req = Request::builder()
///     .method(Method::POST)
///     .uri("/items?page=2")
///     .header("content-type", "application/json")
///     .body(Bytes::from_static(br#"{"name":"taco"}"#))
///     .build()
///     .unwrap();
///
/// assert_eq!(req.path(), "/items");
/// assert_eq!(req.query(), Some("page=2"));
/// let value: serde_json::Value = req.json().unwrap();
/// assert_eq!(value["name"], "taco");
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    inner: Arc<RequestParts>,
}

impl Request {
    /// Creates a request from its parts.
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            inner: Arc::new(RequestParts {
                method,
                uri,
                headers,
                body,
                params: Params::new(),
            }),
        }
    }

    /// Starts building a request.
    #[must_use]
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    /// Converts an `http::Request` with a buffered body.
    #[must_use]
    pub fn from_http(request: http::Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        Self::new(parts.method, parts.uri, parts.headers, body)
    }

    /// Attaches the path parameters captured by the router.
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        Arc::make_mut(&mut self.inner).params = params;
        self
    }

    /// The request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    /// The full request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.inner.uri
    }

    /// The path component of the URI.
    #[must_use]
    pub fn path(&self) -> &str {
        self.inner.uri.path()
    }

    /// The raw query string, if any.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.inner.uri.query()
    }

    /// All request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    /// A header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The raw body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.inner.body
    }

    /// The body decoded as UTF-8.
    pub fn text(&self) -> Result<&str, HttpError> {
        std::str::from_utf8(&self.inner.body)
            .map_err(|_| HttpError::with_detail(StatusCode::BAD_REQUEST, "request body is not valid UTF-8"))
    }

    /// The body parsed as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_json::from_slice(&self.inner.body).map_err(|e| {
            HttpError::with_detail(StatusCode::BAD_REQUEST, format!("invalid JSON body: {e}"))
        })
    }

    /// Path parameters captured by the router.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.inner.params
    }

    /// A single path parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.inner.params.get(name)
    }
}

/// Builder for [`Request`], mostly useful in tests.
#[derive(Debug, Default)]
pub struct RequestBuilder {
    inner: http::request::Builder,
    body: Bytes,
}

impl RequestBuilder {
    /// Sets the method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.inner = self.inner.method(method);
        self
    }

    /// Sets the URI.
    #[must_use]
    pub fn uri(mut self, uri: &str) -> Self {
        self.inner = self.inner.uri(uri);
        self
    }

    /// Appends a header.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.inner = self.inner.header(name, value);
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Finishes the request, failing on an invalid URI or header.
    pub fn build(self) -> Result<Request, http::Error> {
        let request = self.inner.body(self.body)?;
        Ok(Request::from_http(request))
    }
}

/// Body of a [`Response`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Content {
    /// No body.
    #[default]
    Empty,
    /// Plain text.
    Text(String),
    /// Structured data, serialized as JSON.
    Media(Value),
    /// HTML markup.
    Html(String),
    /// Raw bytes with whatever content type the caller set.
    Bytes(Bytes),
}

/// An outgoing response.
///
/// The status stays unset until someone sets it and reads as `200 OK` until
/// then.
///
/// ```rust
/// use http::StatusCode;
/// use tortilla_core::{Content, Response};
///
/// let mut res = Response::new();
/// assert_eq!(res.status(), StatusCode::OK);
///
/// res.set_media(serde_json::json!({"ok": true}));
/// res.set_status(StatusCode::CREATED);
/// assert!(matches!(res.content(), Content::Media(_)));
///
/// let http = res.into_http();
/// assert_eq!(http.status(), StatusCode::CREATED);
/// assert_eq!(http.headers()["content-type"], "application/json");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Response {
    status: Option<StatusCode>,
    headers: HeaderMap,
    content: Content,
}

impl Response {
    /// Creates an empty response.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty response carrying `headers`.
    #[must_use]
    pub fn with_headers(headers: HeaderMap) -> Self {
        Self {
            headers,
            ..Self::default()
        }
    }

    /// The status, `200 OK` if never set.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Returns true once a status has been set explicitly.
    #[must_use]
    pub fn has_status(&self) -> bool {
        self.status.is_some()
    }

    /// Sets the status.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable response headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Inserts a header, replacing any previous value.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// A header value as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The body.
    #[must_use]
    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Sets a plain text body.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.content = Content::Text(text.into());
    }

    /// Sets a JSON body.
    pub fn set_media(&mut self, value: Value) {
        self.content = Content::Media(value);
    }

    /// Serializes `value` into a JSON body.
    pub fn set_json<T: Serialize>(&mut self, value: &T) -> Result<(), serde_json::Error> {
        self.content = Content::Media(serde_json::to_value(value)?);
        Ok(())
    }

    /// Sets an HTML body.
    pub fn set_html(&mut self, html: impl Into<String>) {
        self.content = Content::Html(html.into());
    }

    /// Sets a raw body.
    pub fn set_bytes(&mut self, bytes: impl Into<Bytes>) {
        self.content = Content::Bytes(bytes.into());
    }

    /// The body as text, for text and HTML content.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Content::Text(s) | Content::Html(s) => Some(s),
            _ => None,
        }
    }

    /// Encodes the response for the transport.
    ///
    /// The content type follows the body kind unless a handler already set one.
    #[must_use]
    pub fn into_http(self) -> http::Response<Full<Bytes>> {
        let Self {
            status,
            mut headers,
            content,
        } = self;

        let (content_type, body) = match content {
            Content::Empty => (None, Bytes::new()),
            Content::Text(text) => (Some(TEXT_PLAIN), Bytes::from(text)),
            Content::Html(html) => (Some(TEXT_HTML), Bytes::from(html)),
            Content::Media(value) => (Some(APPLICATION_JSON), Bytes::from(value.to_string())),
            Content::Bytes(bytes) => (None, bytes),
        };

        if let Some(content_type) = content_type {
            headers
                .entry(CONTENT_TYPE)
                .or_insert(HeaderValue::from_static(content_type));
        }
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));

        let mut response = http::Response::new(Full::new(body));
        *response.status_mut() = status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = headers;
        response
    }
}
