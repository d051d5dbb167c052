//! Error handler resolution.
//!
//! [`ErrorResolver`] maps a [`DispatchError`] to the handler registered for
//! the nearest class in its lineage. When nothing matches, the default
//! handler answers: HTTP errors with their own status and detail, everything
//! else with a bare `500`.
//!
//! The handler receives a response pre-populated with the default headers
//! and a `500` status, and decides the final status and body.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::callable::{check_async, run_blocking, Callable, Execution};
use crate::error::{DeclarationError, DispatchError, ErrorClass, HttpError, UnsupportedMediaType};
use crate::http::{Request, Response};
use crate::BoxFuture;

/// Turns an error into a response. Cannot fail.
pub trait ErrorHandler: Callable + Send + Sync + 'static {
    /// Produces the response for `error`.
    fn handle(&self, req: Request, res: Response, error: DispatchError) -> BoxFuture<'_, Response>;
}

/// An error handler backed by an async function.
pub struct FnErrorHandler<F> {
    name: String,
    func: F,
}

impl<F> FnErrorHandler<F> {
    /// Wraps `func` under `name`.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Callable for FnErrorHandler<F> {
    fn name(&self) -> &str {
        &self.name
    }
}

impl<F, Fut> ErrorHandler for FnErrorHandler<F>
where
    F: Fn(Request, Response, DispatchError) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn handle(&self, req: Request, res: Response, error: DispatchError) -> BoxFuture<'_, Response> {
        Box::pin((self.func)(req, res, error))
    }
}

/// An error handler backed by a synchronous function.
///
/// Refused at registration unless offloaded.
pub struct BlockingFnErrorHandler<F> {
    name: String,
    func: Arc<F>,
    offloaded: bool,
}

impl<F> BlockingFnErrorHandler<F> {
    /// Wraps `func` under `name`.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
            offloaded: false,
        }
    }

    /// Runs each call on the blocking pool.
    #[must_use]
    pub fn offload(mut self) -> Self {
        self.offloaded = true;
        self
    }
}

impl<F> Callable for BlockingFnErrorHandler<F> {
    fn name(&self) -> &str {
        &self.name
    }

    fn execution(&self) -> Execution {
        if self.offloaded {
            Execution::NonBlocking
        } else {
            Execution::Blocking
        }
    }
}

impl<F> ErrorHandler for BlockingFnErrorHandler<F>
where
    F: Fn(Request, Response, DispatchError) -> Response + Send + Sync + 'static,
{
    fn handle(&self, req: Request, res: Response, error: DispatchError) -> BoxFuture<'_, Response> {
        let func = Arc::clone(&self.func);
        Box::pin(async move {
            match run_blocking(move || func(req, res, error)).await {
                Ok(res) => res,
                Err(err) => {
                    let mut res = Response::new();
                    render(&mut res, StatusCode::INTERNAL_SERVER_ERROR, &err.to_string(), ErrorFormat::Text);
                    res
                }
            }
        })
    }
}

/// Shorthand for [`FnErrorHandler::new`].
pub fn error_handler<F, Fut>(name: impl Into<String>, func: F) -> FnErrorHandler<F>
where
    F: Fn(Request, Response, DispatchError) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    FnErrorHandler::new(name, func)
}

/// How the default handler renders errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ErrorFormat {
    /// `text/plain` detail.
    #[default]
    Text,
    /// `<h1>detail</h1>`.
    Html,
    /// `{"error": detail, "status": code}`.
    Json,
}

impl ErrorFormat {
    /// Names accepted by [`FromStr`].
    pub const NAMES: [&'static str; 3] = ["text", "html", "json"];

    /// Canonical name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Html => "html",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ErrorFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorFormat {
    type Err = UnsupportedMediaType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "text/plain" => Ok(Self::Text),
            "html" | "text/html" => Ok(Self::Html),
            "json" | "media" | "application/json" => Ok(Self::Json),
            _ => Err(UnsupportedMediaType::new(s, &Self::NAMES)),
        }
    }
}

impl TryFrom<String> for ErrorFormat {
    type Error = UnsupportedMediaType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ErrorFormat> for String {
    fn from(format: ErrorFormat) -> Self {
        format.as_str().to_string()
    }
}

fn render(res: &mut Response, status: StatusCode, detail: &str, format: ErrorFormat) {
    res.set_status(status);
    match format {
        ErrorFormat::Text => res.set_text(detail),
        ErrorFormat::Html => res.set_html(format!("<h1>{detail}</h1>")),
        ErrorFormat::Json => res.set_media(json!({ "error": detail, "status": status.as_u16() })),
    }
}

/// Status and client-safe detail for an error.
///
/// Application errors are reported as a bare `500` without their message.
fn public_view(error: &DispatchError) -> (StatusCode, String) {
    match error.as_http() {
        Some(http) => (http.status(), http.detail().to_string()),
        None => {
            let internal = HttpError::internal();
            (internal.status(), internal.detail().to_string())
        }
    }
}

/// Renders the error as plain text.
pub async fn error_to_text(_req: Request, mut res: Response, error: DispatchError) -> Response {
    let (status, detail) = public_view(&error);
    render(&mut res, status, &detail, ErrorFormat::Text);
    res
}

/// Renders the error as `<h1>detail</h1>`.
pub async fn error_to_html(_req: Request, mut res: Response, error: DispatchError) -> Response {
    let (status, detail) = public_view(&error);
    render(&mut res, status, &detail, ErrorFormat::Html);
    res
}

/// Renders the error as `{"error": detail, "status": code}`.
pub async fn error_to_media(_req: Request, mut res: Response, error: DispatchError) -> Response {
    let (status, detail) = public_view(&error);
    render(&mut res, status, &detail, ErrorFormat::Json);
    res
}

/// Handler used when nothing more specific is registered.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorHandler {
    format: ErrorFormat,
}

impl DefaultErrorHandler {
    /// Renders with `format`.
    #[must_use]
    pub const fn new(format: ErrorFormat) -> Self {
        Self { format }
    }
}

impl Callable for DefaultErrorHandler {
    fn name(&self) -> &str {
        "default_error_handler"
    }
}

impl ErrorHandler for DefaultErrorHandler {
    fn handle(&self, _req: Request, mut res: Response, error: DispatchError) -> BoxFuture<'_, Response> {
        let format = self.format;
        Box::pin(async move {
            let (status, detail) = public_view(&error);
            render(&mut res, status, &detail, format);
            res
        })
    }
}

struct Registered {
    class: &'static str,
    handler: Arc<dyn ErrorHandler>,
}

/// Registry of error handlers keyed by error class.
///
/// Frozen once the application is built; lookups take no locks.
#[derive(Clone)]
pub struct ErrorResolver {
    handlers: HashMap<TypeId, Arc<Registered>>,
    default: Arc<dyn ErrorHandler>,
}

impl Default for ErrorResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ErrorResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut classes: Vec<_> = self.handlers.values().map(|r| r.class).collect();
        classes.sort_unstable();
        f.debug_struct("ErrorResolver")
            .field("classes", &classes)
            .field("default", &self.default.name())
            .finish()
    }
}

impl ErrorResolver {
    /// A resolver with only the plain-text default handler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            default: Arc::new(DefaultErrorHandler::default()),
        }
    }

    /// Switches the built-in default handler to `format`.
    pub fn set_format(&mut self, format: ErrorFormat) {
        self.default = Arc::new(DefaultErrorHandler::new(format));
    }

    /// Registers `handler` for errors of class `E` and its descendants.
    ///
    /// A later registration for the same class replaces the earlier one.
    pub fn register<E: ErrorClass>(&mut self, handler: impl ErrorHandler) -> Result<(), DeclarationError> {
        check_async(&handler)?;
        let class = std::any::type_name::<E>();
        debug!(class, handler = handler.name(), "registered error handler");
        self.handlers.insert(
            TypeId::of::<E>(),
            Arc::new(Registered {
                class,
                handler: Arc::new(handler),
            }),
        );
        Ok(())
    }

    /// Replaces the handler used when no class matches.
    pub fn register_default(&mut self, handler: impl ErrorHandler) -> Result<(), DeclarationError> {
        check_async(&handler)?;
        debug!(handler = handler.name(), "registered default error handler");
        self.default = Arc::new(handler);
        Ok(())
    }

    /// Handler for `error`: nearest registered class in its lineage, or the default.
    #[must_use]
    pub fn resolve(&self, error: &DispatchError) -> &Arc<dyn ErrorHandler> {
        error
            .lineage()
            .iter()
            .find_map(|id| self.handlers.get(id))
            .map_or(&self.default, |registered| &registered.handler)
    }

    /// Returns true if a handler is registered for `E` exactly.
    #[must_use]
    pub fn handles<E: ErrorClass>(&self) -> bool {
        self.handlers.contains_key(&TypeId::of::<E>())
    }

    /// Resolves and runs the handler on `res`, which is reset to `500` first.
    pub async fn respond(&self, req: Request, mut res: Response, error: DispatchError) -> Response {
        res.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        let handler = self.resolve(&error);
        debug!(
            error.class = error.type_name(),
            handler = handler.name(),
            "resolved error handler"
        );
        handler.handle(req, res, error).await
    }

    /// Number of class-specific handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if only the default handler is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::lineage_of;
    use crate::http::Content;

    #[derive(Debug, thiserror::Error)]
    #[error("domain")]
    struct DomainError;
    impl ErrorClass for DomainError {}

    #[derive(Debug, thiserror::Error)]
    #[error("out of stock")]
    struct OutOfStock;
    impl ErrorClass for OutOfStock {
        fn ancestors() -> Vec<TypeId> {
            lineage_of::<DomainError>()
        }
    }

    fn req() -> Request {
        Request::builder().uri("/").build().unwrap()
    }

    fn labelled(label: &'static str) -> impl ErrorHandler {
        error_handler(label, move |_req, mut res: Response, _err| async move {
            res.set_text(label);
            res
        })
    }

    #[tokio::test]
    async fn test_default_text_for_http_error() {
        let resolver = ErrorResolver::new();
        let res = resolver
            .respond(req(), Response::new(), HttpError::not_found().into())
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(res.text(), Some("404 Not Found"));
    }

    #[tokio::test]
    async fn test_default_hides_application_errors() {
        let resolver = ErrorResolver::new();
        let res = resolver
            .respond(req(), Response::new(), anyhow::anyhow!("secret path /etc").into())
            .await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.text(), Some("500 Internal Server Error"));
    }

    #[tokio::test]
    async fn test_exact_match() {
        let mut resolver = ErrorResolver::new();
        resolver.register::<OutOfStock>(labelled("stock")).unwrap();
        let res = resolver.respond(req(), Response::new(), OutOfStock.into()).await;
        assert_eq!(res.text(), Some("stock"));
    }

    #[tokio::test]
    async fn test_nearest_ancestor_wins() {
        let mut resolver = ErrorResolver::new();
        resolver.register::<DomainError>(labelled("domain")).unwrap();
        let res = resolver.respond(req(), Response::new(), OutOfStock.into()).await;
        assert_eq!(res.text(), Some("domain"));

        resolver.register::<OutOfStock>(labelled("stock")).unwrap();
        let res = resolver.respond(req(), Response::new(), OutOfStock.into()).await;
        assert_eq!(res.text(), Some("stock"));

        let res = resolver.respond(req(), Response::new(), DomainError.into()).await;
        assert_eq!(res.text(), Some("domain"));
    }

    #[tokio::test]
    async fn test_handler_receives_500_and_headers() {
        let mut resolver = ErrorResolver::new();
        resolver
            .register::<DomainError>(error_handler("muted", |_req, mut res: Response, _err| async move {
                res.set_text("muted!");
                res
            }))
            .unwrap();

        let mut base = Response::new();
        base.set_header(http::header::SERVER, http::HeaderValue::from_static("tortilla"));
        let res = resolver.respond(req(), base, DomainError.into()).await;

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.text(), Some("muted!"));
        assert_eq!(res.header("server"), Some("tortilla"));
    }

    #[tokio::test]
    async fn test_http_error_handler_can_set_status() {
        let mut resolver = ErrorResolver::new();
        resolver
            .register::<HttpError>(error_handler("custom", |_req, mut res: Response, err: DispatchError| async move {
                res.set_status(err.status());
                res.set_text("Foo");
                res
            }))
            .unwrap();

        let res = resolver
            .respond(req(), Response::new(), HttpError::unauthorized().into())
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.text(), Some("Foo"));
    }

    #[tokio::test]
    async fn test_builtin_renderers() {
        let html = error_to_html(req(), Response::new(), HttpError::forbidden().into()).await;
        assert_eq!(html.content(), &Content::Html("<h1>403 Forbidden</h1>".to_string()));

        let media = error_to_media(req(), Response::new(), HttpError::not_found().into()).await;
        assert_eq!(media.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            media.content(),
            &Content::Media(json!({"error": "404 Not Found", "status": 404}))
        );

        let text = error_to_text(req(), Response::new(), HttpError::conflict().into()).await;
        assert_eq!(text.text(), Some("409 Conflict"));
    }

    #[tokio::test]
    async fn test_format_switches_default() {
        let mut resolver = ErrorResolver::new();
        resolver.set_format(ErrorFormat::Json);
        let res = resolver
            .respond(req(), Response::new(), HttpError::bad_request().into())
            .await;
        assert_eq!(
            res.content(),
            &Content::Media(json!({"error": "400 Bad Request", "status": 400}))
        );
    }

    #[tokio::test]
    async fn test_register_default_catches_everything_unmatched() {
        let mut resolver = ErrorResolver::new();
        resolver.register_default(labelled("fallback")).unwrap();
        let res = resolver
            .respond(req(), Response::new(), HttpError::not_found().into())
            .await;
        assert_eq!(res.text(), Some("fallback"));
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_blocking_handler_rejected() {
        let mut resolver = ErrorResolver::new();
        let blocking = BlockingFnErrorHandler::new("sync_handler", |_req, res: Response, _err| res);
        let err = resolver.register::<DomainError>(blocking).unwrap_err();
        assert!(err.to_string().contains("'sync_handler' must be asynchronous"));
        assert!(resolver.is_empty());
    }

    #[tokio::test]
    async fn test_offloaded_blocking_handler_runs() {
        let mut resolver = ErrorResolver::new();
        let blocking = BlockingFnErrorHandler::new("sync_handler", |_req, mut res: Response, _err| {
            res.set_text("from pool");
            res
        });
        resolver.register::<DomainError>(blocking.offload()).unwrap();
        assert!(resolver.handles::<DomainError>());
        let res = resolver.respond(req(), Response::new(), DomainError.into()).await;
        assert_eq!(res.text(), Some("from pool"));
    }

    #[test]
    fn test_error_format_parsing() {
        assert_eq!("HTML".parse::<ErrorFormat>().unwrap(), ErrorFormat::Html);
        assert_eq!("application/json".parse::<ErrorFormat>().unwrap(), ErrorFormat::Json);
        let err = "yaml".parse::<ErrorFormat>().unwrap_err();
        assert_eq!(err.to_string(), "yaml (available: text, html, json)");
    }

    #[test]
    fn test_error_format_serde() {
        let format: ErrorFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, ErrorFormat::Json);
        assert_eq!(serde_json::to_string(&ErrorFormat::Html).unwrap(), "\"html\"");
        assert!(serde_json::from_str::<ErrorFormat>("\"xml\"").is_err());
    }
}
