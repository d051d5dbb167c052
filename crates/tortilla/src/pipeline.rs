//! Per-request orchestration.
//!
//! ```text
//! match route ──no──▶ 404 (pipeline bypassed)
//!      │
//!      ▼
//! middleware before (outer → inner)
//!      │
//!      ▼
//! method permitted? ──no──▶ 405 + Allow (hooks and view skipped)
//!      │
//!      ▼
//! before hooks → view → after hooks      errors resolved here
//!      │
//!      ▼
//! middleware after (inner → outer)       errors resolved at the edge
//! ```

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http_body_util::Full;
use tortilla_core::{HttpError, Request, Response};
use tortilla_middleware::{Dispatch, MiddlewareChain};
use tortilla_router::Router;
use tortilla_telemetry::{log_dispatch_complete, record_request, InFlightGuard};
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use crate::route::{RouteInfo, Shared};

/// Route label used in metrics when nothing matched.
const UNMATCHED: &str = "<unmatched>";

/// A route with its middleware chain, built once.
pub(crate) struct CompiledRoute {
    pub(crate) pattern: String,
    pub(crate) chain: MiddlewareChain,
}

/// The frozen dispatch pipeline of an [`App`](crate::App).
///
/// Cheap to clone; every clone shares the same registries.
///
/// # Example
///
/// ```rust
/// use bytes::Bytes;
/// use tortilla::{view, App, Response};
///
/// # tokio_test::block_on(async {
/// let mut app = App::new();
/// app.route("/hello/{name}", view("hello", |req, mut res: Response| async move {
///     res.set_text(format!("hello {}", req.param("name").unwrap_or("?")));
///     Ok(res)
/// })).unwrap();
/// let pipeline = app.build().unwrap();
///
/// let req = http::Request::get("/hello/ana").body(Bytes::new()).unwrap();
/// let res = pipeline.handle(req).await;
/// assert_eq!(res.status(), 200);
/// # });
/// ```
#[derive(Clone)]
pub struct DispatchPipeline {
    router: Arc<Router<Arc<CompiledRoute>>>,
    routes: Arc<[RouteInfo]>,
    shared: Arc<Shared>,
}

impl DispatchPipeline {
    pub(crate) fn new(
        router: Router<Arc<CompiledRoute>>,
        routes: Vec<RouteInfo>,
        shared: Arc<Shared>,
    ) -> Self {
        Self {
            router: Arc::new(router),
            routes: routes.into(),
            shared,
        }
    }

    /// Declared routes, in declaration order.
    #[must_use]
    pub fn routes(&self) -> &[RouteInfo] {
        &self.routes
    }

    /// Dispatches a transport request and encodes the response.
    pub async fn handle(&self, request: http::Request<Bytes>) -> http::Response<Full<Bytes>> {
        self.respond(Request::from_http(request)).await.into_http()
    }

    /// Dispatches `req` through the pipeline.
    ///
    /// Never fails: every error ends up as a response from the error
    /// handlers.
    pub async fn respond(&self, req: Request) -> Response {
        let request_id = Uuid::now_v7();
        let span = info_span!(
            "dispatch",
            request_id = %request_id,
            http.method = %req.method(),
            http.path = %req.path(),
        );
        self.respond_inner(req).instrument(span).await
    }

    async fn respond_inner(&self, req: Request) -> Response {
        let _in_flight = InFlightGuard::new();
        let started = Instant::now();

        let (route, mut res) = match self.router.match_path(req.path()) {
            Some(matched) => {
                let route = Arc::clone(matched.value);
                let req = req.with_params(matched.params);
                let res = match route.chain.dispatch(req.clone()).await {
                    Ok(res) => res,
                    // Middleware failures abort the chain and land here.
                    Err(error) => self.shared.resolve(req, error).await,
                };
                (route.pattern.clone(), res)
            }
            None => {
                debug!("no route matched");
                let res = self
                    .shared
                    .routing_outcome(req, HttpError::not_found())
                    .await;
                (UNMATCHED.to_string(), res)
            }
        };

        self.shared.defaults.fill(&mut res);

        let elapsed = started.elapsed();
        let status = res.status().as_u16();
        record_request(&route, status, elapsed);
        log_dispatch_complete!(route, status, elapsed.as_secs_f64() * 1000.0);
        res
    }
}

impl std::fmt::Debug for DispatchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchPipeline")
            .field("routes", &self.routes)
            .field("errors", &self.shared.errors)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::App;
    use http::{Method, StatusCode};
    use tortilla_core::{view, ClassView};

    fn pipeline() -> DispatchPipeline {
        let mut app = App::new();
        app.route(
            "/items/{id}",
            ClassView::new("Item").get(view("Item.get", |req, mut res: Response| async move {
                res.set_text(format!("item {}", req.param("id").unwrap_or_default()));
                Ok(res)
            })),
        )
        .unwrap();
        app.build().unwrap()
    }

    fn request(method: Method, uri: &str) -> Request {
        Request::builder().method(method).uri(uri).build().unwrap()
    }

    #[tokio::test]
    async fn test_params_reach_the_view() {
        let res = pipeline().respond(request(Method::GET, "/items/7")).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.text(), Some("item 7"));
    }

    #[tokio::test]
    async fn test_unmatched_path_is_not_found() {
        let res = pipeline().respond(request(Method::GET, "/nothing")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(res.text(), Some("404 Not Found"));
    }

    #[tokio::test]
    async fn test_missing_verb_is_not_allowed() {
        let res = pipeline().respond(request(Method::POST, "/items/7")).await;
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.header("allow"), Some("GET"));
    }

    #[tokio::test]
    async fn test_handle_encodes_response() {
        let req = http::Request::get("/items/9").body(Bytes::new()).unwrap();
        let res = pipeline().handle(req).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["content-type"], "text/plain; charset=utf-8");
    }

    #[test]
    fn test_routes_survive_build() {
        let routes = pipeline().routes().to_vec();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].methods, vec![Method::GET]);
    }
}
