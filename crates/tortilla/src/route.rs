//! Declared routes and the innermost dispatch layer.

use std::sync::Arc;
use std::time::Instant;

use http::header::{ALLOW, SERVER};
use http::{HeaderMap, HeaderValue, Method};
use tortilla_core::{
    BoxFuture, Callable, DispatchError, DispatchResult, ErrorResolver, HttpError, Request, Resolution,
    Response, RouteMethodDispatcher, View,
};
use tortilla_middleware::{Dispatch, HookRegistry, HookTarget, Phase};
use tortilla_telemetry::{log_dispatch_error, record_error};
use tracing::debug;

/// A declared route, as listed by [`App::routes`](crate::App::routes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    /// The URL pattern.
    pub pattern: String,
    /// Name of the function or class view.
    pub view: String,
    /// Verbs that reach a handler, in canonical order.
    pub methods: Vec<Method>,
}

/// Headers every response starts with.
#[derive(Debug, Clone, Default)]
pub(crate) struct ResponseDefaults {
    headers: HeaderMap,
}

impl ResponseDefaults {
    pub(crate) fn insert(&mut self, name: http::HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub(crate) fn set_server(&mut self, value: Option<HeaderValue>) {
        match value {
            Some(value) => {
                self.headers.insert(SERVER, value);
            }
            None => {
                self.headers.remove(SERVER);
            }
        }
    }

    pub(crate) fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A fresh response carrying the default headers.
    pub(crate) fn response(&self) -> Response {
        Response::with_headers(self.headers.clone())
    }

    /// Adds any default header the response does not already carry.
    pub(crate) fn fill(&self, res: &mut Response) {
        for (name, value) in &self.headers {
            if !res.headers().contains_key(name) {
                res.set_header(name.clone(), value.clone());
            }
        }
    }
}

/// Shared, frozen registries every route reads at request time.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) hooks: HookRegistry,
    pub(crate) errors: ErrorResolver,
    pub(crate) defaults: ResponseDefaults,
}

impl Shared {
    /// Resolves `error` through the registered handlers.
    pub(crate) async fn resolve(&self, req: Request, error: DispatchError) -> Response {
        log_dispatch_error!(error.type_name(), error);
        record_error(error.category().as_str());
        self.errors.respond(req, self.defaults.response(), error).await
    }

    /// Renders a routing outcome (404, 405).
    ///
    /// Outcomes go straight to the handler resolved for [`HttpError`]
    /// (the built-in renderer unless one is registered). They are not
    /// logged or counted as errors.
    pub(crate) async fn routing_outcome(&self, req: Request, error: HttpError) -> Response {
        self.errors
            .respond(req, self.defaults.response(), error.into())
            .await
    }
}

/// Innermost layer for one route: permission check, hooks and view.
pub(crate) struct RouteDispatch {
    pattern: String,
    dispatcher: RouteMethodDispatcher,
    shared: Arc<Shared>,
}

impl RouteDispatch {
    pub(crate) fn new(pattern: String, dispatcher: RouteMethodDispatcher, shared: Arc<Shared>) -> Self {
        Self {
            pattern,
            dispatcher,
            shared,
        }
    }

    /// Hook levels for `method`, outermost first.
    fn hook_targets(&self, method: &Method) -> Vec<HookTarget> {
        let view = self.dispatcher.view();
        let mut targets = vec![
            HookTarget::route(self.pattern.as_str()),
            HookTarget::view(view.name()),
        ];
        if let View::Class(class) = view {
            targets.push(HookTarget::method(class.name(), method.clone()));
        }
        targets
    }

    async fn not_allowed(&self, req: Request, allowed: &[Method]) -> Response {
        debug!(route = %self.pattern, http.method = %req.method(), "method not allowed");
        let mut res = self
            .shared
            .routing_outcome(req, HttpError::method_not_allowed())
            .await;

        let allow = allowed
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        if let Ok(value) = HeaderValue::from_str(&allow) {
            res.set_header(ALLOW, value);
        }
        res
    }

    async fn run(&self, req: &Request) -> DispatchResult<Response> {
        let method = req.method();
        let handler = match self.dispatcher.resolve(method) {
            Resolution::Handler(handler) => handler,
            Resolution::NotAllowed(_) => return Err(HttpError::method_not_allowed().into()),
        };
        let targets = self.hook_targets(method);
        let hooks = &self.shared.hooks;

        let res = hooks
            .run(Phase::Before, &targets, req, self.shared.defaults.response())
            .await?;

        let started = Instant::now();
        let res = handler.call(req.clone(), res).await?;
        debug!(
            route = %self.pattern,
            view = handler.name(),
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "view returned"
        );

        hooks.run(Phase::After, &targets, req, res).await
    }
}

impl Dispatch for RouteDispatch {
    fn dispatch(&self, req: Request) -> BoxFuture<'_, DispatchResult<Response>> {
        Box::pin(async move {
            if !self.dispatcher.permits(req.method()) {
                let allowed = self.dispatcher.allowed_methods();
                return Ok(self.not_allowed(req, &allowed).await);
            }

            // Hook and view errors are resolved here so that the
            // middleware after-phases still unwind over the error response.
            match self.run(&req).await {
                Ok(res) => Ok(res),
                Err(error) => Ok(self.shared.resolve(req, error).await),
            }
        })
    }
}
