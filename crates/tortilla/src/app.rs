//! Application builder.
//!
//! Everything is declared on an [`App`]: routes, middleware, hooks and
//! error handlers. Each declaration is checked as it is made and fails
//! with a [`DeclarationError`]. [`App::build`] then freezes the registries
//! into a [`DispatchPipeline`].

use std::sync::Arc;

use http::{HeaderName, HeaderValue};
use indexmap::IndexMap;
use tortilla_config::{AppConfig, ConfigError};
use tortilla_core::{
    check_async, Callable, DeclarationError, ErrorClass, ErrorFormat, ErrorHandler, ErrorResolver,
    HookArgs, Kwargs, RouteMethodDispatcher, View,
};
use tortilla_middleware::{
    Dispatch, Hook, HookRegistry, HookTarget, Middleware, MiddlewareChain, MiddlewareFactory, Phase,
};
use tortilla_router::{Pattern, Router};
use tracing::{debug, info};

use crate::pipeline::{CompiledRoute, DispatchPipeline};
use crate::route::{ResponseDefaults, RouteDispatch, RouteInfo, Shared};

/// A hook waiting for its target to be checked at build time.
struct PendingHook {
    name: String,
    target: HookTarget,
}

/// Collects the declarations of one application.
///
/// # Example
///
/// ```rust
/// use tortilla::{view, App, HookArgs, HookTarget, hook, Response};
///
/// # fn main() -> Result<(), tortilla::DeclarationError> {
/// let mut app = App::new();
/// app.route("/", view("index", |_req, mut res: Response| async move {
///     res.set_text("hello");
///     Ok(res)
/// }))?;
/// app.before(
///     HookTarget::route("/"),
///     hook("stamp", |_req, mut res: Response, _params, _args| async move {
///         res.set_text("stamped");
///         Ok(res)
///     }),
///     HookArgs::new(),
/// )?;
///
/// let pipeline = app.build()?;
/// assert_eq!(pipeline.routes().len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct App {
    routes: IndexMap<String, RouteMethodDispatcher>,
    patterns: Router<()>,
    middleware: Vec<Arc<dyn Middleware>>,
    hooks: HookRegistry,
    pending_hooks: Vec<PendingHook>,
    errors: ErrorResolver,
    defaults: ResponseDefaults,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let middleware: Vec<&str> = self.middleware.iter().map(|m| m.name()).collect();
        f.debug_struct("App")
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .field("middleware", &middleware)
            .field("hooks", &self.hooks)
            .field("errors", &self.errors)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl App {
    /// An empty application: no default headers, plain-text errors.
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: IndexMap::new(),
            patterns: Router::new(),
            middleware: Vec::new(),
            hooks: HookRegistry::new(),
            pending_hooks: Vec::new(),
            errors: ErrorResolver::new(),
            defaults: ResponseDefaults::default(),
        }
    }

    /// An application set up from the `[app]` configuration section.
    ///
    /// Applies the error format, the default headers and, when enabled,
    /// a `Server` header carrying the application name.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let mut app = Self::new();
        app.error_format(config.error_format);

        for (name, value) in &config.default_headers {
            let field = || format!("app.default_headers.{name}");
            let header = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ConfigError::invalid_value(field(), e.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ConfigError::invalid_value(field(), e.to_string()))?;
            app.defaults.insert(header, value);
        }

        if config.server_header {
            let value = HeaderValue::from_str(&config.name)
                .map_err(|e| ConfigError::invalid_value("app.name", e.to_string()))?;
            app.defaults.set_server(Some(value));
        }

        Ok(app)
    }

    /// Selects how the built-in handler renders errors.
    pub fn error_format(&mut self, format: ErrorFormat) -> &mut Self {
        self.errors.set_format(format);
        self
    }

    /// Adds a header to every response unless a handler sets it.
    pub fn default_header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.defaults.insert(name, value);
        self
    }

    /// Declares a route that answers every verb `view` serves.
    pub fn route(
        &mut self,
        pattern: &str,
        view: impl Into<View>,
    ) -> Result<&mut Self, DeclarationError> {
        self.declare(pattern, view.into(), None)
    }

    /// Declares a route restricted to `methods`.
    ///
    /// ```rust
    /// use tortilla::{view, App};
    ///
    /// let mut app = App::new();
    /// let err = app
    ///     .route_with_methods("/", &["GET", "BREW"], view("index", |_req, res| async move { Ok(res) }))
    ///     .unwrap_err();
    /// assert!(err.to_string().contains("unsupported method 'BREW'"));
    /// ```
    pub fn route_with_methods(
        &mut self,
        pattern: &str,
        methods: &[&str],
        view: impl Into<View>,
    ) -> Result<&mut Self, DeclarationError> {
        self.declare(pattern, view.into(), Some(methods))
    }

    fn declare(
        &mut self,
        pattern: &str,
        view: View,
        methods: Option<&[&str]>,
    ) -> Result<&mut Self, DeclarationError> {
        let parsed = Pattern::parse(pattern)?;
        let dispatcher = RouteMethodDispatcher::new(pattern, view, methods)?;
        self.patterns.insert_pattern(&parsed, ())?;

        let key = parsed.canonical();
        debug!(
            route = %key,
            view = dispatcher.view().name(),
            methods = ?dispatcher.allowed_methods(),
            "declared route"
        );
        self.routes.insert(key, dispatcher);
        Ok(self)
    }

    /// Appends a middleware; the first one added is the outermost.
    pub fn add_middleware(
        &mut self,
        middleware: impl Middleware,
    ) -> Result<&mut Self, DeclarationError> {
        self.push_middleware(Arc::new(middleware))
    }

    /// Builds a middleware from `factory` with `kwargs` and appends it.
    pub fn add_middleware_with(
        &mut self,
        factory: impl MiddlewareFactory,
        kwargs: Kwargs,
    ) -> Result<&mut Self, DeclarationError> {
        let middleware = factory.build(&kwargs)?;
        self.push_middleware(middleware)
    }

    fn push_middleware(
        &mut self,
        middleware: Arc<dyn Middleware>,
    ) -> Result<&mut Self, DeclarationError> {
        check_async(middleware.as_ref())?;
        debug!(
            middleware = middleware.name(),
            position = self.middleware.len(),
            "added middleware"
        );
        self.middleware.push(middleware);
        Ok(self)
    }

    /// Attaches a hook that runs before the view.
    ///
    /// The target must name a declared route, view or view method by the
    /// time [`build`](Self::build) runs. Route targets are compared in
    /// canonical form, so `/items/` names the route declared as `/items`.
    pub fn before(
        &mut self,
        target: HookTarget,
        hook: impl Hook,
        args: HookArgs,
    ) -> Result<&mut Self, DeclarationError> {
        self.attach(target, Phase::Before, hook, args)
    }

    /// Attaches a hook that runs after the view.
    pub fn after(
        &mut self,
        target: HookTarget,
        hook: impl Hook,
        args: HookArgs,
    ) -> Result<&mut Self, DeclarationError> {
        self.attach(target, Phase::After, hook, args)
    }

    fn attach(
        &mut self,
        target: HookTarget,
        phase: Phase,
        hook: impl Hook,
        args: HookArgs,
    ) -> Result<&mut Self, DeclarationError> {
        let target = match target {
            // Route targets share the canonical form used as the route key.
            HookTarget::Route(pattern) => match Pattern::parse(&pattern) {
                Ok(parsed) => HookTarget::Route(parsed.canonical()),
                Err(_) => HookTarget::Route(pattern),
            },
            other => other,
        };
        let name = hook.name().to_string();
        self.hooks.attach(target.clone(), phase, hook, args)?;
        self.pending_hooks.push(PendingHook { name, target });
        Ok(self)
    }

    /// Handles errors of class `E`, and of its descendants with no closer
    /// handler, with `handler`.
    pub fn error_handler<E: ErrorClass>(
        &mut self,
        handler: impl ErrorHandler,
    ) -> Result<&mut Self, DeclarationError> {
        self.errors.register::<E>(handler)?;
        Ok(self)
    }

    /// Declared routes, in declaration order.
    #[must_use]
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.routes
            .iter()
            .map(|(pattern, dispatcher)| RouteInfo {
                pattern: pattern.clone(),
                view: dispatcher.view().name().to_string(),
                methods: dispatcher.allowed_methods(),
            })
            .collect()
    }

    fn target_exists(&self, target: &HookTarget) -> bool {
        match target {
            HookTarget::Route(pattern) => self.routes.contains_key(pattern),
            HookTarget::View(name) => self
                .routes
                .values()
                .any(|dispatcher| dispatcher.view().name() == name),
            HookTarget::Method { view, method } => {
                self.routes.values().any(|dispatcher| match dispatcher.view() {
                    View::Class(class) => {
                        class.name() == view
                            && (class.has_catch_all() || class.verbs().contains(method))
                    }
                    View::Function(_) => false,
                })
            }
        }
    }

    /// Checks every hook target and freezes the registries.
    pub fn build(self) -> Result<DispatchPipeline, DeclarationError> {
        if let Some(pending) = self
            .pending_hooks
            .iter()
            .find(|pending| !self.target_exists(&pending.target))
        {
            return Err(DeclarationError::UnknownHookTarget {
                hook: pending.name.clone(),
                target: pending.target.to_string(),
            });
        }

        let routes = self.routes();
        let Self {
            routes: declared,
            middleware,
            hooks,
            errors,
            defaults,
            ..
        } = self;

        let shared = Arc::new(Shared {
            hooks,
            errors,
            defaults,
        });

        let mut router = Router::new();
        for (pattern, dispatcher) in declared {
            let inner: Arc<dyn Dispatch> = Arc::new(RouteDispatch::new(
                pattern.clone(),
                dispatcher,
                Arc::clone(&shared),
            ));
            let chain = MiddlewareChain::build(inner, &middleware);
            router.insert(&pattern, Arc::new(CompiledRoute { pattern: pattern.clone(), chain }))?;
        }

        info!(
            routes = routes.len(),
            middleware = middleware.len(),
            "dispatch pipeline ready"
        );
        Ok(DispatchPipeline::new(router, routes, shared))
    }
}
