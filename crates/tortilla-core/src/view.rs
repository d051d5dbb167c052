//! Views and per-verb dispatch.
//!
//! A route serves either a single function view, which answers every verb
//! the route permits, or a class view: a named table of per-verb handlers
//! with an optional catch-all that answers every verb and bypasses the
//! per-verb lookup.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use http::Method;
use tortilla_router::{parse_method, MethodRouter, SUPPORTED_METHODS};

use crate::callable::{check_async, run_blocking, Callable, Execution};
use crate::error::{DeclarationError, DispatchResult};
use crate::http::{Request, Response};
use crate::BoxFuture;

/// Produces the response for a request.
pub trait ViewHandler: Callable + Send + Sync + 'static {
    /// Handles the request. Path parameters are on `req`.
    fn call(&self, req: Request, res: Response) -> BoxFuture<'_, DispatchResult<Response>>;
}

/// A view backed by an async function or closure.
pub struct FnView<F> {
    name: String,
    func: F,
}

impl<F> FnView<F> {
    /// Wraps `func` under `name`.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Callable for FnView<F> {
    fn name(&self) -> &str {
        &self.name
    }
}

impl<F, Fut> ViewHandler for FnView<F>
where
    F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DispatchResult<Response>> + Send + 'static,
{
    fn call(&self, req: Request, res: Response) -> BoxFuture<'_, DispatchResult<Response>> {
        Box::pin((self.func)(req, res))
    }
}

/// A view backed by a synchronous function.
///
/// Refused at registration unless [`offload`](Self::offload)ed, in which
/// case each call runs on the blocking pool.
pub struct BlockingFnView<F> {
    name: String,
    func: Arc<F>,
    offloaded: bool,
}

impl<F> BlockingFnView<F> {
    /// Wraps `func` under `name`.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
            offloaded: false,
        }
    }

    /// Runs each call on the blocking pool, making the view registrable.
    #[must_use]
    pub fn offload(mut self) -> Self {
        self.offloaded = true;
        self
    }
}

impl<F> Callable for BlockingFnView<F> {
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

impl<F> ViewHandler for BlockingFnView<F>
where
    F: Fn(Request, Response) -> DispatchResult<Response> + Send + Sync + 'static,
{
    fn call(&self, req: Request, res: Response) -> BoxFuture<'_, DispatchResult<Response>> {
        let func = Arc::clone(&self.func);
        Box::pin(async move { run_blocking(move || func(req, res)).await? })
    }
}

/// Shorthand for [`FnView::new`].
pub fn view<F, Fut>(name: impl Into<String>, func: F) -> FnView<F>
where
    F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DispatchResult<Response>> + Send + 'static,
{
    FnView::new(name, func)
}

/// Shorthand for [`BlockingFnView::new`].
pub fn blocking_view<F>(name: impl Into<String>, func: F) -> BlockingFnView<F>
where
    F: Fn(Request, Response) -> DispatchResult<Response> + Send + Sync + 'static,
{
    BlockingFnView::new(name, func)
}

/// A named set of per-verb handlers plus an optional catch-all.
///
/// ```rust
/// use http::Method;
/// use tortilla_core::{view, ClassView, Response};
///
/// let items = ClassView::new("Items")
///     .get(view("Items.get", |_req, mut res: Response| async move {
///         res.set_text("list");
///         Ok(res)
///     }))
///     .on("Post", view("Items.post", |_req, res| async move { Ok(res) }));
///
/// assert_eq!(items.verbs(), vec![Method::GET, Method::POST]);
/// assert!(items.validate().is_ok());
/// ```
#[derive(Clone)]
pub struct ClassView {
    name: String,
    handlers: MethodRouter<Arc<dyn ViewHandler>>,
    catch_all: Option<Arc<dyn ViewHandler>>,
    problems: Vec<String>,
}

impl ClassView {
    /// Creates an empty class view.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: MethodRouter::new(),
            catch_all: None,
            problems: Vec::new(),
        }
    }

    /// Sets the handler for `verb`, matched case-insensitively.
    ///
    /// Unknown verbs are reported by [`validate`](Self::validate).
    #[must_use]
    pub fn on(mut self, verb: &str, handler: impl ViewHandler) -> Self {
        match parse_method(verb) {
            Some(method) => self.set(&method, Arc::new(handler)),
            None => self.problems.push(format!("unsupported method '{verb}'")),
        }
        self
    }

    fn set(&mut self, method: &Method, handler: Arc<dyn ViewHandler>) {
        if let Ok(Some(_)) = self.handlers.insert(method, handler) {
            self.problems
                .push(format!("method '{method}' is defined more than once"));
        }
    }

    /// Sets the GET handler.
    #[must_use]
    pub fn get(mut self, handler: impl ViewHandler) -> Self {
        self.set(&Method::GET, Arc::new(handler));
        self
    }

    /// Sets the POST handler.
    #[must_use]
    pub fn post(mut self, handler: impl ViewHandler) -> Self {
        self.set(&Method::POST, Arc::new(handler));
        self
    }

    /// Sets the PUT handler.
    #[must_use]
    pub fn put(mut self, handler: impl ViewHandler) -> Self {
        self.set(&Method::PUT, Arc::new(handler));
        self
    }

    /// Sets the PATCH handler.
    #[must_use]
    pub fn patch(mut self, handler: impl ViewHandler) -> Self {
        self.set(&Method::PATCH, Arc::new(handler));
        self
    }

    /// Sets the DELETE handler.
    #[must_use]
    pub fn delete(mut self, handler: impl ViewHandler) -> Self {
        self.set(&Method::DELETE, Arc::new(handler));
        self
    }

    /// Sets the catch-all handler, which answers every verb.
    #[must_use]
    pub fn handle(mut self, handler: impl ViewHandler) -> Self {
        if self.catch_all.is_some() {
            self.problems.push("catch-all is defined more than once".to_string());
        }
        self.catch_all = Some(Arc::new(handler));
        self
    }

    /// The class name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Verbs with a dedicated handler.
    #[must_use]
    pub fn verbs(&self) -> Vec<Method> {
        self.handlers.allowed()
    }

    /// Returns true if a catch-all is defined.
    #[must_use]
    pub fn has_catch_all(&self) -> bool {
        self.catch_all.is_some()
    }

    /// Checks that the view can serve requests.
    pub fn validate(&self) -> Result<(), DeclarationError> {
        let invalid = |reason: String| DeclarationError::InvalidView {
            view: self.name.clone(),
            reason,
        };

        if let Some(problem) = self.problems.first() {
            return Err(invalid(problem.clone()));
        }
        if self.catch_all.is_none() && self.handlers.is_empty() {
            return Err(invalid("defines no method handlers".to_string()));
        }
        for method in self.handlers.allowed() {
            if let Some(handler) = self.handlers.handler(&method) {
                check_async(handler.as_ref())?;
            }
        }
        if let Some(handler) = &self.catch_all {
            check_async(handler.as_ref())?;
        }
        Ok(())
    }
}

impl fmt::Debug for ClassView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassView")
            .field("name", &self.name)
            .field("verbs", &self.verbs())
            .field("catch_all", &self.catch_all.is_some())
            .finish()
    }
}

/// What a route serves.
#[derive(Clone)]
pub enum View {
    /// One handler for every permitted verb.
    Function(Arc<dyn ViewHandler>),
    /// Per-verb handlers.
    Class(ClassView),
}

impl View {
    /// Wraps a function view.
    pub fn function(handler: impl ViewHandler) -> Self {
        Self::Function(Arc::new(handler))
    }

    /// Name of the function or class.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Function(handler) => handler.name(),
            Self::Class(class) => class.name(),
        }
    }

    fn validate(&self) -> Result<(), DeclarationError> {
        match self {
            Self::Function(handler) => check_async(handler.as_ref()),
            Self::Class(class) => class.validate(),
        }
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(handler) => f.debug_tuple("Function").field(&handler.name()).finish(),
            Self::Class(class) => f.debug_tuple("Class").field(class).finish(),
        }
    }
}

impl From<ClassView> for View {
    fn from(class: ClassView) -> Self {
        Self::Class(class)
    }
}

impl<H: ViewHandler> From<H> for View {
    fn from(handler: H) -> Self {
        Self::function(handler)
    }
}

/// Outcome of resolving a verb against a route.
pub enum Resolution<'a> {
    /// The handler to run.
    Handler(&'a Arc<dyn ViewHandler>),
    /// The verb is not permitted; carries the verbs that are.
    NotAllowed(Vec<Method>),
}

/// Chooses the handler that serves a verb on one route.
///
/// Resolution order: the route's explicit method restriction, then the
/// class catch-all, then the per-verb handler.
#[derive(Debug, Clone)]
pub struct RouteMethodDispatcher {
    view: View,
    restrict: Option<Vec<Method>>,
}

impl RouteMethodDispatcher {
    /// Validates `view` and the optional method restriction for `pattern`.
    pub fn new(
        pattern: &str,
        view: View,
        methods: Option<&[&str]>,
    ) -> Result<Self, DeclarationError> {
        let restrict = match methods {
            None => None,
            Some([]) => {
                return Err(DeclarationError::NoMethods {
                    pattern: pattern.to_string(),
                })
            }
            Some(names) => {
                let mut parsed: Vec<Method> = Vec::with_capacity(names.len());
                for name in names {
                    let method = parse_method(name).ok_or_else(|| {
                        DeclarationError::UnsupportedMethod {
                            pattern: pattern.to_string(),
                            method: (*name).to_string(),
                        }
                    })?;
                    if !parsed.contains(&method) {
                        parsed.push(method);
                    }
                }
                Some(parsed)
            }
        };

        view.validate()?;
        Ok(Self { view, restrict })
    }

    /// The view.
    #[must_use]
    pub fn view(&self) -> &View {
        &self.view
    }

    fn view_serves(&self, method: &Method) -> bool {
        match &self.view {
            View::Function(_) => true,
            View::Class(class) => {
                class.catch_all.is_some() || class.handlers.handler(method).is_some()
            }
        }
    }

    /// Verbs this route answers, in canonical order.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<Method> {
        SUPPORTED_METHODS
            .iter()
            .filter(|m| self.permits(m))
            .cloned()
            .collect()
    }

    /// Returns true if `method` reaches a handler.
    #[must_use]
    pub fn permits(&self, method: &Method) -> bool {
        let restricted_out = self
            .restrict
            .as_ref()
            .is_some_and(|allowed| !allowed.contains(method));
        !restricted_out && self.view_serves(method)
    }

    /// Picks the handler for `method`.
    #[must_use]
    pub fn resolve(&self, method: &Method) -> Resolution<'_> {
        if !self.permits(method) {
            return Resolution::NotAllowed(self.allowed_methods());
        }
        match &self.view {
            View::Function(handler) => Resolution::Handler(handler),
            View::Class(class) => match class
                .catch_all
                .as_ref()
                .or_else(|| class.handlers.handler(method))
            {
                Some(handler) => Resolution::Handler(handler),
                None => Resolution::NotAllowed(self.allowed_methods()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Text(&'static str);

    impl Callable for Text {
        fn name(&self) -> &str {
            self.0
        }
    }

    impl ViewHandler for Text {
        fn call(&self, _req: Request, mut res: Response) -> BoxFuture<'_, DispatchResult<Response>> {
            let text = self.0;
            Box::pin(async move {
                res.set_text(text);
                Ok(res)
            })
        }
    }

    async fn run(dispatcher: &RouteMethodDispatcher, method: Method) -> Result<String, Vec<Method>> {
        match dispatcher.resolve(&method) {
            Resolution::Handler(handler) => {
                let req = Request::builder().method(method).uri("/").build().unwrap();
                let res = handler.call(req, Response::new()).await.unwrap();
                Ok(res.text().unwrap_or_default().to_string())
            }
            Resolution::NotAllowed(allowed) => Err(allowed),
        }
    }

    #[tokio::test]
    async fn test_function_view_answers_every_verb() {
        let d = RouteMethodDispatcher::new("/", View::function(Text("index")), None).unwrap();
        assert_eq!(run(&d, Method::GET).await, Ok("index".to_string()));
        assert_eq!(run(&d, Method::DELETE).await, Ok("index".to_string()));
        assert_eq!(d.allowed_methods().len(), SUPPORTED_METHODS.len());
    }

    #[tokio::test]
    async fn test_restricted_function_view() {
        let d = RouteMethodDispatcher::new("/", Text("index").into(), Some(&["get", "POST"]))
            .unwrap();
        assert!(run(&d, Method::GET).await.is_ok());
        assert_eq!(
            run(&d, Method::PUT).await,
            Err(vec![Method::GET, Method::POST])
        );
    }

    #[tokio::test]
    async fn test_class_view_per_verb() {
        let class = ClassView::new("Items")
            .get(Text("get"))
            .on("pOsT", Text("post"));
        let d = RouteMethodDispatcher::new("/items", class.into(), None).unwrap();

        assert_eq!(run(&d, Method::GET).await, Ok("get".to_string()));
        assert_eq!(run(&d, Method::POST).await, Ok("post".to_string()));
        assert_eq!(
            run(&d, Method::DELETE).await,
            Err(vec![Method::GET, Method::POST])
        );
    }

    #[tokio::test]
    async fn test_catch_all_wins_over_verb_handlers() {
        let class = ClassView::new("Everything")
            .get(Text("get"))
            .handle(Text("handle"));
        let d = RouteMethodDispatcher::new("/", class.into(), None).unwrap();

        assert_eq!(run(&d, Method::GET).await, Ok("handle".to_string()));
        assert_eq!(run(&d, Method::PATCH).await, Ok("handle".to_string()));
    }

    #[tokio::test]
    async fn test_route_restriction_applies_before_catch_all() {
        let class = ClassView::new("Everything").handle(Text("handle"));
        let d = RouteMethodDispatcher::new("/", class.into(), Some(&["get"])).unwrap();
        assert_eq!(run(&d, Method::PUT).await, Err(vec![Method::GET]));
    }

    #[tokio::test]
    async fn test_offloaded_blocking_view_runs() {
        let blocking = blocking_view("report", |_req, mut res: Response| {
            res.set_text("slow");
            Ok(res)
        });
        let d = RouteMethodDispatcher::new("/", View::function(blocking.offload()), None).unwrap();
        assert_eq!(run(&d, Method::GET).await, Ok("slow".to_string()));
    }

    #[test]
    fn test_blocking_view_rejected() {
        let blocking = blocking_view("report", |_req, res| Ok(res));
        let err = RouteMethodDispatcher::new("/", View::function(blocking), None).unwrap_err();
        assert!(matches!(err, DeclarationError::NotAsynchronous { ref name } if name == "report"));
    }

    #[test]
    fn test_blocking_class_method_rejected() {
        let class = ClassView::new("Reports").get(blocking_view("Reports.get", |_req, res| Ok(res)));
        let err = RouteMethodDispatcher::new("/", class.into(), None).unwrap_err();
        assert!(err.to_string().contains("'Reports.get' must be asynchronous"));
    }

    #[test]
    fn test_empty_class_view_rejected() {
        let err = RouteMethodDispatcher::new("/", ClassView::new("Nothing").into(), None).unwrap_err();
        assert!(matches!(err, DeclarationError::InvalidView { .. }));
    }

    #[test]
    fn test_unknown_verb_on_class_rejected() {
        let class = ClassView::new("Teapot").on("brew", Text("brew"));
        let err = class.validate().unwrap_err();
        assert!(err.to_string().contains("unsupported method 'brew'"));
    }

    #[test]
    fn test_route_methods_validated() {
        let err = RouteMethodDispatcher::new("/", Text("i").into(), Some(&[])).unwrap_err();
        assert!(matches!(err, DeclarationError::NoMethods { .. }));

        let err = RouteMethodDispatcher::new("/", Text("i").into(), Some(&["get", "fetch"]))
            .unwrap_err();
        assert!(matches!(err, DeclarationError::UnsupportedMethod { ref method, .. } if method == "fetch"));
    }
}
