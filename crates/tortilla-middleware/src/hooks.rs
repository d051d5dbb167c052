//! Before/after hooks attached to routes, views and view methods.
//!
//! Hooks run inside the innermost dispatch layer, only once the verb is
//! known to be permitted. For a request served by a class view the order is:
//!
//! ```text
//! route.before → class.before → method.before
//!     → handler →
//! method.after → class.after → route.after
//! ```
//!
//! Within a level, before-hooks run in attach order and after-hooks in
//! reverse attach order.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use http::Method;
use tortilla_core::{
    check_async, run_blocking, BoxFuture, Callable, DeclarationError, DispatchResult, Execution,
    HookArgs, Params, Request, Response,
};
use tracing::debug;

/// A callable run before or after a view.
///
/// Receives the request, the current response, the path parameters and the
/// arguments bound at attach time, and returns the (possibly updated)
/// response. An error stops the remaining hooks of the phase.
pub trait Hook: Callable + Send + Sync + 'static {
    /// Runs the hook.
    fn call<'a>(
        &'a self,
        req: &'a Request,
        res: Response,
        args: &'a HookArgs,
    ) -> BoxFuture<'a, DispatchResult<Response>>;
}

/// A hook backed by an async function.
pub struct FnHook<F> {
    name: String,
    func: F,
}

impl<F> FnHook<F> {
    /// Wraps `func` under `name`.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Callable for FnHook<F> {
    fn name(&self) -> &str {
        &self.name
    }
}

impl<F, Fut> Hook for FnHook<F>
where
    F: Fn(Request, Response, Params, HookArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DispatchResult<Response>> + Send + 'static,
{
    fn call<'a>(
        &'a self,
        req: &'a Request,
        res: Response,
        args: &'a HookArgs,
    ) -> BoxFuture<'a, DispatchResult<Response>> {
        Box::pin((self.func)(req.clone(), res, req.params().clone(), args.clone()))
    }
}

/// A hook backed by a synchronous function. Refused unless offloaded.
pub struct BlockingFnHook<F> {
    name: String,
    func: Arc<F>,
    offloaded: bool,
}

impl<F> BlockingFnHook<F> {
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

impl<F> Callable for BlockingFnHook<F> {
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

impl<F> Hook for BlockingFnHook<F>
where
    F: Fn(Request, Response, Params, HookArgs) -> DispatchResult<Response> + Send + Sync + 'static,
{
    fn call<'a>(
        &'a self,
        req: &'a Request,
        res: Response,
        args: &'a HookArgs,
    ) -> BoxFuture<'a, DispatchResult<Response>> {
        let func = Arc::clone(&self.func);
        let (req, params, args) = (req.clone(), req.params().clone(), args.clone());
        Box::pin(async move { run_blocking(move || func(req, res, params, args)).await? })
    }
}

/// Shorthand for [`FnHook::new`].
pub fn hook<F, Fut>(name: impl Into<String>, func: F) -> FnHook<F>
where
    F: Fn(Request, Response, Params, HookArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DispatchResult<Response>> + Send + 'static,
{
    FnHook::new(name, func)
}

/// Shorthand for [`BlockingFnHook::new`].
pub fn blocking_hook<F>(name: impl Into<String>, func: F) -> BlockingFnHook<F>
where
    F: Fn(Request, Response, Params, HookArgs) -> DispatchResult<Response> + Send + Sync + 'static,
{
    BlockingFnHook::new(name, func)
}

/// When a hook runs relative to the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Before the view.
    Before,
    /// After the view.
    After,
}

impl Phase {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a hook is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HookTarget {
    /// Every verb of the route with this pattern.
    Route(String),
    /// Every verb served by the view with this name.
    View(String),
    /// One verb of a class view.
    Method {
        /// Class view name.
        view: String,
        /// The verb.
        method: Method,
    },
}

impl HookTarget {
    /// Targets a route by pattern.
    pub fn route(pattern: impl Into<String>) -> Self {
        Self::Route(pattern.into())
    }

    /// Targets a view by name.
    pub fn view(name: impl Into<String>) -> Self {
        Self::View(name.into())
    }

    /// Targets one verb of a class view.
    pub fn method(view: impl Into<String>, method: Method) -> Self {
        Self::Method {
            view: view.into(),
            method,
        }
    }
}

impl fmt::Display for HookTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Route(pattern) => write!(f, "route '{pattern}'"),
            Self::View(name) => write!(f, "view '{name}'"),
            Self::Method { view, method } => write!(f, "method '{view}.{method}'"),
        }
    }
}

/// A hook together with its bound arguments.
#[derive(Clone)]
struct BoundHook {
    hook: Arc<dyn Hook>,
    args: HookArgs,
}

#[derive(Clone, Default)]
struct Attached {
    before: Vec<BoundHook>,
    after: Vec<BoundHook>,
}

impl Attached {
    fn phase(&self, phase: Phase) -> &[BoundHook] {
        match phase {
            Phase::Before => &self.before,
            Phase::After => &self.after,
        }
    }
}

/// Hooks by target, frozen once the application is built.
///
/// # Example
///
/// ```rust
/// use tortilla_core::{HookArgs, Request, Response};
/// use tortilla_middleware::{hook, HookRegistry, HookTarget, Phase};
///
/// let mut hooks = HookRegistry::new();
/// hooks
///     .attach(
///         HookTarget::route("/items"),
///         Phase::After,
///         hook("tag", |_req, mut res: Response, _params, _args| async move {
///             res.set_text("tagged");
///             Ok(res)
///         }),
///         HookArgs::new(),
///     )
///     .unwrap();
///
/// # tokio_test::block_on(async {
/// let req = Request::builder().uri("/items").build().unwrap();
/// let res = hooks
///     .run(Phase::After, &[HookTarget::route("/items")], &req, Response::new())
///     .await
///     .unwrap();
/// assert_eq!(res.text(), Some("tagged"));
/// # });
/// ```
#[derive(Clone, Default)]
pub struct HookRegistry {
    attached: HashMap<HookTarget, Attached>,
}

impl HookRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `hook` to `target` for `phase`, binding `args`.
    pub fn attach(
        &mut self,
        target: HookTarget,
        phase: Phase,
        hook: impl Hook,
        args: HookArgs,
    ) -> Result<(), DeclarationError> {
        check_async(&hook)?;
        debug!(hook = hook.name(), %target, %phase, "attached hook");

        let bound = BoundHook {
            hook: Arc::new(hook),
            args,
        };
        let attached = self.attached.entry(target).or_default();
        match phase {
            Phase::Before => attached.before.push(bound),
            Phase::After => attached.after.push(bound),
        }
        Ok(())
    }

    /// Every target with at least one hook.
    pub fn targets(&self) -> impl Iterator<Item = &HookTarget> {
        self.attached.keys()
    }

    /// Number of hooks attached to `target` for `phase`.
    #[must_use]
    pub fn count(&self, target: &HookTarget, phase: Phase) -> usize {
        self.attached
            .get(target)
            .map_or(0, |attached| attached.phase(phase).len())
    }

    /// Returns true if no hooks are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attached.is_empty()
    }

    /// Hooks to run for `phase`, given `targets` from outermost to innermost.
    fn ordered<'a>(&'a self, phase: Phase, targets: &[HookTarget]) -> Vec<&'a BoundHook> {
        let levels = targets.iter().filter_map(|target| self.attached.get(target));
        match phase {
            Phase::Before => levels.flat_map(|a| a.before.iter()).collect(),
            Phase::After => {
                let levels: Vec<&Attached> = levels.collect();
                levels
                    .into_iter()
                    .rev()
                    .flat_map(|a| a.after.iter().rev())
                    .collect()
            }
        }
    }

    /// Runs the `phase` hooks of `targets`, threading the response through.
    ///
    /// `targets` lists the levels outermost first: route, view, then method.
    pub async fn run(
        &self,
        phase: Phase,
        targets: &[HookTarget],
        req: &Request,
        mut res: Response,
    ) -> DispatchResult<Response> {
        for bound in self.ordered(phase, targets) {
            res = bound.hook.call(req, res, &bound.args).await?;
        }
        Ok(res)
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (target, attached) in &self.attached {
            let names = |hooks: &[BoundHook]| -> Vec<String> {
                hooks.iter().map(|b| b.hook.name().to_string()).collect()
            };
            map.entry(
                &target.to_string(),
                &(names(&attached.before), names(&attached.after)),
            );
        }
        map.finish()
    }
}
