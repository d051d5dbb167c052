//! Nesting middleware around an inner dispatcher.
//!
//! ```text
//! A.before → B.before → inner → B.after → A.after
//! ```
//!
//! The chain is assembled once, back to front, and reused for every
//! request.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tortilla_core::{BoxFuture, DispatchResult, Request, Response};
use tracing::trace;

use crate::middleware::Middleware;

/// Anything that turns a request into a response.
pub trait Dispatch: Send + Sync + 'static {
    /// Handles `req`.
    fn dispatch(&self, req: Request) -> BoxFuture<'_, DispatchResult<Response>>;
}

/// A dispatcher backed by an async function.
pub struct DispatchFn<F>(F);

/// Wraps `f` as a [`Dispatch`].
pub fn dispatch_fn<F, Fut>(f: F) -> DispatchFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DispatchResult<Response>> + Send + 'static,
{
    DispatchFn(f)
}

impl<F, Fut> Dispatch for DispatchFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DispatchResult<Response>> + Send + 'static,
{
    fn dispatch(&self, req: Request) -> BoxFuture<'_, DispatchResult<Response>> {
        Box::pin((self.0)(req))
    }
}

/// One middleware in front of the rest of the chain.
struct Layer {
    middleware: Arc<dyn Middleware>,
    next: Arc<dyn Dispatch>,
}

impl Dispatch for Layer {
    fn dispatch(&self, req: Request) -> BoxFuture<'_, DispatchResult<Response>> {
        Box::pin(async move {
            let res = match self.middleware.before_dispatch(&req).await? {
                Some(res) => {
                    trace!(middleware = self.middleware.name(), "short-circuited dispatch");
                    res
                }
                None => self.next.dispatch(req.clone()).await?,
            };
            self.middleware.after_dispatch(&req, res).await
        })
    }
}

/// Middleware wrapped around an inner dispatcher, first-registered outermost.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use tortilla_core::{Request, Response};
/// use tortilla_middleware::{dispatch_fn, Dispatch, MiddlewareChain};
///
/// let inner = Arc::new(dispatch_fn(|_req: Request| async {
///     let mut res = Response::new();
///     res.set_text("hello");
///     Ok(res)
/// }));
/// let chain = MiddlewareChain::build(inner, &[]);
/// assert!(chain.is_empty());
///
/// # tokio_test::block_on(async {
/// let req = Request::builder().uri("/").build().unwrap();
/// let res = chain.dispatch(req).await.unwrap();
/// assert_eq!(res.text(), Some("hello"));
/// # });
/// ```
#[derive(Clone)]
pub struct MiddlewareChain {
    entry: Arc<dyn Dispatch>,
    names: Vec<String>,
}

impl MiddlewareChain {
    /// Wraps `inner` with `middleware`, in registration order.
    pub fn build(inner: Arc<dyn Dispatch>, middleware: &[Arc<dyn Middleware>]) -> Self {
        let mut entry = inner;
        for mw in middleware.iter().rev() {
            entry = Arc::new(Layer {
                middleware: Arc::clone(mw),
                next: entry,
            });
        }

        Self {
            entry,
            names: middleware.iter().map(|mw| mw.name().to_string()).collect(),
        }
    }

    /// Middleware names, outermost first.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of middleware layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if there are no layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Dispatch for MiddlewareChain {
    fn dispatch(&self, req: Request) -> BoxFuture<'_, DispatchResult<Response>> {
        self.entry.dispatch(req)
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("middleware", &self.names)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Mutex;
    use tortilla_core::{Callable, DispatchError, HttpError};

    type Log = Arc<Mutex<Vec<String>>>;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Fail {
        Never,
        Before,
        After,
    }

    struct Recorder {
        label: String,
        log: Log,
        short_circuit: bool,
        fail: Fail,
    }

    impl Recorder {
        fn new(label: &str, log: &Log) -> Self {
            Self {
                label: label.to_string(),
                log: Arc::clone(log),
                short_circuit: false,
                fail: Fail::Never,
            }
        }

        fn push(&self, phase: &str) {
            self.log.lock().unwrap().push(format!("{}.{phase}", self.label));
        }
    }

    impl Callable for Recorder {
        fn name(&self) -> &str {
            &self.label
        }
    }

    impl Middleware for Recorder {
        fn before_dispatch<'a>(
            &'a self,
            _req: &'a Request,
        ) -> BoxFuture<'a, DispatchResult<Option<Response>>> {
            Box::pin(async move {
                tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                self.push("before");
                if self.fail == Fail::Before {
                    return Err(DispatchError::from(HttpError::unauthorized()));
                }
                if self.short_circuit {
                    let mut res = Response::new();
                    res.set_text(format!("from {}", self.label));
                    return Ok(Some(res));
                }
                Ok(None)
            })
        }

        fn after_dispatch<'a>(
            &'a self,
            _req: &'a Request,
            res: Response,
        ) -> BoxFuture<'a, DispatchResult<Response>> {
            Box::pin(async move {
                self.push("after");
                if self.fail == Fail::After {
                    return Err(DispatchError::from(HttpError::conflict()));
                }
                Ok(res)
            })
        }
    }

    fn view(log: &Log) -> Arc<dyn Dispatch> {
        let log = Arc::clone(log);
        Arc::new(dispatch_fn(move |_req| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push("view".to_string());
                let mut res = Response::new();
                res.set_text("view");
                Ok(res)
            }
        }))
    }

    fn req() -> Request {
        Request::builder().uri("/").build().unwrap()
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_nesting_order() {
        let log = Log::default();
        let chain = MiddlewareChain::build(
            view(&log),
            &[
                Arc::new(Recorder::new("a", &log)),
                Arc::new(Recorder::new("b", &log)),
            ],
        );

        let res = chain.dispatch(req()).await.unwrap();
        assert_eq!(res.text(), Some("view"));
        assert_eq!(
            entries(&log),
            vec!["a.before", "b.before", "view", "b.after", "a.after"]
        );
        assert_eq!(chain.names(), ["a", "b"]);
    }

    #[tokio::test]
    async fn test_short_circuit_skips_inner_but_unwinds_entered() {
        let log = Log::default();
        let mut b = Recorder::new("b", &log);
        b.short_circuit = true;
        let chain = MiddlewareChain::build(
            view(&log),
            &[
                Arc::new(Recorder::new("a", &log)),
                Arc::new(b),
                Arc::new(Recorder::new("c", &log)),
            ],
        );

        let res = chain.dispatch(req()).await.unwrap();
        assert_eq!(res.text(), Some("from b"));
        assert_eq!(
            entries(&log),
            vec!["a.before", "b.before", "b.after", "a.after"]
        );
    }

    #[tokio::test]
    async fn test_before_error_aborts_chain() {
        let log = Log::default();
        let mut b = Recorder::new("b", &log);
        b.fail = Fail::Before;
        let chain = MiddlewareChain::build(
            view(&log),
            &[Arc::new(Recorder::new("a", &log)), Arc::new(b)],
        );

        let err = chain.dispatch(req()).await.unwrap_err();
        assert_eq!(err.status(), http::StatusCode::UNAUTHORIZED);
        assert_eq!(entries(&log), vec!["a.before", "b.before"]);
    }

    #[tokio::test]
    async fn test_after_error_aborts_remaining_unwind() {
        let log = Log::default();
        let mut b = Recorder::new("b", &log);
        b.fail = Fail::After;
        let chain = MiddlewareChain::build(
            view(&log),
            &[Arc::new(Recorder::new("a", &log)), Arc::new(b)],
        );

        let err = chain.dispatch(req()).await.unwrap_err();
        assert!(err.is::<HttpError>());
        assert_eq!(entries(&log), vec!["a.before", "b.before", "view", "b.after"]);
    }

    #[tokio::test]
    async fn test_empty_chain_is_inner() {
        let log = Log::default();
        let chain = MiddlewareChain::build(view(&log), &[]);
        chain.dispatch(req()).await.unwrap();
        assert_eq!(entries(&log), vec!["view"]);
    }

    proptest! {
        #[test]
        fn prop_before_in_order_after_in_reverse(count in 0usize..8) {
            let log = Log::default();
            let labels: Vec<String> = (0..count).map(|i| format!("m{i}")).collect();
            let middleware: Vec<Arc<dyn Middleware>> = labels
                .iter()
                .map(|label| Arc::new(Recorder::new(label, &log)) as Arc<dyn Middleware>)
                .collect();
            let chain = MiddlewareChain::build(view(&log), &middleware);

            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();
            rt.block_on(chain.dispatch(req())).unwrap();

            let mut expected: Vec<String> = labels.iter().map(|l| format!("{l}.before")).collect();
            expected.push("view".to_string());
            expected.extend(labels.iter().rev().map(|l| format!("{l}.after")));
            prop_assert_eq!(entries(&log), expected);
        }
    }
}
