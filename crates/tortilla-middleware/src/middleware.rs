//! The [`Middleware`] trait.
//!
//! A middleware contributes two optional phases around the rest of the
//! chain. `before_dispatch` may answer the request itself; `after_dispatch`
//! sees whatever response came back, whether from the view, an inner
//! middleware or its own short-circuit.
//!
//! # Example
//!
//! ```rust
//! use http::{HeaderValue, StatusCode};
//! use tortilla_core::{BoxFuture, Callable, DispatchResult, Request, Response};
//! use tortilla_middleware::Middleware;
//!
//! struct Maintenance;
//!
//! impl Callable for Maintenance {
//!     fn name(&self) -> &str {
//!         "maintenance"
//!     }
//! }
//!
//! impl Middleware for Maintenance {
//!     fn before_dispatch<'a>(
//!         &'a self,
//!         _req: &'a Request,
//!     ) -> BoxFuture<'a, DispatchResult<Option<Response>>> {
//!         Box::pin(async {
//!             let mut res = Response::new();
//!             res.set_status(StatusCode::SERVICE_UNAVAILABLE);
//!             res.set_text("back soon");
//!             Ok(Some(res))
//!         })
//!     }
//!
//!     fn after_dispatch<'a>(
//!         &'a self,
//!         _req: &'a Request,
//!         mut res: Response,
//!     ) -> BoxFuture<'a, DispatchResult<Response>> {
//!         Box::pin(async move {
//!             res.set_header(
//!                 http::header::RETRY_AFTER,
//!                 HeaderValue::from_static("120"),
//!             );
//!             Ok(res)
//!         })
//!     }
//! }
//! ```

use std::sync::Arc;

use tortilla_core::{BoxFuture, Callable, DeclarationError, DispatchResult, Kwargs, Request, Response};

/// A before/after wrapper around the rest of the dispatch.
///
/// Instances are built once per application and shared by every request;
/// per-request state belongs in the request or response, never on `self`.
///
/// Both phases default to pass-through. An error from either phase aborts
/// the remaining chain and is resolved by the application's error handlers.
pub trait Middleware: Callable + Send + Sync + 'static {
    /// Runs before the inner dispatcher. Returning a response skips it.
    fn before_dispatch<'a>(
        &'a self,
        _req: &'a Request,
    ) -> BoxFuture<'a, DispatchResult<Option<Response>>> {
        Box::pin(std::future::ready(Ok(None)))
    }

    /// Runs on the response on the way out.
    fn after_dispatch<'a>(
        &'a self,
        _req: &'a Request,
        res: Response,
    ) -> BoxFuture<'a, DispatchResult<Response>> {
        Box::pin(std::future::ready(Ok(res)))
    }
}

/// Builds a middleware from its registration arguments.
///
/// Implemented for every `Fn(&Kwargs) -> Result<M, DeclarationError>`, so
/// a constructor function or closure can be registered directly.
pub trait MiddlewareFactory: Send + Sync + 'static {
    /// Constructs the middleware.
    fn build(&self, kwargs: &Kwargs) -> Result<Arc<dyn Middleware>, DeclarationError>;
}

impl<F, M> MiddlewareFactory for F
where
    F: Fn(&Kwargs) -> Result<M, DeclarationError> + Send + Sync + 'static,
    M: Middleware,
{
    fn build(&self, kwargs: &Kwargs) -> Result<Arc<dyn Middleware>, DeclarationError> {
        Ok(Arc::new(self(kwargs)?))
    }
}
