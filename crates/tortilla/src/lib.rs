//! # Tortilla
//!
//! An asynchronous request dispatch pipeline. For every request it composes
//! registered middleware, before/after hooks, per-verb view resolution and
//! error-handler resolution into one ordered execution.
//!
//! ```text
//! Request → Middleware A → Middleware B → before hooks → view
//!                                                          ↓
//! Response ← Middleware A ← Middleware B ← after hooks ←──┘
//! ```
//!
//! Every participant must be non-blocking; blocking callables are rejected
//! when they are declared. Wrap synchronous work with `.offload()` to run
//! it on the blocking pool.
//!
//! ## Quick start
//!
//! ```rust
//! use bytes::Bytes;
//! use tortilla::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let mut app = App::new();
//! app.route_with_methods("/", &["GET"], view("index", |_req, mut res: Response| async move {
//!     res.set_text("hola");
//!     Ok(res)
//! }))
//! .unwrap();
//!
//! let pipeline = app.build().unwrap();
//!
//! let res = pipeline.handle(http::Request::get("/").body(Bytes::new()).unwrap()).await;
//! assert_eq!(res.status(), 200);
//!
//! let res = pipeline.handle(http::Request::put("/").body(Bytes::new()).unwrap()).await;
//! assert_eq!(res.status(), 405);
//! assert_eq!(res.headers()["allow"], "GET");
//! # });
//! ```
//!
//! ## Configuration and telemetry
//!
//! ```rust,ignore
//! let config = tortilla::config::ConfigLoader::new()
//!     .with_optional_file("tortilla.toml")?
//!     .with_env_prefix("TORTILLA")
//!     .load()?;
//! tortilla::telemetry::init_telemetry(&config.telemetry.to_telemetry_config())?;
//! let app = tortilla::App::from_config(&config.app)?;
//! ```

#![doc(html_root_url = "https://docs.rs/tortilla/0.1.0")]

mod app;
mod pipeline;
mod route;

pub use app::App;
pub use pipeline::DispatchPipeline;
pub use route::RouteInfo;

pub use tortilla_config as config;
pub use tortilla_core as core;
pub use tortilla_middleware as middleware;
pub use tortilla_router as router;
pub use tortilla_telemetry as telemetry;

pub use tortilla_core::{
    blocking_view, error_handler, error_to_html, error_to_media, error_to_text, run_blocking, view,
    BlockingFnErrorHandler, BlockingFnView, Callable, ClassView, DeclarationError, DispatchError,
    DispatchResult, ErrorCategory, ErrorClass, ErrorFormat, ErrorHandler, Execution, FnErrorHandler,
    FnView, HookArgs, HttpError, Kwargs, Params, Request, Response, UnsupportedMediaType, View,
    ViewHandler,
};
pub use tortilla_middleware::{
    blocking_hook, hook, BlockingFnHook, FnHook, Hook, HookTarget, Middleware, MiddlewareFactory,
    Phase,
};

/// Common imports for declaring an application.
///
/// ```rust
/// use tortilla::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{App, DispatchPipeline, RouteInfo};
    pub use tortilla_core::{
        error_handler, view, BoxFuture, Callable, ClassView, DeclarationError, DispatchError,
        DispatchResult, ErrorClass, ErrorFormat, HookArgs, HttpError, Kwargs, Params, Request,
        Response,
    };
    pub use tortilla_middleware::{hook, Hook, HookTarget, Middleware};
}
