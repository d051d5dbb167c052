//! # Tortilla Core
//!
//! Request, response and error primitives shared by every Tortilla crate.
//!
//! - [`Request`] / [`Response`]: the values that flow through a dispatch
//! - [`Callable`] and [`check_async`]: the non-blocking contract every
//!   participant is validated against
//! - [`RouteMethodDispatcher`]: picks the handler a view provides for a verb
//! - [`ErrorResolver`]: maps raised errors to handlers by class lineage
//! - [`DispatchError`] / [`DeclarationError`]: the two error families

#![doc(html_root_url = "https://docs.rs/tortilla-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::future::Future;
use std::pin::Pin;

mod args;
mod callable;
mod error;
mod http;
mod resolver;
mod view;

pub use args::{HookArgs, Kwargs};
pub use callable::{check_async, run_blocking, Callable, Execution};
pub use error::{
    lineage_of, DeclarationError, DispatchError, DispatchResult, ErrorCategory, ErrorClass,
    HttpError, UnsupportedMediaType,
};
pub use self::http::{Content, Request, RequestBuilder, Response, APPLICATION_JSON, TEXT_HTML, TEXT_PLAIN};
pub use resolver::{
    error_handler, error_to_html, error_to_media, error_to_text, BlockingFnErrorHandler,
    DefaultErrorHandler, ErrorFormat, ErrorHandler, ErrorResolver, FnErrorHandler,
};
pub use view::{
    blocking_view, view, BlockingFnView, ClassView, FnView, Resolution, RouteMethodDispatcher,
    View, ViewHandler,
};

pub use tortilla_router::Params;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
