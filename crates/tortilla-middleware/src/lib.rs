//! # Tortilla Middleware
//!
//! The layers that wrap a view during dispatch.
//!
//! - [`Middleware`]: before/after phases around the whole dispatch, nested
//!   by [`MiddlewareChain`] with the first-registered middleware outermost
//! - [`HookRegistry`]: before/after hooks attached to a route, a view or a
//!   single view method, run inside the innermost layer
//!
//! ```text
//! mw1.before → mw2.before → hooks.before → view → hooks.after → mw2.after → mw1.after
//! ```

#![doc(html_root_url = "https://docs.rs/tortilla-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chain;
pub mod hooks;
pub mod middleware;

pub use chain::{dispatch_fn, Dispatch, DispatchFn, MiddlewareChain};
pub use hooks::{blocking_hook, hook, BlockingFnHook, FnHook, Hook, HookRegistry, HookTarget, Phase};
pub use middleware::{Middleware, MiddlewareFactory};
