//! Radix tree router for Tortilla.
//!
//! Maps route patterns to arbitrary values and captures path parameters on
//! match. Verb dispatch is layered on top with [`MethodRouter`], which the
//! core crate uses to hold per-verb view handlers.
//!
//! # Example
//!
//! ```rust
//! use http::Method;
//! use tortilla_router::{MethodRouter, Router};
//!
//! let mut router = Router::new();
//! router.insert("/users", MethodRouter::new().get("list").post("create")).unwrap();
//! router.insert("/users/{id}", MethodRouter::new().get("show")).unwrap();
//! router.insert("/files/*path", MethodRouter::new().get("serve")).unwrap();
//!
//! let matched = router.match_path("/users/123").unwrap();
//! assert_eq!(matched.value.handler(&Method::GET), Some(&"show"));
//! assert_eq!(matched.params.get("id"), Some("123"));
//! assert_eq!(matched.value.allowed(), vec![Method::GET]);
//! ```
//!
//! # Layout
//!
//! ```text
//!                    (root)
//!                      │
//!              ┌───────┴───────┐
//!            "users"        "files"
//!              │               │
//!        ┌─────┴─────┐      "*path"
//!      (leaf)      "{id}"
//!                    │
//!                  (leaf)
//! ```

mod method_router;
mod node;
mod params;
mod pattern;
mod router;

pub use method_router::{parse_method, MethodRouter, SUPPORTED_METHODS};
pub use node::{Node, SegmentKind};
pub use params::Params;
pub use pattern::{Pattern, PatternError, Segment};
pub use router::Router;

/// A matched route: the stored value and the captured parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a, T> {
    /// Value stored for the matched pattern.
    pub value: &'a T,
    /// Captured path parameters.
    pub params: Params,
}

impl<'a, T> RouteMatch<'a, T> {
    /// Creates a new route match.
    #[must_use]
    pub fn new(value: &'a T, params: Params) -> Self {
        Self { value, params }
    }
}
