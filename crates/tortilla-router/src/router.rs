//! High-level router API.

use crate::node::Node;
use crate::pattern::{Pattern, PatternError};
use crate::RouteMatch;

/// A radix tree mapping route patterns to values of type `T`.
///
/// The router knows nothing about HTTP verbs; store a
/// [`MethodRouter`](crate::MethodRouter) (or anything else) as the value.
///
/// # Example
///
/// ```rust
/// use tortilla_router::Router;
///
/// let mut router = Router::new();
/// router.insert("/users", "list").unwrap();
/// router.insert("/users/{id}", "show").unwrap();
///
/// let matched = router.match_path("/users/42").unwrap();
/// assert_eq!(*matched.value, "show");
/// assert_eq!(matched.params.get("id"), Some("42"));
///
/// assert!(router.match_path("/posts").is_none());
/// ```
///
/// # Route priority
///
/// 1. static segments (`/users/me`)
/// 2. parameter segments (`/users/{id}`)
/// 3. catch-all segments (`/files/*path`)
///
/// A higher-priority branch that fails deeper in the tree falls back to the
/// next one.
#[derive(Debug, Clone)]
pub struct Router<T> {
    root: Node<T>,
    route_count: usize,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::root(),
            route_count: 0,
        }
    }

    /// Parses `pattern` and stores `value` under it.
    pub fn insert(&mut self, pattern: &str, value: T) -> Result<(), PatternError> {
        let pattern = Pattern::parse(pattern)?;
        self.insert_pattern(&pattern, value)
    }

    /// Stores `value` under an already parsed pattern.
    pub fn insert_pattern(&mut self, pattern: &Pattern, value: T) -> Result<(), PatternError> {
        self.root.insert(pattern, value)?;
        self.route_count += 1;
        Ok(())
    }

    /// Matches a request path.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<RouteMatch<'_, T>> {
        let (value, params) = self.root.match_path(path)?;
        Some(RouteMatch::new(value, params))
    }

    /// Every stored value, depth first.
    #[must_use]
    pub fn values(&self) -> Vec<&T> {
        let mut out = Vec::with_capacity(self.route_count);
        self.root.for_each_value(&mut |value| out.push(value));
        out
    }

    /// Number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.route_count
    }

    /// Returns true if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.route_count == 0
    }
}
