//! Per-verb handler table for a single route.

use http::Method;

/// Verbs a [`MethodRouter`] can hold, in the order they are reported.
pub const SUPPORTED_METHODS: [Method; 9] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
    Method::TRACE,
    Method::CONNECT,
];

/// Parses a verb name case-insensitively.
///
/// Returns `None` for anything outside [`SUPPORTED_METHODS`].
///
/// ```rust
/// use http::Method;
/// use tortilla_router::parse_method;
///
/// assert_eq!(parse_method("get"), Some(Method::GET));
/// assert_eq!(parse_method("Patch"), Some(Method::PATCH));
/// assert_eq!(parse_method("brew"), None);
/// ```
#[must_use]
pub fn parse_method(name: &str) -> Option<Method> {
    SUPPORTED_METHODS
        .iter()
        .find(|m| m.as_str().eq_ignore_ascii_case(name))
        .cloned()
}

/// Maps HTTP verbs to handlers of type `T`.
///
/// # Example
///
/// ```rust
/// use http::Method;
/// use tortilla_router::MethodRouter;
///
/// let methods = MethodRouter::new().get("list").post("create");
///
/// assert_eq!(methods.handler(&Method::GET), Some(&"list"));
/// assert_eq!(methods.handler(&Method::DELETE), None);
/// assert_eq!(methods.allowed(), vec![Method::GET, Method::POST]);
/// ```
#[derive(Debug, Clone)]
pub struct MethodRouter<T> {
    get: Option<T>,
    head: Option<T>,
    post: Option<T>,
    put: Option<T>,
    patch: Option<T>,
    delete: Option<T>,
    options: Option<T>,
    trace: Option<T>,
    connect: Option<T>,
}

impl<T> Default for MethodRouter<T> {
    fn default() -> Self {
        Self {
            get: None,
            head: None,
            post: None,
            put: None,
            patch: None,
            delete: None,
            options: None,
            trace: None,
            connect: None,
        }
    }
}

impl<T> MethodRouter<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the GET handler.
    #[must_use]
    pub fn get(mut self, handler: T) -> Self {
        self.get = Some(handler);
        self
    }

    /// Sets the HEAD handler.
    #[must_use]
    pub fn head(mut self, handler: T) -> Self {
        self.head = Some(handler);
        self
    }

    /// Sets the POST handler.
    #[must_use]
    pub fn post(mut self, handler: T) -> Self {
        self.post = Some(handler);
        self
    }

    /// Sets the PUT handler.
    #[must_use]
    pub fn put(mut self, handler: T) -> Self {
        self.put = Some(handler);
        self
    }

    /// Sets the PATCH handler.
    #[must_use]
    pub fn patch(mut self, handler: T) -> Self {
        self.patch = Some(handler);
        self
    }

    /// Sets the DELETE handler.
    #[must_use]
    pub fn delete(mut self, handler: T) -> Self {
        self.delete = Some(handler);
        self
    }

    /// Sets the OPTIONS handler.
    #[must_use]
    pub fn options(mut self, handler: T) -> Self {
        self.options = Some(handler);
        self
    }

    fn slot_mut(&mut self, method: &Method) -> Option<&mut Option<T>> {
        match *method {
            Method::GET => Some(&mut self.get),
            Method::HEAD => Some(&mut self.head),
            Method::POST => Some(&mut self.post),
            Method::PUT => Some(&mut self.put),
            Method::PATCH => Some(&mut self.patch),
            Method::DELETE => Some(&mut self.delete),
            Method::OPTIONS => Some(&mut self.options),
            Method::TRACE => Some(&mut self.trace),
            Method::CONNECT => Some(&mut self.connect),
            _ => None,
        }
    }

    fn slot(&self, method: &Method) -> Option<&Option<T>> {
        match *method {
            Method::GET => Some(&self.get),
            Method::HEAD => Some(&self.head),
            Method::POST => Some(&self.post),
            Method::PUT => Some(&self.put),
            Method::PATCH => Some(&self.patch),
            Method::DELETE => Some(&self.delete),
            Method::OPTIONS => Some(&self.options),
            Method::TRACE => Some(&self.trace),
            Method::CONNECT => Some(&self.connect),
            _ => None,
        }
    }

    /// Stores `handler` for `method`, returning the handler it replaced.
    ///
    /// Extension verbs are refused and handed back as `Err`.
    pub fn insert(&mut self, method: &Method, handler: T) -> Result<Option<T>, T> {
        match self.slot_mut(method) {
            Some(slot) => Ok(slot.replace(handler)),
            None => Err(handler),
        }
    }

    /// Handler for `method`, if one is set.
    #[must_use]
    pub fn handler(&self, method: &Method) -> Option<&T> {
        self.slot(method).and_then(Option::as_ref)
    }

    /// Verbs with a handler, in [`SUPPORTED_METHODS`] order.
    #[must_use]
    pub fn allowed(&self) -> Vec<Method> {
        SUPPORTED_METHODS
            .iter()
            .filter(|m| self.handler(m).is_some())
            .cloned()
            .collect()
    }

    /// Returns true if no verb has a handler.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        SUPPORTED_METHODS.iter().all(|m| self.handler(m).is_none())
    }

    /// Moves handlers from `other` into verbs that are still empty here.
    pub fn merge(&mut self, other: Self) {
        let Self {
            get,
            head,
            post,
            put,
            patch,
            delete,
            options,
            trace,
            connect,
        } = other;
        for (mine, theirs) in [
            (&mut self.get, get),
            (&mut self.head, head),
            (&mut self.post, post),
            (&mut self.put, put),
            (&mut self.patch, patch),
            (&mut self.delete, delete),
            (&mut self.options, options),
            (&mut self.trace, trace),
            (&mut self.connect, connect),
        ] {
            if mine.is_none() {
                *mine = theirs;
            }
        }
    }
}
