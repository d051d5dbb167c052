//! Extra arguments bound at registration time.
//!
//! Middleware constructors receive [`Kwargs`]; hooks receive [`HookArgs`]
//! (positional and named values) on every invocation.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::DeclarationError;

/// Named arguments passed to a middleware constructor.
///
/// ```rust
/// use tortilla_core::Kwargs;
///
/// let kwargs = Kwargs::new().with("header", "x-served-by").with("limit", 10);
/// assert_eq!(kwargs.get_str("header"), Some("x-served-by"));
/// assert_eq!(kwargs.require::<u32>("timing", "limit").unwrap(), 10);
/// assert!(kwargs.require::<u32>("timing", "missing").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kwargs(Map<String, Value>);

impl Kwargs {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an argument.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds or replaces an argument.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Raw value of an argument.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value of an argument.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Deserializes an optional argument.
    pub fn optional<T: DeserializeOwned>(
        &self,
        middleware: &str,
        key: &str,
    ) -> Result<Option<T>, DeclarationError> {
        self.0
            .get(key)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|e| DeclarationError::InvalidArgument {
                    middleware: middleware.to_string(),
                    reason: format!("argument '{key}': {e}"),
                })
            })
            .transpose()
    }

    /// Deserializes a mandatory argument.
    pub fn require<T: DeserializeOwned>(
        &self,
        middleware: &str,
        key: &str,
    ) -> Result<T, DeclarationError> {
        self.optional(middleware, key)?
            .ok_or_else(|| DeclarationError::InvalidArgument {
                middleware: middleware.to_string(),
                reason: format!("missing argument '{key}'"),
            })
    }

    /// Number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the arguments.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for Kwargs {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Kwargs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Positional and named values bound to a hook.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookArgs {
    positional: Vec<Value>,
    named: Kwargs,
}

impl HookArgs {
    /// No extra arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional value.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Adds a named value.
    #[must_use]
    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(key, value);
        self
    }

    /// Positional value at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    /// Named value for `key`.
    #[must_use]
    pub fn named(&self, key: &str) -> Option<&Value> {
        self.named.get(key)
    }

    /// All positional values.
    #[must_use]
    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    /// All named values.
    #[must_use]
    pub fn kwargs(&self) -> &Kwargs {
        &self.named
    }
}
