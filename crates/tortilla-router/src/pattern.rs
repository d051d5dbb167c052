//! Route pattern parsing and validation.
//!
//! Patterns are validated once, when a route is declared. A pattern that
//! passes [`Pattern::parse`] is guaranteed to be insertable into a
//! [`Router`](crate::Router) as far as its own shape is concerned; conflicts
//! with other routes are reported by the router itself.
//!
//! # Syntax
//!
//! ```text
//! /                       root
//! /users                  static segment
//! /users/{id}             named parameter
//! /files/*path            catch-all, must be the last segment
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Errors raised while parsing or registering a route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// The pattern does not begin with `/`.
    #[error("route pattern '{pattern}' must start with '/'")]
    NotAbsolute {
        /// The offending pattern.
        pattern: String,
    },

    /// A segment is malformed (unbalanced braces, empty name, bad characters).
    #[error("route pattern '{pattern}' has an invalid segment '{segment}': {reason}")]
    InvalidSegment {
        /// The offending pattern.
        pattern: String,
        /// The offending segment.
        segment: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The same parameter name appears twice.
    #[error("route pattern '{pattern}' declares parameter '{name}' more than once")]
    DuplicateParam {
        /// The offending pattern.
        pattern: String,
        /// The repeated parameter name.
        name: String,
    },

    /// A catch-all segment is followed by more segments.
    #[error("route pattern '{pattern}': catch-all segment must be the last segment")]
    WildcardNotLast {
        /// The offending pattern.
        pattern: String,
    },

    /// Another route already occupies this pattern.
    #[error("route pattern '{pattern}' is already registered")]
    Duplicate {
        /// The offending pattern.
        pattern: String,
    },

    /// The pattern names a parameter differently from an existing route at the same position.
    #[error("route pattern '{pattern}' conflicts with parameter '{existing}' of an existing route")]
    ConflictingParam {
        /// The offending pattern.
        pattern: String,
        /// The name already used at that position.
        existing: String,
    },
}

/// One parsed segment of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Literal text that must match exactly.
    Static(String),
    /// A single-segment parameter, `{name}`.
    Param(String),
    /// A catch-all parameter, `*name`, consuming the rest of the path.
    Wildcard(String),
}

impl Segment {
    /// Returns the parameter name for param and wildcard segments.
    #[must_use]
    pub fn param_name(&self) -> Option<&str> {
        match self {
            Self::Static(_) => None,
            Self::Param(name) | Self::Wildcard(name) => Some(name),
        }
    }
}

/// A validated route pattern.
///
/// # Example
///
/// ```rust
/// use tortilla_router::Pattern;
///
/// let pattern = Pattern::parse("/users/{id}/files/*path").unwrap();
/// assert_eq!(pattern.param_names().collect::<Vec<_>>(), vec!["id", "path"]);
///
/// assert!(Pattern::parse("users").is_err());
/// assert!(Pattern::parse("/users/{id").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

fn identifier() -> &'static Regex {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"))
}

impl Pattern {
    /// Parses and validates a route pattern.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        if !raw.starts_with('/') {
            return Err(PatternError::NotAbsolute {
                pattern: raw.to_string(),
            });
        }

        let invalid = |segment: &str, reason: &'static str| PatternError::InvalidSegment {
            pattern: raw.to_string(),
            segment: segment.to_string(),
            reason,
        };

        let parts: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
        let mut segments = Vec::with_capacity(parts.len());
        let mut seen = HashSet::new();

        for (index, part) in parts.iter().enumerate() {
            let segment = if let Some(inner) = part.strip_prefix('{') {
                let name = inner
                    .strip_suffix('}')
                    .ok_or_else(|| invalid(part, "unbalanced braces"))?;
                if !identifier().is_match(name) {
                    return Err(invalid(part, "parameter name must be an identifier"));
                }
                Segment::Param(name.to_string())
            } else if let Some(name) = part.strip_prefix('*') {
                if !identifier().is_match(name) {
                    return Err(invalid(part, "catch-all name must be an identifier"));
                }
                if index + 1 != parts.len() {
                    return Err(PatternError::WildcardNotLast {
                        pattern: raw.to_string(),
                    });
                }
                Segment::Wildcard(name.to_string())
            } else {
                if part.contains(['{', '}']) {
                    return Err(invalid(part, "braces are only allowed around a whole segment"));
                }
                Segment::Static((*part).to_string())
            };

            if let Some(name) = segment.param_name() {
                if !seen.insert(name.to_string()) {
                    return Err(PatternError::DuplicateParam {
                        pattern: raw.to_string(),
                        name: name.to_string(),
                    });
                }
            }
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The pattern as written at declaration.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The pattern rebuilt from its segments, without empty or trailing
    /// separators. `/items/` and `/items` share the form `/items`.
    #[must_use]
    pub fn canonical(&self) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        let mut out = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Static(text) => out.push_str(text),
                Segment::Param(name) => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
                Segment::Wildcard(name) => {
                    out.push('*');
                    out.push_str(name);
                }
            }
        }
        out
    }

    /// The parsed segments, root excluded.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names of every parameter in declaration order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(Segment::param_name)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
