//! Radix tree node.
//!
//! Each node owns one path segment. Matching prefers static children, then the
//! parameter child, then the catch-all, and backtracks when a preferred branch
//! dead-ends further down.

use crate::params::Params;
use crate::pattern::{Pattern, PatternError, Segment};

/// Kind of segment a node represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Literal segment.
    Static,
    /// Named single-segment parameter.
    Param(String),
    /// Catch-all for the remainder of the path.
    Wildcard(String),
}

/// A node in the radix tree, carrying an optional value of type `T`.
#[derive(Debug, Clone)]
pub struct Node<T> {
    segment: String,
    kind: SegmentKind,
    value: Option<T>,
    /// Sorted by segment for binary search.
    static_children: Vec<Node<T>>,
    param_child: Option<Box<Node<T>>>,
    wildcard_child: Option<Box<Node<T>>>,
}

impl<T> Node<T> {
    fn with_kind(segment: String, kind: SegmentKind) -> Self {
        Self {
            segment,
            kind,
            value: None,
            static_children: Vec::new(),
            param_child: None,
            wildcard_child: None,
        }
    }

    /// Creates the root of a tree.
    #[must_use]
    pub fn root() -> Self {
        Self::with_kind(String::new(), SegmentKind::Static)
    }

    /// The segment text as written in the pattern.
    #[must_use]
    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// The kind of segment.
    #[must_use]
    pub fn kind(&self) -> &SegmentKind {
        &self.kind
    }

    /// Value stored at this node, if a route ends here.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Stores `value` at the node addressed by `pattern`.
    ///
    /// Fails if a value already lives there, or if a parameter at the same
    /// position was registered under a different name.
    pub fn insert(&mut self, pattern: &Pattern, value: T) -> Result<(), PatternError> {
        let mut node = self;
        for segment in pattern.segments() {
            node = match segment {
                Segment::Static(text) => node.static_child_mut(text),
                Segment::Param(name) => {
                    let child = node.param_child.get_or_insert_with(|| {
                        Box::new(Self::with_kind(
                            format!("{{{name}}}"),
                            SegmentKind::Param(name.clone()),
                        ))
                    });
                    check_name(pattern, &child.kind, name)?;
                    child.as_mut()
                }
                Segment::Wildcard(name) => {
                    let child = node.wildcard_child.get_or_insert_with(|| {
                        Box::new(Self::with_kind(
                            format!("*{name}"),
                            SegmentKind::Wildcard(name.clone()),
                        ))
                    });
                    check_name(pattern, &child.kind, name)?;
                    child.as_mut()
                }
            };
        }

        if node.value.is_some() {
            return Err(PatternError::Duplicate {
                pattern: pattern.as_str().to_string(),
            });
        }
        node.value = Some(value);
        Ok(())
    }

    fn static_child_mut(&mut self, text: &str) -> &mut Self {
        let index = match self
            .static_children
            .binary_search_by(|c| c.segment.as_str().cmp(text))
        {
            Ok(index) => index,
            Err(index) => {
                self.static_children
                    .insert(index, Self::with_kind(text.to_string(), SegmentKind::Static));
                index
            }
        };
        &mut self.static_children[index]
    }

    fn find_static_child(&self, segment: &str) -> Option<&Self> {
        self.static_children
            .binary_search_by(|c| c.segment.as_str().cmp(segment))
            .ok()
            .map(|i| &self.static_children[i])
    }

    /// Matches a concrete request path, capturing parameters.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<(&T, Params)> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut params = Params::new();
        let value = self.match_segments(&segments, &mut params)?;
        Some((value, params))
    }

    fn match_segments(&self, segments: &[&str], params: &mut Params) -> Option<&T> {
        let Some((&segment, remaining)) = segments.split_first() else {
            return self.value.as_ref();
        };

        if let Some(child) = self.find_static_child(segment) {
            if let Some(value) = child.match_segments(remaining, params) {
                return Some(value);
            }
        }

        if let Some(child) = &self.param_child {
            if let SegmentKind::Param(name) = &child.kind {
                let mark = params.len();
                params.push(name.clone(), segment);
                if let Some(value) = child.match_segments(remaining, params) {
                    return Some(value);
                }
                params.truncate(mark);
            }
        }

        if let Some(child) = &self.wildcard_child {
            if let (SegmentKind::Wildcard(name), Some(value)) = (&child.kind, &child.value) {
                params.push(name.clone(), segments.join("/"));
                return Some(value);
            }
        }

        None
    }

    /// Visits every stored value in depth-first order.
    pub fn for_each_value<'a>(&'a self, f: &mut impl FnMut(&'a T)) {
        if let Some(value) = &self.value {
            f(value);
        }
        for child in &self.static_children {
            child.for_each_value(f);
        }
        if let Some(child) = &self.param_child {
            child.for_each_value(f);
        }
        if let Some(child) = &self.wildcard_child {
            child.for_each_value(f);
        }
    }
}

fn check_name(pattern: &Pattern, existing: &SegmentKind, name: &str) -> Result<(), PatternError> {
    match existing {
        SegmentKind::Param(current) | SegmentKind::Wildcard(current) if current != name => {
            Err(PatternError::ConflictingParam {
                pattern: pattern.as_str().to_string(),
                existing: current.clone(),
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(routes: &[(&str, &'static str)]) -> Node<&'static str> {
        let mut root = Node::root();
        for &(pattern, value) in routes {
            root.insert(&Pattern::parse(pattern).unwrap(), value).unwrap();
        }
        root
    }

    #[test]
    fn test_root_route() {
        let root = tree(&[("/", "home")]);
        let (value, params) = root.match_path("/").unwrap();
        assert_eq!(*value, "home");
        assert!(params.is_empty());
    }

    #[test]
    fn test_static_and_param() {
        let root = tree(&[("/users", "list"), ("/users/{id}", "show")]);

        assert_eq!(*root.match_path("/users").unwrap().0, "list");

        let (value, params) = root.match_path("/users/7").unwrap();
        assert_eq!(*value, "show");
        assert_eq!(params.get("id"), Some("7"));
    }

    #[test]
    fn test_static_beats_param() {
        let root = tree(&[("/users/me", "me"), ("/users/{id}", "show")]);
        assert_eq!(*root.match_path("/users/me").unwrap().0, "me");
        assert_eq!(*root.match_path("/users/you").unwrap().0, "show");
    }

    #[test]
    fn test_wildcard_captures_rest() {
        let root = tree(&[("/files/*path", "serve")]);
        let (value, params) = root.match_path("/files/a/b/c.txt").unwrap();
        assert_eq!(*value, "serve");
        assert_eq!(params.get("path"), Some("a/b/c.txt"));
    }

    #[test]
    fn test_backtracking_discards_stale_params() {
        let root = tree(&[("/a/{x}/c", "param"), ("/a/*rest", "catch")]);

        let (value, params) = root.match_path("/a/b/d").unwrap();
        assert_eq!(*value, "catch");
        assert_eq!(params.get("x"), None);
        assert_eq!(params.get("rest"), Some("b/d"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_backtracking_from_static_into_param() {
        let root = tree(&[("/a/static/x", "deep"), ("/a/{id}/y", "param")]);
        let (value, params) = root.match_path("/a/static/y").unwrap();
        assert_eq!(*value, "param");
        assert_eq!(params.get("id"), Some("static"));
    }

    #[test]
    fn test_no_match() {
        let root = tree(&[("/users", "list")]);
        assert!(root.match_path("/posts").is_none());
        assert!(root.match_path("/users/1").is_none());
        assert!(root.match_path("/").is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut root = tree(&[("/users/{id}", "show")]);
        let err = root
            .insert(&Pattern::parse("/users/{id}").unwrap(), "again")
            .unwrap_err();
        assert!(matches!(err, PatternError::Duplicate { .. }));
    }

    #[test]
    fn test_conflicting_param_names_rejected() {
        let mut root = tree(&[("/users/{id}", "show")]);
        let err = root
            .insert(&Pattern::parse("/users/{user_id}/posts").unwrap(), "posts")
            .unwrap_err();
        assert_eq!(
            err,
            PatternError::ConflictingParam {
                pattern: "/users/{user_id}/posts".to_string(),
                existing: "id".to_string(),
            }
        );
    }

    #[test]
    fn test_for_each_value_visits_all() {
        let root = tree(&[("/", "home"), ("/a", "a"), ("/a/{id}", "b"), ("/f/*p", "c")]);
        let mut seen = Vec::new();
        root.for_each_value(&mut |v| seen.push(*v));
        seen.sort_unstable();
        assert_eq!(seen, vec!["a", "b", "c", "home"]);
    }
}
