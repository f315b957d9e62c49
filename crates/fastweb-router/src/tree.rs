//! One radix tree per HTTP method

use crate::node::{Captures, Node};
use crate::{InsertError, Params};

/// Result of [`RouteTree::search`]
#[derive(Debug)]
pub struct Lookup<'t, T> {
    /// The registered value, if the path matched a route exactly
    pub value: Option<&'t T>,
    /// Captured parameters in pattern order (empty on a miss)
    pub params: Params,
    /// No match, but the path with its trailing `/` added or removed would match
    pub trailing_slash_redirect: bool,
}

impl<T> Lookup<'_, T> {
    fn miss(trailing_slash_redirect: bool) -> Self {
        Self {
            value: None,
            params: Params::new(),
            trailing_slash_redirect,
        }
    }
}

/// Radix tree mapping path patterns to values.
///
/// Patterns start with `/`. A segment `:name` captures one path segment, a
/// final segment `*name` captures the rest of the path including slashes.
#[derive(Debug)]
pub struct RouteTree<T> {
    root: Option<Node<T>>,
}

impl<T> Default for RouteTree<T> {
    fn default() -> Self {
        Self { root: None }
    }
}

impl<T> RouteTree<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `value` under `pattern`.
    ///
    /// Fails without touching the tree if the pattern is malformed, already
    /// registered, or names a wildcard differently from an existing one at the
    /// same position.
    pub fn insert(&mut self, pattern: &str, value: T) -> Result<(), InsertError> {
        validate_pattern(pattern)?;

        let path = pattern.as_bytes();
        if let Some(root) = &self.root {
            root.check(path, pattern)?;
        }

        self.root.get_or_insert_with(Node::root).insert(path, value);
        Ok(())
    }

    /// Looks up `path`.
    pub fn search(&self, path: &str) -> Lookup<'_, T> {
        let Some(root) = &self.root else {
            return Lookup::miss(false);
        };

        let mut captures = Captures::new();
        if let Some(value) = root.search(path.as_bytes(), &mut captures) {
            let mut params = Params::new();
            for (key, value) in &captures {
                params.push(
                    String::from_utf8_lossy(key),
                    String::from_utf8_lossy(value),
                );
            }
            return Lookup {
                value: Some(value),
                params,
                trailing_slash_redirect: false,
            };
        }

        Lookup::miss(toggled_slash_matches(root, path))
    }

    /// Case-insensitive lookup returning the registered spelling of the
    /// route that matches `path`.
    ///
    /// Folding is ASCII-only: `/ÜBER` does not match a route spelled `/über`.
    /// With `fix_trailing_slash`, a route differing only by a trailing `/` is
    /// accepted as well.
    pub fn find_case_insensitive_path(
        &self,
        path: &str,
        fix_trailing_slash: bool,
    ) -> Option<String> {
        let root = self.root.as_ref()?;
        let mut out = Vec::with_capacity(path.len() + 1);
        if root.find_case_insensitive(path.as_bytes(), fix_trailing_slash, &mut out) {
            String::from_utf8(out).ok()
        } else {
            None
        }
    }

    /// Number of registered routes
    pub fn len(&self) -> usize {
        self.root.as_ref().map_or(0, |root| root.priority as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn toggled_slash_matches<T>(root: &Node<T>, path: &str) -> bool {
    if path.len() <= 1 {
        return false;
    }
    let toggled = match path.strip_suffix('/') {
        Some(stripped) => stripped.to_string(),
        None => format!("{path}/"),
    };
    let mut captures = Captures::new();
    root.search(toggled.as_bytes(), &mut captures).is_some()
}

fn validate_pattern(pattern: &str) -> Result<(), InsertError> {
    let Some(body) = pattern.strip_prefix('/') else {
        return Err(InsertError::MissingLeadingSlash(pattern.to_string()));
    };

    let mut segments = body.split('/').peekable();
    while let Some(segment) = segments.next() {
        let wildcards = segment.matches(|c| c == ':' || c == '*').count();
        if wildcards == 0 {
            continue;
        }
        if wildcards > 1 {
            return Err(InsertError::MultipleWildcardsInSegment(pattern.to_string()));
        }
        if !segment.starts_with(|c| c == ':' || c == '*') {
            return Err(InsertError::WildcardNotAtSegmentStart(pattern.to_string()));
        }
        if segment.len() == 1 {
            return Err(InsertError::UnnamedWildcard(pattern.to_string()));
        }
        if segment.starts_with('*') && segments.peek().is_some() {
            return Err(InsertError::CatchAllNotLast(pattern.to_string()));
        }
    }
    Ok(())
}
