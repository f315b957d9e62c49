//! Route registration errors

use thiserror::Error;

/// Reasons a pattern can be rejected by [`RouteTree::insert`](crate::RouteTree::insert).
///
/// All of these are configuration mistakes and are reported at setup time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsertError {
    /// Pattern does not start with `/`
    #[error("path must begin with '/' in path '{0}'")]
    MissingLeadingSlash(String),

    /// The exact pattern already has a handler
    #[error("a handler is already registered for path '{0}'")]
    DuplicateRoute(String),

    /// Another wildcard with a different name sits at the same position
    #[error("wildcard '{new}' in path '{path}' conflicts with existing wildcard '{existing}'")]
    WildcardConflict {
        path: String,
        existing: String,
        new: String,
    },

    /// `:` or `*` without a name
    #[error("wildcards must be named with a non-empty name in path '{0}'")]
    UnnamedWildcard(String),

    /// `:` or `*` appearing inside a segment instead of at its start
    #[error("wildcards must start a path segment in path '{0}'")]
    WildcardNotAtSegmentStart(String),

    /// More than one wildcard in one segment, e.g. `/:a:b`
    #[error("only one wildcard per path segment is allowed in path '{0}'")]
    MultipleWildcardsInSegment(String),

    /// `*name` followed by more segments
    #[error("catch-all routes are only allowed at the end of the path in path '{0}'")]
    CatchAllNotLast(String),
}
