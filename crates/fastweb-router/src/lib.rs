//! fastweb-router: radix tree HTTP path router
//!
//! One [`RouteTree`] holds the routes of a single HTTP method. The HTTP layer
//! (`fastweb-core`) keeps one tree per method and builds redirects, automatic
//! OPTIONS replies and 405 handling on top of the lookups exposed here.
//!
//! ## Path Syntax
//! - `:name` - Named parameter (captures one segment)
//! - `*name` - Catch-all (captures the rest of the path, must come last)
//!
//! ## Priority
//! 1. Static segment (highest)
//! 2. Parameter
//! 3. Catch-all (lowest)
//!
//! Static siblings are additionally ordered by how many routes sit below
//! them, which speeds up lookups but never changes which route matches.
//!
//! ## Example
//! ```
//! use fastweb_router::RouteTree;
//!
//! let mut tree = RouteTree::new();
//! tree.insert("/users", 0).unwrap();
//! tree.insert("/users/:id", 1).unwrap();
//! tree.insert("/files/*path", 2).unwrap();
//!
//! let lookup = tree.search("/users/123");
//! assert_eq!(lookup.value, Some(&1));
//! assert_eq!(lookup.params.get("id"), Some("123"));
//!
//! assert!(tree.search("/users/").trailing_slash_redirect);
//! ```

#![forbid(unsafe_code)]

mod error;
mod node;
mod params;
mod path;
mod tree;

pub use error::InsertError;
pub use params::{Param, Params};
pub use path::clean_path;
pub use tree::{Lookup, RouteTree};
