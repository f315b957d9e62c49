//! Error types for fastweb-core

use fastweb_router::InsertError;
use thiserror::Error;

/// Result type alias for fastweb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Setup-time and serving errors.
///
/// Request-time misses are not errors: they end in the NotFound responder.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid HTTP method
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// Invalid path (e.g. a file mount without a trailing catch-all)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Route registration rejected by the tree
    #[error(transparent)]
    Route(#[from] InsertError),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error (native only)
    #[cfg(feature = "native")]
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Hyper error (native only)
    #[cfg(feature = "native")]
    #[error("HTTP error: {0}")]
    Hyper(#[from] hyper::Error),
}
