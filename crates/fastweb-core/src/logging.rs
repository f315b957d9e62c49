//! Logging setup for binaries serving a router

use crate::{Error, Result};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Install a global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`, e.g. `"fastweb_core=debug"`
/// to see every registered route and dispatch fallback.
pub fn init(default_filter: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| Error::Config(format!("invalid log filter {default_filter:?}: {e}")))?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .try_init()
        .map_err(|e| Error::Internal(format!("logging already initialised: {e}")))
}

