//! fastweb-core: HTTP routing on per-method radix trees
//!
//! A [`Router`] keeps one [`fastweb_router::RouteTree`] per HTTP method.
//! Requests that miss every route are answered the way a careful server
//! would: trailing-slash and case-fix redirects, automatic `OPTIONS`
//! replies, `405 Method Not Allowed` with an `Allow` header, then `404`.
//! Handler panics are recovered per request.
//!
//! ```
//! use fastweb_core::{Context, Method, Request, Router, StatusCode};
//!
//! let mut router = Router::new();
//! router
//!     .get("/user/:id", |ctx: &mut Context| {
//!         let id = ctx.param("id").unwrap_or_default().to_string();
//!         ctx.text(StatusCode::OK, id);
//!     })
//!     .unwrap();
//!
//! let res = router.dispatch(Request::new(Method::Get, "/user/42"));
//! assert_eq!(res.body_string().as_deref(), Some("42"));
//!
//! let res = router.dispatch(Request::new(Method::Get, "/User/42/"));
//! assert_eq!(res.status, StatusCode::MOVED_PERMANENTLY);
//! assert_eq!(res.header("location"), Some("/user/42"));
//! ```
//!
//! ## Features
//! - `native` - Serving loop with tokio/hyper and logging setup

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod context;
pub mod error;
pub mod group;
pub mod handler;
pub mod handlers;
pub mod method;
pub mod request;
pub mod response;
pub mod router;

#[cfg(feature = "native")]
pub mod logging;

#[cfg(feature = "native")]
pub mod server;

// Re-exports
pub use context::Context;
pub use error::{Error, Result};
pub use group::Group;
pub use handler::Handler;
pub use handlers::{StaticFileConfig, StaticFiles};
pub use method::Method;
pub use request::{Request, RequestBuilder};
pub use response::{Response, StatusCode};
pub use router::{Outcome, Router};

pub use fastweb_router::{clean_path, InsertError, Param, Params};

#[cfg(feature = "native")]
pub use server::{
    create_optimized_socket, from_hyper_parts, to_hyper_response, ServerConfig, ServerState,
};
