//! Request handler trait

use crate::Context;

/// Anything that can serve a request.
///
/// Closures taking `&mut Context` implement this directly:
///
/// ```
/// use fastweb_core::{Context, Router, StatusCode};
///
/// let mut router = Router::new();
/// router
///     .get("/ping", |ctx: &mut Context| ctx.text(StatusCode::OK, "pong"))
///     .unwrap();
/// ```
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: &mut Context);
}

impl<F> Handler for F
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    fn call(&self, ctx: &mut Context) {
        self(ctx)
    }
}

pub(crate) type BoxedHandler = Box<dyn Handler>;
