//! Request router
//!
//! Keeps one [`RouteTree`] per HTTP method and turns a lookup miss into the
//! right fallback response:
//! - trailing-slash redirect (`/foo/` -> `/foo`)
//! - case and path cleanup redirect (`/FOO/../bar` -> `/bar`)
//! - automatic `OPTIONS` reply
//! - `405 Method Not Allowed` with an `Allow` header
//! - `404 Not Found`
//!
//! Handler panics are caught at [`Router::serve`] and turned into a 500 or
//! handed to the configured panic handler.

use crate::handler::BoxedHandler;
use crate::handlers::{StaticFileConfig, StaticFiles};
use crate::{Context, Error, Handler, Method, Request, Response, Result, StatusCode};
use fastweb_router::{clean_path, Lookup, RouteTree};
use http::header::ALLOW;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error};

/// How a request was answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A registered handler served the request
    Handled,
    /// Redirected to the path with its trailing slash added or removed
    TrailingSlashRedirect,
    /// Redirected to the cleaned, correctly cased registered path
    CaseFixRedirect,
    /// Answered an `OPTIONS` request with the allowed methods
    OptionsAutoReply,
    /// Path exists for other methods only
    MethodNotAllowed,
    NotFound,
    /// A handler panicked and the panic was recovered
    Recovered,
}

/// Registers one route per HTTP method helper.
///
/// Expanded inside `impl` blocks that provide
/// `fn route(&mut self, Method, &str, H) -> Result<()>`.
macro_rules! method_routes {
    ($($name:ident => $method:ident),* $(,)?) => {
        $(
            #[doc = concat!("Register a `", stringify!($method), "` route")]
            pub fn $name<H: $crate::Handler>(
                &mut self,
                pattern: &str,
                handler: H,
            ) -> $crate::Result<()> {
                self.route($crate::Method::$method, pattern, handler)
            }
        )*
    };
}

pub(crate) use method_routes;

/// HTTP router with per-method radix trees.
///
/// Build it once, then share it read-only while serving.
pub struct Router {
    trees: HashMap<Method, RouteTree<BoxedHandler>>,

    redirect_trailing_slash: bool,
    redirect_fixed_path: bool,
    handle_method_not_allowed: bool,
    handle_options: bool,

    global_options: Option<BoxedHandler>,
    not_found: Option<BoxedHandler>,
    method_not_allowed: Option<BoxedHandler>,
    panic_handler: Option<BoxedHandler>,
}

impl Default for Router {
    fn default() -> Self {
        Self {
            trees: HashMap::new(),
            redirect_trailing_slash: true,
            redirect_fixed_path: true,
            handle_method_not_allowed: true,
            handle_options: true,
            global_options: None,
            not_found: None,
            method_not_allowed: None,
            panic_handler: None,
        }
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Redirect when only a trailing slash differs from a registered route
    pub fn redirect_trailing_slash(mut self, enabled: bool) -> Self {
        self.redirect_trailing_slash = enabled;
        self
    }

    /// Redirect to the cleaned, case-corrected path when one is registered
    pub fn redirect_fixed_path(mut self, enabled: bool) -> Self {
        self.redirect_fixed_path = enabled;
        self
    }

    /// Answer 405 instead of 404 when other methods serve the path
    pub fn handle_method_not_allowed(mut self, enabled: bool) -> Self {
        self.handle_method_not_allowed = enabled;
        self
    }

    /// Answer `OPTIONS` requests automatically
    pub fn handle_options(mut self, enabled: bool) -> Self {
        self.handle_options = enabled;
        self
    }

    /// Handler for automatic `OPTIONS` replies; the `Allow` header is already set
    pub fn global_options(mut self, handler: impl Handler) -> Self {
        self.global_options = Some(Box::new(handler));
        self
    }

    pub fn not_found(mut self, handler: impl Handler) -> Self {
        self.not_found = Some(Box::new(handler));
        self
    }

    /// Handler for 405 replies; the `Allow` header is already set
    pub fn method_not_allowed(mut self, handler: impl Handler) -> Self {
        self.method_not_allowed = Some(Box::new(handler));
        self
    }

    /// Handler for recovered panics; the message is in [`Context::recovered`]
    pub fn panic_handler(mut self, handler: impl Handler) -> Self {
        self.panic_handler = Some(Box::new(handler));
        self
    }

    /// Register a handler for `method` (case-insensitive) and `pattern`.
    pub fn handle<H: Handler>(&mut self, method: &str, pattern: &str, handler: H) -> Result<()> {
        let method = method.parse()?;
        self.route(method, pattern, handler)
    }

    pub(crate) fn route<H: Handler>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
    ) -> Result<()> {
        self.trees
            .entry(method)
            .or_default()
            .insert(pattern, Box::new(handler))?;
        debug!(method = %method, pattern, "route registered");
        Ok(())
    }

    method_routes! {
        get => Get,
        head => Head,
        options => Options,
        post => Post,
        put => Put,
        patch => Patch,
        delete => Delete,
    }

    /// Routes registered through the returned group get `prefix` prepended.
    pub fn group(&mut self, prefix: &str) -> crate::Group<'_> {
        crate::Group::new(self, prefix.to_string())
    }

    /// Serve files below `root` on `path`, which must end in a catch-all
    /// segment such as `/static/*filepath`.
    pub fn serve_files(&mut self, path: &str, root: impl Into<std::path::PathBuf>) -> Result<()> {
        self.serve_files_with(path, StaticFileConfig::new(root))
    }

    pub fn serve_files_with(&mut self, path: &str, config: StaticFileConfig) -> Result<()> {
        let name = match path.rsplit_once('/') {
            Some((_, last)) if last.len() > 1 && last.starts_with('*') => last[1..].to_string(),
            _ => {
                return Err(Error::InvalidPath(format!(
                    "file mount must end with /*filepath: {path}"
                )))
            }
        };

        let files = StaticFiles::new(config);
        self.get(path, move |ctx: &mut Context| {
            let file = ctx.param(&name).unwrap_or_default().to_string();
            files.respond(ctx, &file);
        })
    }

    /// Look up the route registered for `method` and `path`.
    pub fn lookup(&self, method: Method, path: &str) -> Option<Lookup<'_, BoxedHandler>> {
        self.trees.get(&method).map(|tree| tree.search(path))
    }

    /// Whether any route is registered for `method` and `path`
    pub fn has_route(&self, method: Method, path: &str) -> bool {
        self.lookup(method, path)
            .is_some_and(|lookup| lookup.value.is_some())
    }

    /// Comma separated, sorted list of the methods serving `path`,
    /// leaving out `exclude`.
    ///
    /// `*` asks for every registered method and ignores `exclude`. `OPTIONS`
    /// is listed when anything else is and automatic `OPTIONS` replies are
    /// enabled.
    pub fn allowed(&self, path: &str, exclude: Option<Method>) -> String {
        let mut methods: Vec<&'static str> = self
            .trees
            .iter()
            .filter(|(method, _)| **method != Method::Options)
            .filter(|(method, tree)| {
                if path == "*" {
                    !tree.is_empty()
                } else {
                    Some(**method) != exclude && tree.search(path).value.is_some()
                }
            })
            .map(|(method, _)| method.as_str())
            .collect();

        if methods.is_empty() {
            return String::new();
        }
        if self.handle_options {
            methods.push(Method::Options.as_str());
        }
        methods.sort_unstable();
        methods.dedup();
        methods.join(", ")
    }

    /// Serve a request and return the response.
    pub fn dispatch(&self, request: Request) -> Response {
        let mut ctx = Context::new(request);
        self.serve(&mut ctx);
        ctx.into_response()
    }

    /// Serve the request held by `ctx`, writing the response into it.
    ///
    /// A panicking handler never unwinds past this call.
    pub fn serve(&self, ctx: &mut Context) -> Outcome {
        match panic::catch_unwind(AssertUnwindSafe(|| self.route_request(ctx))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    method = %ctx.method(),
                    path = ctx.path(),
                    panic = %message,
                    "handler panicked"
                );
                ctx.recover(message);
                self.recovered(ctx);
                Outcome::Recovered
            }
        }
    }

    fn recovered(&self, ctx: &mut Context) {
        if let Some(handler) = &self.panic_handler {
            if panic::catch_unwind(AssertUnwindSafe(|| handler.call(ctx))).is_ok() {
                return;
            }
            error!("panic handler panicked");
        }
        ctx.error(
            StatusCode::INTERNAL_SERVER_ERROR.reason_phrase(),
            StatusCode::INTERNAL_SERVER_ERROR,
        );
    }

    fn route_request(&self, ctx: &mut Context) -> Outcome {
        let method = ctx.method();
        let path = ctx.path().to_string();

        if let Some(tree) = self.trees.get(&method) {
            let lookup = tree.search(&path);
            if let Some(handler) = lookup.value {
                ctx.set_params(lookup.params);
                handler.call(ctx);
                return Outcome::Handled;
            }

            if method != Method::Connect && path != "/" {
                let status = if method == Method::Get {
                    StatusCode::MOVED_PERMANENTLY
                } else {
                    StatusCode::TEMPORARY_REDIRECT
                };

                if lookup.trailing_slash_redirect && self.redirect_trailing_slash {
                    let target = toggle_trailing_slash(&path);
                    redirect(ctx, &target, status);
                    debug!(method = %method, path, target, "trailing slash redirect");
                    return Outcome::TrailingSlashRedirect;
                }

                if self.redirect_fixed_path {
                    let cleaned = clean_path(&path);
                    if let Some(target) =
                        tree.find_case_insensitive_path(&cleaned, self.redirect_trailing_slash)
                    {
                        redirect(ctx, &target, status);
                        debug!(method = %method, path, target, "fixed path redirect");
                        return Outcome::CaseFixRedirect;
                    }
                }
            }
        }

        if method == Method::Options && self.handle_options {
            let allow = self.allowed(&path, None);
            if !allow.is_empty() {
                debug!(path, allow, "automatic OPTIONS reply");
                ctx.set_header(ALLOW.as_str(), allow);
                if let Some(handler) = &self.global_options {
                    handler.call(ctx);
                }
                return Outcome::OptionsAutoReply;
            }
        } else if self.handle_method_not_allowed {
            let allow = self.allowed(&path, Some(method));
            if !allow.is_empty() {
                debug!(method = %method, path, allow, "method not allowed");
                ctx.set_header(ALLOW.as_str(), allow);
                match &self.method_not_allowed {
                    Some(handler) => {
                        ctx.set_status(StatusCode::METHOD_NOT_ALLOWED);
                        handler.call(ctx);
                    }
                    None => ctx.error(
                        StatusCode::METHOD_NOT_ALLOWED.reason_phrase(),
                        StatusCode::METHOD_NOT_ALLOWED,
                    ),
                }
                return Outcome::MethodNotAllowed;
            }
        }

        debug!(method = %method, path, "no route");
        match &self.not_found {
            Some(handler) => {
                ctx.set_status(StatusCode::NOT_FOUND);
                handler.call(ctx);
            }
            None => ctx.not_found(),
        }
        Outcome::NotFound
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let routes: HashMap<&str, usize> = self
            .trees
            .iter()
            .map(|(method, tree)| (method.as_str(), tree.len()))
            .collect();

        f.debug_struct("Router")
            .field("routes", &routes)
            .field("redirect_trailing_slash", &self.redirect_trailing_slash)
            .field("redirect_fixed_path", &self.redirect_fixed_path)
            .field("handle_method_not_allowed", &self.handle_method_not_allowed)
            .field("handle_options", &self.handle_options)
            .finish_non_exhaustive()
    }
}

fn redirect(ctx: &mut Context, target: &str, status: StatusCode) {
    let location = match ctx.query() {
        Some(query) => format!("{target}?{query}"),
        None => target.to_string(),
    };
    ctx.redirect(&location, status);
}

fn toggle_trailing_slash(path: &str) -> String {
    match path.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => format!("{path}/"),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
