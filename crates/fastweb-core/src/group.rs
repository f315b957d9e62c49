//! Route groups sharing a path prefix

use crate::handlers::StaticFileConfig;
use crate::router::method_routes;
use crate::{Handler, Method, Result, Router};
use std::path::PathBuf;

/// Registers routes on a [`Router`] under a common prefix.
///
/// ```
/// use fastweb_core::{Context, Router, StatusCode};
///
/// let mut router = Router::new();
/// let mut api = router.group("/api");
/// let mut v1 = api.group("/v1");
/// v1.get("/users/:id", |ctx: &mut Context| ctx.text(StatusCode::OK, "user"))
///     .unwrap();
///
/// assert!(router.has_route(fastweb_core::Method::Get, "/api/v1/users/7"));
/// ```
#[derive(Debug)]
pub struct Group<'r> {
    router: &'r mut Router,
    prefix: String,
}

impl<'r> Group<'r> {
    pub(crate) fn new(router: &'r mut Router, prefix: String) -> Self {
        Self { router, prefix }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Nested group; its prefix is appended to this one.
    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        let prefix = format!("{}{}", self.prefix, prefix);
        Group::new(self.router, prefix)
    }

    pub fn handle<H: Handler>(&mut self, method: &str, pattern: &str, handler: H) -> Result<()> {
        let method = method.parse()?;
        self.route(method, pattern, handler)
    }

    fn route<H: Handler>(&mut self, method: Method, pattern: &str, handler: H) -> Result<()> {
        let pattern = self.full_path(pattern);
        self.router.route(method, &pattern, handler)
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

    /// Mount a file directory below this group's prefix.
    pub fn serve_files(&mut self, path: &str, root: impl Into<PathBuf>) -> Result<()> {
        let path = self.full_path(path);
        self.router.serve_files(&path, root)
    }

    pub fn serve_files_with(&mut self, path: &str, config: StaticFileConfig) -> Result<()> {
        let path = self.full_path(path);
        self.router.serve_files_with(&path, config)
    }

    fn full_path(&self, path: &str) -> String {
        format!("{}{}", self.prefix, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Context, Request, StatusCode};

    fn ok(ctx: &mut Context) {
        ctx.text(StatusCode::OK, "ok");
    }

    #[test]
    fn test_group_prefixes_routes() {
        let mut router = Router::new();
        {
            let mut admin = router.group("/admin");
            assert_eq!(admin.prefix(), "/admin");
            admin.get("/users", ok).unwrap();
            admin.delete("/users/:id", ok).unwrap();
            admin.handle("PATCH", "/settings", ok).unwrap();
        }

        assert!(router.has_route(Method::Get, "/admin/users"));
        assert!(router.has_route(Method::Delete, "/admin/users/9"));
        assert!(router.has_route(Method::Patch, "/admin/settings"));
        assert!(!router.has_route(Method::Get, "/users"));
    }

    #[test]
    fn test_nested_groups() {
        let mut router = Router::new();
        {
            let mut api = router.group("/api");
            api.get("/health", ok).unwrap();
            let mut v2 = api.group("/v2");
            assert_eq!(v2.prefix(), "/api/v2");
            v2.post("/items", ok).unwrap();
        }

        let res = router.dispatch(Request::new(Method::Post, "/api/v2/items"));
        assert_eq!(res.status, StatusCode::OK);
        assert!(router.has_route(Method::Get, "/api/health"));
    }

    #[test]
    fn test_group_errors_are_returned() {
        let mut router = Router::new();
        let mut api = router.group("/api");
        api.get("/:id", ok).unwrap();

        assert!(api.get("/:name", ok).is_err());
        assert!(api.serve_files("/assets", ".").is_err());
        assert!(api.serve_files("/assets/*file", ".").is_ok());
    }
}
