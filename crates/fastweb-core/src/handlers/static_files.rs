//! Static file serving for directory mounts
//!
//! The router strips the mount prefix and hands over the catch-all value;
//! this module resolves it below the configured root.

use crate::{Context, Method, StatusCode};
use std::collections::HashMap;
use std::fs::Metadata;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Static file configuration
#[derive(Debug, Clone)]
pub struct StaticFileConfig {
    /// Root directory
    pub root: PathBuf,
    /// Index file name
    pub index: String,
    /// Enable directory listing
    pub listing: bool,
    /// Cache max-age in seconds
    pub max_age: u32,
    /// Enable ETag
    pub etag: bool,
    /// Custom headers
    pub headers: HashMap<String, String>,
    /// Serve hidden files (dot files)
    pub hidden: bool,
}

impl Default for StaticFileConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            index: "index.html".to_string(),
            listing: false,
            max_age: 86400, // 1 day
            etag: true,
            headers: HashMap::new(),
            hidden: false,
        }
    }
}

impl StaticFileConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.index = name.into();
        self
    }

    pub fn listing(mut self, enabled: bool) -> Self {
        self.listing = enabled;
        self
    }

    pub fn max_age(mut self, seconds: u32) -> Self {
        self.max_age = seconds;
        self
    }

    pub fn etag(mut self, enabled: bool) -> Self {
        self.etag = enabled;
        self
    }

    pub fn hidden(mut self, enabled: bool) -> Self {
        self.hidden = enabled;
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// Static file handler
#[derive(Debug, Clone)]
pub struct StaticFiles {
    config: StaticFileConfig,
}

impl StaticFiles {
    pub fn new(config: StaticFileConfig) -> Self {
        Self { config }
    }

    /// Serve static files from directory
    pub fn serve(root: impl Into<PathBuf>) -> Self {
        Self::new(StaticFileConfig::new(root))
    }

    /// Responds with the file at `file`, relative to the root.
    pub fn respond(&self, ctx: &mut Context, file: &str) {
        let Some(relative) = self.sanitize_path(file) else {
            debug!(file, "rejected static file path");
            return ctx.not_found();
        };
        let full_path = self.config.root.join(&relative);

        match std::fs::metadata(&full_path) {
            Ok(meta) if meta.is_dir() => {
                let index_path = full_path.join(&self.config.index);
                if let Ok(index_meta) = std::fs::metadata(&index_path) {
                    if index_meta.is_file() {
                        return self.serve_file(ctx, &index_path, &index_meta);
                    }
                }
                if self.config.listing {
                    return self.list_directory(ctx, &full_path);
                }
                ctx.not_found()
            }
            Ok(meta) => self.serve_file(ctx, &full_path, &meta),
            Err(_) => ctx.not_found(),
        }
    }

    /// Sanitize request path to prevent directory traversal
    fn sanitize_path(&self, path: &str) -> Option<PathBuf> {
        let path = path.trim_start_matches('/');

        if !self.config.hidden && path.split('/').any(|s| s.starts_with('.') && s != ".") {
            return None;
        }

        let mut result = PathBuf::new();
        for component in Path::new(path).components() {
            match component {
                Component::Normal(c) => result.push(c),
                Component::ParentDir => return None,
                _ => {}
            }
        }
        Some(result)
    }

    fn serve_file(&self, ctx: &mut Context, path: &Path, meta: &Metadata) {
        let etag = self.config.etag.then(|| generate_etag(meta));
        if let (Some(etag), Some(if_none_match)) = (&etag, ctx.header("if-none-match")) {
            if if_none_match == etag {
                ctx.set_status(StatusCode::NOT_MODIFIED);
                return;
            }
        }

        let content = match std::fs::read(path) {
            Ok(content) => content,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "static file unreadable");
                return ctx.not_found();
            }
        };

        ctx.set_status(StatusCode::OK);
        ctx.set_header("content-type", mime_type(path));
        if let Some(etag) = etag {
            ctx.set_header("etag", etag);
        }
        if self.config.max_age > 0 {
            ctx.set_header("cache-control", format!("max-age={}", self.config.max_age));
        }
        for (k, v) in &self.config.headers {
            ctx.set_header(k.as_str(), v.as_str());
        }

        // HEAD request - no body
        if ctx.method() != Method::Head {
            ctx.set_body(content);
        }
    }

    fn list_directory(&self, ctx: &mut Context, path: &Path) {
        let dir = match std::fs::read_dir(path) {
            Ok(dir) => dir,
            Err(_) => return ctx.not_found(),
        };

        let mut entries: Vec<(String, bool)> = dir
            .filter_map(|entry| entry.ok())
            .map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                (name, is_dir)
            })
            .filter(|(name, _)| self.config.hidden || !name.starts_with('.'))
            .collect();

        // directories first, then by name
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let base = ctx.path().trim_end_matches('/').to_string();
        ctx.html(StatusCode::OK, render_listing(&base, &entries));
    }
}

/// Renders a listing for the directory served at `base`, the request path
/// without its trailing slash. Links are absolute so they resolve the same
/// whether or not the request ended in `/`.
fn render_listing(base: &str, entries: &[(String, bool)]) -> String {
    let title = escape_html(if base.is_empty() { "/" } else { base });
    let mut html = String::from("<!DOCTYPE html><html><head><meta charset=\"utf-8\">");
    html.push_str(&format!("<title>Index of {title}</title>"));
    html.push_str("</head><body>");
    html.push_str(&format!("<h1>Index of {title}</h1>"));
    html.push_str("<hr><pre>");

    if !base.is_empty() {
        let parent = &base[..base.rfind('/').unwrap_or(0)];
        html.push_str(&format!("<a href=\"{}/\">..</a>\n", encode_path(parent)));
    }

    for (name, is_dir) in entries {
        let slash = if *is_dir { "/" } else { "" };
        html.push_str(&format!(
            "<a href=\"{}/{}{slash}\">{}{slash}</a>\n",
            encode_path(base),
            encode_path(name),
            escape_html(name),
        ));
    }

    html.push_str("</pre><hr></body></html>");
    html
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Percent-encodes everything but unreserved bytes and `/`.
fn encode_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for &b in path.as_bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~' | b'/') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

fn generate_etag(meta: &Metadata) -> String {
    use std::time::UNIX_EPOCH;

    let mtime = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0);

    format!("\"{:x}-{:x}\"", mtime, meta.len())
}

fn mime_type(path: &Path) -> &'static str {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match ext.to_ascii_lowercase().as_str() {
        // Text
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "xml" => "application/xml",
        "txt" => "text/plain; charset=utf-8",
        "md" => "text/markdown; charset=utf-8",
        "csv" => "text/csv",

        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",

        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",

        "pdf" => "application/pdf",
        "wasm" => "application/wasm",

        _ => "application/octet-stream",
    }
}
