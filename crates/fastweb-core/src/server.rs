//! Native HTTP server implementation
//!
//! Serves a [`Router`] over HTTP/1.1 with:
//! - Multi-threaded tokio runtime
//! - SO_REUSEPORT for load balancing
//! - TCP_NODELAY for low latency
//! - Route registration while serving, guarded by a read-write lock

use crate::{Error, Handler, Method, Request, Response, Result, Router, StatusCode};
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use parking_lot::RwLock;
use socket2::{Domain, Protocol, Socket, Type};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub hostname: String,
    pub workers: usize,
    pub keep_alive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            hostname: "0.0.0.0".to_string(),
            workers: num_cpus::get(),
            keep_alive: true,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn keep_alive(mut self, enabled: bool) -> Self {
        self.keep_alive = enabled;
        self
    }

    /// Address to bind, validated
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.hostname, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("invalid address {}:{}: {e}", self.hostname, self.port)))
    }
}

/// Server state shared across all connections
///
/// Lookups take the read lock, registration takes the write lock, so a
/// route is never added while a request is being routed.
#[derive(Debug, Default)]
pub struct ServerState {
    router: RwLock<Router>,
}

impl ServerState {
    pub fn new(router: Router) -> Self {
        Self {
            router: RwLock::new(router),
        }
    }

    /// Add a route while serving
    pub fn register<H: Handler>(&self, method: &str, pattern: &str, handler: H) -> Result<()> {
        self.router.write().handle(method, pattern, handler)
    }

    /// Route a request
    pub fn dispatch(&self, request: Request) -> Response {
        self.router.read().dispatch(request)
    }
}

impl From<Router> for ServerState {
    fn from(router: Router) -> Self {
        Self::new(router)
    }
}

/// Create a TCP socket with optimizations
pub fn create_optimized_socket(addr: &SocketAddr) -> std::io::Result<Socket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    // SO_REUSEADDR - allow binding to address in TIME_WAIT
    socket.set_reuse_address(true)?;

    // SO_REUSEPORT - enable kernel load balancing across threads
    #[cfg(unix)]
    socket.set_reuse_port(true)?;

    // TCP_NODELAY - disable Nagle's algorithm for lower latency
    socket.set_nodelay(true)?;

    // tokio requires a non-blocking listener
    socket.set_nonblocking(true)?;

    socket.bind(&(*addr).into())?;
    socket.listen(1024)?;

    Ok(socket)
}

/// Build a multi-threaded runtime and serve until the process exits.
pub fn run(state: ServerState, config: ServerConfig) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers.max(1))
        .enable_all()
        .build()?;

    runtime.block_on(serve(Arc::new(state), &config))
}

/// Bind according to `config` and serve.
pub async fn serve(state: Arc<ServerState>, config: &ServerConfig) -> Result<()> {
    let addr = config.socket_addr()?;
    let listener = TcpListener::from_std(create_optimized_socket(&addr)?.into())?;
    info!(%addr, workers = config.workers, "listening");
    serve_listener(state, listener, config.keep_alive).await
}

/// Accept connections from `listener` forever.
pub async fn serve_listener(
    state: Arc<ServerState>,
    listener: TcpListener,
    keep_alive: bool,
) -> Result<()> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                warn!(error = %err, "accept failed");
                continue;
            }
        };

        let state = state.clone();
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |req| {
                let state = state.clone();
                async move { Ok::<_, Infallible>(handle_request(state, req).await) }
            });

            if let Err(err) = http1::Builder::new()
                .keep_alive(keep_alive)
                .serve_connection(io, service)
                .await
            {
                debug!(%peer, error = %err, "connection error");
            }
        });
    }
}

async fn handle_request(
    state: Arc<ServerState>,
    req: hyper::Request<Incoming>,
) -> hyper::Response<Full<Bytes>> {
    let Some(method) = Method::parse(req.method().as_str().as_bytes()) else {
        debug!(method = %req.method(), "unsupported method");
        return to_hyper_response(Response::error(
            StatusCode::NOT_IMPLEMENTED,
            StatusCode::NOT_IMPLEMENTED.reason_phrase(),
        ));
    };

    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            debug!(error = %err, "failed to read request body");
            return to_hyper_response(Response::error(
                StatusCode::BAD_REQUEST,
                StatusCode::BAD_REQUEST.reason_phrase(),
            ));
        }
    };

    let request = from_hyper_parts(method, &parts, body);
    // handlers run synchronously and may touch the filesystem
    match tokio::task::spawn_blocking(move || state.dispatch(request)).await {
        Ok(res) => to_hyper_response(res),
        Err(err) => {
            error!(error = %err, "dispatch task failed");
            to_hyper_response(Response::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                StatusCode::INTERNAL_SERVER_ERROR.reason_phrase(),
            ))
        }
    }
}

/// Convert hyper request parts to our Request type, decoding the path
pub fn from_hyper_parts(method: Method, parts: &http::request::Parts, body: Bytes) -> Request {
    let mut request = Request::new(method, percent_decode_path(parts.uri.path()));
    request.query = parts.uri.query().map(|s| s.to_string());
    request.body = body;

    for (name, value) in &parts.headers {
        if let Ok(v) = value.to_str() {
            request.headers.push((name.to_string(), v.to_string()));
        }
    }

    request
}

/// Decodes `%XX` escapes in a request path.
///
/// `+` stays literal. A `%` not followed by two hex digits is kept, and
/// byte sequences that are not UTF-8 are replaced lossily.
fn percent_decode_path(path: &str) -> String {
    if !path.contains('%') {
        return path.to_string();
    }

    let bytes = path.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let escaped = match bytes.get(i..i + 3) {
            Some([b'%', hi, lo]) => hex(*hi).zip(hex(*lo)).map(|(hi, lo)| (hi << 4) | lo),
            _ => None,
        };
        match escaped {
            Some(byte) => {
                out.push(byte);
                i += 3;
            }
            None => {
                out.push(bytes[i]);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

/// Convert our Response to hyper Response
pub fn to_hyper_response(res: Response) -> hyper::Response<Full<Bytes>> {
    let mut response = hyper::Response::new(Full::new(res.body));
    *response.status_mut() = http::StatusCode::from_u16(res.status.as_u16())
        .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);

    for (name, value) in &res.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().append(name, value);
            }
            _ => warn!(header = %name, "dropping invalid response header"),
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Context;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn test_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.hostname, "0.0.0.0");
        assert!(config.workers >= 1);
        assert!(config.keep_alive);
        assert_eq!(config.socket_addr().unwrap().to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn test_invalid_address() {
        let config = ServerConfig::new().hostname("not an address");
        assert!(matches!(config.socket_addr(), Err(Error::Config(_))));
    }

    #[test]
    fn test_dynamic_registration() {
        let state = ServerState::default();
        let req = || Request::new(Method::Get, "/late");

        assert_eq!(state.dispatch(req()).status, StatusCode::NOT_FOUND);
        state
            .register("GET", "/late", |ctx: &mut Context| ctx.text(StatusCode::OK, "here"))
            .unwrap();
        assert_eq!(state.dispatch(req()).status, StatusCode::OK);
        assert!(state.register("GET", "/late", |_: &mut Context| {}).is_err());
    }

    #[test]
    fn test_to_hyper_response() {
        let mut res = Response::new(StatusCode::MOVED_PERMANENTLY);
        res.set_header("location", "/Foo");
        res.headers.push(("bad header".to_string(), "x".to_string()));

        let converted = to_hyper_response(res);
        assert_eq!(converted.status(), http::StatusCode::MOVED_PERMANENTLY);
        assert_eq!(converted.headers()["location"], "/Foo");
        assert_eq!(converted.headers().len(), 1);
    }

    #[test]
    fn test_from_hyper_parts() {
        let (parts, _) = http::Request::builder()
            .method("POST")
            .uri("/items/7?draft=true")
            .header("content-type", "application/json")
            .body(())
            .unwrap()
            .into_parts();

        let req = from_hyper_parts(Method::Post, &parts, Bytes::from_static(b"{}"));
        assert_eq!(req.path, "/items/7");
        assert_eq!(req.query.as_deref(), Some("draft=true"));
        assert_eq!(req.content_type(), Some("application/json"));
        assert_eq!(req.body.as_ref(), b"{}");
    }

    #[test]
    fn test_from_hyper_parts_decodes_path() {
        let (parts, _) = http::Request::builder()
            .uri("/hello/J%C3%B6rg%20M+x?q=a%20b")
            .body(())
            .unwrap()
            .into_parts();

        let req = from_hyper_parts(Method::Get, &parts, Bytes::new());
        assert_eq!(req.path, "/hello/Jörg M+x");
        assert_eq!(req.query.as_deref(), Some("q=a%20b"));
    }

    #[test]
    fn test_percent_decode_path() {
        assert_eq!(percent_decode_path("/plain"), "/plain");
        assert_eq!(percent_decode_path("/a%2fb"), "/a/b");
        assert_eq!(percent_decode_path("/100%"), "/100%");
        assert_eq!(percent_decode_path("/%zz/%4"), "/%zz/%4");
        assert_eq!(percent_decode_path("/%ff"), "/\u{fffd}");
    }

    async fn roundtrip(addr: SocketAddr, raw: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw.as_bytes()).await.unwrap();
        let mut out = String::new();
        stream.read_to_string(&mut out).await.unwrap();
        out
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_serves_over_tcp() {
        let mut router = Router::new();
        router
            .get("/hello/:name", |ctx: &mut Context| {
                let body = format!("hello {}", ctx.param("name").unwrap_or_default());
                ctx.text(StatusCode::OK, body);
            })
            .unwrap();

        let socket = create_optimized_socket(&"127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = socket.local_addr().unwrap().as_socket().unwrap();
        let listener = TcpListener::from_std(socket.into()).unwrap();
        tokio::spawn(serve_listener(Arc::new(router.into()), listener, false));

        let out = roundtrip(addr, "GET /hello/rust HTTP/1.1\r\nHost: test\r\n\r\n").await;
        assert!(out.starts_with("HTTP/1.1 200 OK"));
        assert!(out.ends_with("hello rust"));

        let out = roundtrip(addr, "GET /hello/rust/ HTTP/1.1\r\nHost: test\r\n\r\n").await;
        assert!(out.starts_with("HTTP/1.1 301"));
        assert!(out.contains("location: /hello/rust\r\n"));

        let out = roundtrip(addr, "GET /hello/J%C3%B6rg HTTP/1.1\r\nHost: test\r\n\r\n").await;
        assert!(out.starts_with("HTTP/1.1 200 OK"));
        assert!(out.ends_with("hello Jörg"));

        let out = roundtrip(addr, "BREW /pot HTTP/1.1\r\nHost: test\r\n\r\n").await;
        assert!(out.starts_with("HTTP/1.1 501"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_serves_mounted_files_over_tcp() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("css")).unwrap();
        std::fs::write(dir.path().join("css/app.css"), "h1{color:red}").unwrap();

        let mut router = Router::new();
        router.serve_files("/static/*filepath", dir.path()).unwrap();

        let socket = create_optimized_socket(&"127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = socket.local_addr().unwrap().as_socket().unwrap();
        let listener = TcpListener::from_std(socket.into()).unwrap();
        tokio::spawn(serve_listener(Arc::new(router.into()), listener, false));

        let out = roundtrip(addr, "GET /static/css/app.css HTTP/1.1\r\nHost: test\r\n\r\n").await;
        assert!(out.starts_with("HTTP/1.1 200 OK"));
        assert!(out.contains("content-type: text/css; charset=utf-8\r\n"));
        assert!(out.ends_with("h1{color:red}"));

        let out = roundtrip(addr, "GET /static/missing.css HTTP/1.1\r\nHost: test\r\n\r\n").await;
        assert!(out.starts_with("HTTP/1.1 404"));
    }
}
