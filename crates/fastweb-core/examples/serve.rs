//! Serves a small API and the current directory.
//!
//! ```sh
//! RUST_LOG=fastweb_core=debug cargo run -p fastweb-core --example serve --features native
//! curl -i localhost:3000/hello/world
//! curl -i localhost:3000/Hello/world/   # 301 to /hello/world
//! curl -i -X DELETE localhost:3000/hello/world   # 405
//! ```

use fastweb_core::server::{self, ServerConfig, ServerState};
use fastweb_core::{logging, Context, Router, StatusCode};

fn main() -> fastweb_core::Result<()> {
    logging::init("info")?;

    let mut router = Router::new().panic_handler(|ctx: &mut Context| {
        let message = ctx.recovered().unwrap_or("unknown").to_string();
        ctx.json(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!(r#"{{"error":{message:?}}}"#),
        );
    });

    router.get("/hello/:name", |ctx: &mut Context| {
        let body = format!("Hello, {}!", ctx.param("name").unwrap_or("stranger"));
        ctx.text(StatusCode::OK, body);
    })?;
    router.get("/panic", |_: &mut Context| panic!("requested a panic"))?;

    let mut api = router.group("/api");
    api.get("/health", |ctx: &mut Context| {
        ctx.json(StatusCode::OK, r#"{"status":"ok"}"#)
    })?;
    api.post("/echo", |ctx: &mut Context| {
        let body = ctx.body().clone();
        ctx.set_body(body);
    })?;

    router.serve_files("/static/*filepath", ".")?;

    let config = ServerConfig::default().port(3000);
    server::run(ServerState::new(router), config)
}
