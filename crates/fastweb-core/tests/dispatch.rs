use fastweb_core::{
    Context, Error, InsertError, Method, Outcome, Request, RequestBuilder, Router, StatusCode,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn named(name: &'static str) -> impl Fn(&mut Context) + Send + Sync + 'static {
    move |ctx: &mut Context| {
        let mut body = name.to_string();
        for (key, value) in ctx.params().iter() {
            body.push_str(&format!(" {key}={value}"));
        }
        ctx.text(StatusCode::OK, body);
    }
}

fn body(router: &Router, method: Method, path: &str) -> String {
    router
        .dispatch(Request::new(method, path))
        .body_string()
        .unwrap_or_default()
}

#[test]
fn param_route_binds_segment() {
    let mut router = Router::new();
    router.get("/user/:id", named("user")).unwrap();

    assert_eq!(body(&router, Method::Get, "/user/42"), "user id=42");
}

#[test]
fn catch_all_binds_remainder() {
    let mut router = Router::new();
    router.get("/static/*filepath", named("static")).unwrap();

    assert_eq!(
        body(&router, Method::Get, "/static/a/b/c"),
        "static filepath=a/b/c"
    );
}

#[test]
fn params_follow_pattern_order() {
    let mut router = Router::new();
    router
        .get("/repos/:owner/:repo/blob/*path", named("blob"))
        .unwrap();

    assert_eq!(
        body(&router, Method::Get, "/repos/acme/rocket/blob/src/main.rs"),
        "blob owner=acme repo=rocket path=src/main.rs"
    );
}

#[test]
fn trailing_slash_is_redirected_not_served() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let mut router = Router::new();
    router
        .get("/foo", move |_: &mut Context| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    let res = router.dispatch(Request::new(Method::Get, "/foo/"));
    assert_eq!(res.status, StatusCode::MOVED_PERMANENTLY);
    assert_eq!(res.header("location"), Some("/foo"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn conflicting_wildcard_names_fail() {
    let mut router = Router::new();
    router.get("/user/:id", named("by id")).unwrap();

    let err = router.get("/user/:name", named("by name")).unwrap_err();
    assert!(matches!(err, Error::Route(_)));

    // the first route is untouched
    assert_eq!(body(&router, Method::Get, "/user/7"), "by id id=7");
}

#[test]
fn param_and_catch_all_siblings_need_one_name() {
    let mut router = Router::new();
    router.get("/api/:version", named("version")).unwrap();

    let err = router.get("/api/*rest", named("rest")).unwrap_err();
    assert!(matches!(err, Error::Route(InsertError::WildcardConflict { .. })));
    assert!(!router.has_route(Method::Get, "/api/v1/users"));

    router.get("/api/*version", named("rest")).unwrap();
    assert_eq!(body(&router, Method::Get, "/api/v1"), "version version=v1");
    assert_eq!(
        body(&router, Method::Get, "/api/v1/users"),
        "rest version=v1/users"
    );
}

#[test]
fn registration_order_does_not_change_matches() {
    let routes = [
        "/",
        "/cmd/:tool/:sub",
        "/cmd/:tool/",
        "/src/*filepath",
        "/search/",
        "/search/:query",
        "/user/:name",
        "/user/:name/about",
        "/files/:dir/*filepath",
        "/doc/",
        "/doc/go_faq.html",
        "/doc/go1.html",
        "/info/:user/public",
        "/info/:user/project/:project",
    ];
    let paths = [
        "/",
        "/cmd/test/",
        "/cmd/test/3",
        "/src/",
        "/src/some/file.png",
        "/search/",
        "/search/someth!ng+in+ünìcodé",
        "/search/someth!ng+in+ünìcodé/",
        "/user/gopher",
        "/user/gopher/about",
        "/User/Gopher/About/",
        "/files/js/inc/framework.js",
        "/doc/go1.html",
        "/info/gordon/public",
        "/info/gordon/project/go",
        "/nope",
    ];

    let build = |order: &[&'static str]| {
        let mut router = Router::new();
        for &route in order {
            router.get(route, named(route)).unwrap();
        }
        router
    };

    let forward = build(&routes);
    let mut reversed_routes = routes;
    reversed_routes.reverse();
    let reversed = build(&reversed_routes);

    for path in paths {
        let a = forward.dispatch(Request::new(Method::Get, path));
        let b = reversed.dispatch(Request::new(Method::Get, path));
        assert_eq!(a.status, b.status, "status for {path}");
        assert_eq!(a.body, b.body, "body for {path}");
        assert_eq!(a.header("location"), b.header("location"), "location for {path}");
    }
}

#[test]
fn case_mismatch_redirects_to_registered_path() {
    let mut router = Router::new();
    router.get("/Foo", named("foo")).unwrap();

    let mut ctx = Context::new(Request::new(Method::Get, "/foo"));
    assert_eq!(router.serve(&mut ctx), Outcome::CaseFixRedirect);

    let res = ctx.into_response();
    assert_eq!(res.status, StatusCode::MOVED_PERMANENTLY);
    assert_eq!(res.header("location"), Some("/Foo"));
}

#[test]
fn case_fix_uses_temporary_redirect_for_other_methods() {
    let mut router = Router::new();
    router.post("/Upload", named("upload")).unwrap();

    let res = router.dispatch(
        RequestBuilder::new(Method::Post, "/upload")
            .query("resume=1")
            .build(),
    );
    assert_eq!(res.status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(res.header("location"), Some("/Upload?resume=1"));
}

#[test]
fn unregistered_method_gets_405_with_allow() {
    let mut router = Router::new().handle_options(false);
    router.get("/x", named("get")).unwrap();
    router.post("/x", named("post")).unwrap();

    let mut ctx = Context::new(Request::new(Method::Delete, "/x"));
    assert_eq!(router.serve(&mut ctx), Outcome::MethodNotAllowed);

    let res = ctx.into_response();
    assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.header("allow"), Some("GET, POST"));
}

#[test]
fn options_reply_lists_methods() {
    let mut router = Router::new();
    router.get("/x", named("get")).unwrap();
    router.put("/x", named("put")).unwrap();
    router.get("/y", named("get")).unwrap();

    let res = router.dispatch(Request::new(Method::Options, "/x"));
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.header("allow"), Some("GET, OPTIONS, PUT"));

    let res = router.dispatch(Request::new(Method::Options, "*"));
    assert_eq!(res.header("allow"), Some("GET, OPTIONS, PUT"));
}

#[test]
fn asterisk_lists_every_method_whatever_the_request_method() {
    let mut router = Router::new();
    router.get("/x", named("get")).unwrap();
    router.post("/y", named("post")).unwrap();

    let res = router.dispatch(Request::new(Method::Get, "*"));
    assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.header("allow"), Some("GET, OPTIONS, POST"));

    let res = router.dispatch(Request::new(Method::Post, "*"));
    assert_eq!(res.header("allow"), Some("GET, OPTIONS, POST"));
}

#[test]
fn unknown_path_is_404() {
    let mut router = Router::new();
    router.get("/x", named("get")).unwrap();

    let mut ctx = Context::new(Request::new(Method::Get, "/missing"));
    assert_eq!(router.serve(&mut ctx), Outcome::NotFound);
    assert_eq!(ctx.response().status, StatusCode::NOT_FOUND);

    // no tree at all for this method
    let res = router.dispatch(Request::new(Method::Patch, "/missing"));
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[test]
fn panics_stay_inside_the_request() {
    let mut router = Router::new();
    router
        .get("/boom", |_: &mut Context| panic!("handler failure"))
        .unwrap();
    router.get("/fine", named("fine")).unwrap();

    let res = router.dispatch(Request::new(Method::Get, "/boom"));
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);

    // the router keeps serving
    assert_eq!(body(&router, Method::Get, "/fine"), "fine");
}

#[test]
fn groups_and_file_mounts() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("css")).unwrap();
    std::fs::write(root.join("css/app.css"), "h1{}").unwrap();

    let mut router = Router::new();
    {
        let mut api = router.group("/api");
        api.get("/ping", named("pong")).unwrap();
        api.serve_files("/assets/*filepath", root).unwrap();
    }

    assert_eq!(body(&router, Method::Get, "/api/ping"), "pong");

    let res = router.dispatch(Request::new(Method::Get, "/api/assets/css/app.css"));
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body_string().as_deref(), Some("h1{}"));
    assert_eq!(res.content_type(), Some("text/css; charset=utf-8"));

    let res = router.dispatch(Request::new(Method::Get, "/api/assets/../secret"));
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    assert!(matches!(
        router.serve_files("/files", root),
        Err(Error::InvalidPath(_))
    ));
}
