//! Request routing — map URL patterns and HTTP methods to handler functions.
//!
//! | Pattern              | Example match              | Captured params                 |
//! |----------------------|----------------------------|---------------------------------|
//! | `/users`             | `/users`                   | *(none)*                        |
//! | `/users/:id`         | `/users/42`                | `id → "42"`                     |
//! | `/files/*`           | `/files/docs/readme.txt`   | `wildcard → "/docs/readme.txt"` |
//!
//! Trailing slashes are normalized on both patterns and incoming paths when
//! matching. Routes are matched in registration order; the first route whose
//! method and pattern both match wins.

use std::future::Future;
use std::sync::Arc;

use crate::context::{Context, PathParams};
use crate::middleware::{BoxResponseFuture, MiddlewareHandler, Next};
use crate::{Method, Request, Response, StatusCode};

/// Type-erased async handler that turns a [`Context`] into a [`Response`].
pub type Handler = Arc<dyn Fn(Context) -> BoxResponseFuture + Send + Sync + 'static>;

#[derive(Debug, Clone)]
enum Segment {
    Static(String),
    Parameter(String),
}

#[derive(Debug, Clone)]
enum Pattern {
    Exact(String),
    Parameterized { segments: Vec<Segment> },
    // Prefix before the trailing `/*`.
    Wildcard(String),
}

fn trim_trailing_slash(path: &str) -> &str {
    if path != "/" {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}

impl Pattern {
    fn parse(pattern: &str) -> Self {
        let pattern = trim_trailing_slash(pattern);

        if let Some(prefix) = pattern.strip_suffix("/*") {
            return Pattern::Wildcard(prefix.to_string());
        }

        if pattern.contains(':') {
            let segments = pattern
                .split('/')
                .filter(|s| !s.is_empty())
                .map(|s| match s.strip_prefix(':') {
                    Some(name) => Segment::Parameter(name.to_string()),
                    None => Segment::Static(s.to_string()),
                })
                .collect();
            return Pattern::Parameterized { segments };
        }

        Pattern::Exact(pattern.to_string())
    }

    fn matches(&self, path: &str) -> Option<PathParams> {
        let path = trim_trailing_slash(path);

        match self {
            Pattern::Exact(p) => (p == path).then(PathParams::new),
            Pattern::Parameterized { segments } => {
                let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
                if segments.len() != path_segments.len() {
                    return None;
                }

                let mut params = PathParams::new();
                for (seg, actual) in segments.iter().zip(path_segments) {
                    match seg {
                        Segment::Static(s) if s != actual => return None,
                        Segment::Static(_) => {}
                        Segment::Parameter(name) => {
                            params.insert(name.clone(), actual.to_string());
                        }
                    }
                }
                Some(params)
            }
            Pattern::Wildcard(prefix) => path.strip_prefix(prefix.as_str()).map(|suffix| {
                let mut params = PathParams::new();
                params.insert("wildcard".to_string(), suffix.to_string());
                params
            }),
        }
    }
}

struct Route {
    method: Method,
    pattern: Pattern,
    handler: Handler,
}

impl Route {
    fn matches(&self, method: &Method, path: &str) -> Option<PathParams> {
        if &self.method == method {
            self.pattern.matches(path)
        } else {
            None
        }
    }
}

/// HTTP request router.
///
/// When no route matches, a `404 Not Found` response is returned.
///
/// # Examples
///
/// ```rust,no_run
/// use rttp_cache::{Router, Response, StatusCode};
///
/// let mut router = Router::new();
/// router.get("/ping", |_ctx| async { Response::new(StatusCode::OK) });
/// router.get("/users/:id", |ctx| async move {
///     let id = ctx.params().get("id").unwrap_or("unknown").to_owned();
///     Response::new(StatusCode::OK).body(id)
/// });
/// ```
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<H, F>(&mut self, path: &str, handler: H)
    where
        H: Fn(Context) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
    {
        self.add_route(Method::Get, path, handler);
    }

    pub fn post<H, F>(&mut self, path: &str, handler: H)
    where
        H: Fn(Context) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
    {
        self.add_route(Method::Post, path, handler);
    }

    /// Registers a handler for an arbitrary method.
    pub fn add_route<H, F>(&mut self, method: Method, path: &str, handler: H)
    where
        H: Fn(Context) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |ctx| -> BoxResponseFuture { Box::pin(handler(ctx)) });
        self.routes.push(Route {
            method,
            pattern: Pattern::parse(path),
            handler,
        });
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Dispatches `request` in a fresh context.
    pub async fn route(&self, request: Request) -> Response {
        self.dispatch(Context::new(request)).await
    }

    /// Dispatches an existing context, keeping whatever extensions middleware
    /// attached to it.
    pub async fn dispatch(&self, mut ctx: Context) -> Response {
        let request = ctx.request();
        let matched = self
            .routes
            .iter()
            .find_map(|route| Some((route, route.matches(request.method(), request.path())?)));

        match matched {
            Some((route, params)) => {
                let handler = Arc::clone(&route.handler);
                ctx.set_params(params);
                handler(ctx).await
            }
            None => Response::new(StatusCode::NOT_FOUND),
        }
    }

    /// Turns the router into the terminal layer of a middleware chain.
    pub fn into_middleware(self) -> MiddlewareHandler {
        let router = Arc::new(self);
        Arc::new(move |ctx: Context, _next: Next| -> BoxResponseFuture {
            let router = Arc::clone(&router);
            Box::pin(async move { router.dispatch(ctx).await })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_request(method: &str, path: &str) -> Request {
        Request::new(method.parse().unwrap(), path)
    }

    #[test]
    fn pattern_parse_variants() {
        assert!(matches!(Pattern::parse("/"), Pattern::Exact(s) if s == "/"));
        assert!(matches!(Pattern::parse("/users/"), Pattern::Exact(s) if s == "/users"));
        assert!(matches!(Pattern::parse("/files/*"), Pattern::Wildcard(s) if s == "/files"));
        match Pattern::parse("/users/:id/posts/:post_id") {
            Pattern::Parameterized { segments } => {
                assert_eq!(segments.len(), 4);
                assert!(matches!(&segments[3], Segment::Parameter(s) if s == "post_id"));
            }
            other => panic!("expected Parameterized, got {other:?}"),
        }
    }

    #[test]
    fn pattern_param_extracts_values() {
        let pat = Pattern::parse("/users/:id/posts/:post_id");
        let params = pat.matches("/users/7/posts/99").unwrap();
        assert_eq!(params.get("id"), Some("7"));
        assert_eq!(params.get("post_id"), Some("99"));
        assert!(pat.matches("/users/7").is_none());
        assert!(pat.matches("/people/7/posts/99").is_none());
    }

    #[test]
    fn pattern_wildcard_captures_suffix() {
        let pat = Pattern::parse("/files/*");
        let params = pat.matches("/files/docs/readme.txt").unwrap();
        assert_eq!(params.get("wildcard"), Some("/docs/readme.txt"));
        assert!(pat.matches("/other/readme.txt").is_none());
    }

    #[test]
    fn pattern_exact_ignores_trailing_slash() {
        let pat = Pattern::parse("/users");
        assert!(pat.matches("/users/").is_some());
        assert!(pat.matches("/posts").is_none());
    }

    #[tokio::test]
    async fn unmatched_method_or_path_is_404() {
        let mut router = Router::new();
        router.get("/hello", |_ctx| async { Response::new(StatusCode::OK) });
        let res = router.route(make_request("POST", "/hello")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let res = router.route(make_request("GET", "/world")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn one_path_routes_per_method() {
        let mut router = Router::new();
        router.get("/items", |_ctx| async { Response::new(StatusCode::OK) });
        router.post("/items", |_ctx| async { Response::new(StatusCode::CREATED) });
        router.add_route(Method::Head, "/items", |_ctx| async {
            Response::new(StatusCode::NO_CONTENT)
        });

        assert_eq!(router.route(make_request("GET", "/items")).await.status(), StatusCode::OK);
        assert_eq!(
            router.route(make_request("POST", "/items")).await.status(),
            StatusCode::CREATED
        );
        assert_eq!(
            router.route(make_request("HEAD", "/items")).await.status(),
            StatusCode::NO_CONTENT
        );
    }

    #[tokio::test]
    async fn first_matching_route_wins() {
        let mut router = Router::new();
        router.get("/path", |_ctx| async { Response::new(StatusCode::OK) });
        router.get("/path", |_ctx| async { Response::new(StatusCode::ACCEPTED) });
        assert_eq!(router.len(), 2);
        let res = router.route(make_request("GET", "/path")).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn dispatch_keeps_extensions_and_sets_params() {
        struct Greeting(&'static str);

        let mut router = Router::new();
        router.get("/users/:id", |ctx: Context| async move {
            let greeting = ctx.extensions().get::<Greeting>().map_or("", |g| g.0);
            let id = ctx.params().get("id").unwrap_or_default();
            Response::new(StatusCode::OK).body(format!("{greeting} {id}"))
        });

        let mut ctx = Context::new(make_request("GET", "/users/42"));
        ctx.extensions_mut().insert(Greeting("hi"));
        let res = router.dispatch(ctx).await;
        assert_eq!(res.payload().as_ref(), b"hi 42");
    }
}
