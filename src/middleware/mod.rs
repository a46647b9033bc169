//! Middleware pipeline — composable before/after request handler logic.
//!
//! Each middleware wraps the next layer. Code before `next.run(ctx)` sees the
//! request before any handler; code after it sees the handler's response
//! before it is written to the transport. Returning without calling `next`
//! short-circuits the rest of the chain.
//!
//! - [`Middleware`] — trait implemented by all middleware.
//! - [`Next`] — cursor into the remaining chain.
//! - [`MiddlewareHandler`] — type-erased, cheaply-cloneable middleware function.
//! - [`from_middleware`] — converts a [`Middleware`] into a [`MiddlewareHandler`].

use std::{future::Future, pin::Pin, sync::Arc};

use crate::{Response, StatusCode, context::Context};

/// Boxed future returned by every middleware.
pub type BoxResponseFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// A type-erased, reference-counted middleware function.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use rttp_cache::{context::Context, middleware::{BoxResponseFuture, MiddlewareHandler, Next}};
///
/// let handler: MiddlewareHandler = Arc::new(|ctx: Context, next: Next| -> BoxResponseFuture {
///     Box::pin(async move { next.run(ctx).await })
/// });
/// ```
pub type MiddlewareHandler = Arc<dyn Fn(Context, Next) -> BoxResponseFuture + Send + Sync + 'static>;

/// Converts a [`Middleware`] implementation into a [`MiddlewareHandler`].
pub fn from_middleware<M>(middleware: Arc<M>) -> MiddlewareHandler
where
    M: Middleware + 'static,
{
    Arc::new(move |ctx: Context, next: Next| middleware.handle(ctx, next))
}

/// A cursor into the remaining middleware chain for a single request.
///
/// `Next` is consumed by [`run`](Self::run), so each middleware can forward a
/// request at most once.
pub struct Next {
    middlewares: Arc<[MiddlewareHandler]>,
    // Position of the handler invoked by the next `run` call.
    index: usize,
}

impl Next {
    /// Creates a `Next` positioned at the start of `middlewares`.
    pub fn new(middlewares: Arc<[MiddlewareHandler]>) -> Self {
        Self {
            middlewares,
            index: 0,
        }
    }

    /// Invokes the next middleware in the chain and returns its response.
    ///
    /// If the chain is exhausted without any layer producing a response, a
    /// `500 Internal Server Error` is returned.
    pub async fn run(mut self, ctx: Context) -> Response {
        match self.middlewares.get(self.index).cloned() {
            Some(handler) => {
                self.index += 1;
                handler(ctx, self).await
            }
            None => Response::new(StatusCode::INTERNAL_SERVER_ERROR)
                .body("No response generated by middleware pipeline"),
        }
    }
}

/// The core trait for all middleware.
///
/// Implementors may pass through (`next.run(ctx).await`), short-circuit by
/// returning a [`Response`] without calling `next`, or decorate the response
/// `next` returns.
///
/// Implementations must be `Send + Sync` since one instance serves every
/// request, and should not hold locks on shared state across `.await`.
pub trait Middleware: Send + Sync {
    fn handle(&self, ctx: Context, next: Next) -> BoxResponseFuture;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Method, Request};

    struct Tag(&'static str);

    impl Middleware for Tag {
        fn handle(&self, ctx: Context, next: Next) -> BoxResponseFuture {
            let tag = self.0;
            Box::pin(async move {
                let mut response = next.run(ctx).await;
                response.add_header("X-Tag", tag);
                response
            })
        }
    }

    struct Deny;

    impl Middleware for Deny {
        fn handle(&self, _ctx: Context, _next: Next) -> BoxResponseFuture {
            Box::pin(async { Response::new(StatusCode::FORBIDDEN) })
        }
    }

    fn ok_handler() -> MiddlewareHandler {
        Arc::new(|_ctx: Context, _next: Next| -> BoxResponseFuture {
            Box::pin(async { Response::new(StatusCode::OK) })
        })
    }

    fn ctx() -> Context {
        Context::new(Request::new(Method::Get, "/"))
    }

    #[tokio::test]
    async fn empty_chain_is_500() {
        let res = Next::new(Arc::from(Vec::new())).run(ctx()).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn decorators_unwind_in_reverse_order() {
        let chain: Vec<MiddlewareHandler> = vec![
            from_middleware(Arc::new(Tag("outer"))),
            from_middleware(Arc::new(Tag("inner"))),
            ok_handler(),
        ];
        let res = Next::new(chain.into()).run(ctx()).await;
        let tags: Vec<_> = res.headers().get_all("x-tag").collect();
        assert_eq!(tags, vec!["inner", "outer"]);
    }

    #[tokio::test]
    async fn short_circuit_skips_rest_of_chain() {
        let chain: Vec<MiddlewareHandler> = vec![
            from_middleware(Arc::new(Tag("outer"))),
            from_middleware(Arc::new(Deny)),
            ok_handler(),
        ];
        let res = Next::new(chain.into()).run(ctx()).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(res.headers().get("x-tag"), Some("outer"));
    }
}
