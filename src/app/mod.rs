//! Application — the middleware stack, the router at its end, and the
//! background tasks that live as long as the application does.

use std::sync::Arc;

use tracing::info;

use crate::background::{BackgroundTask, TaskSet};
use crate::cache::{CacheError, ResponseCaching, ResponseCachingConfig};
use crate::context::Context;
use crate::middleware::{Middleware, MiddlewareHandler, Next, from_middleware};
use crate::{Request, Response, Router};

/// A fully assembled request pipeline.
///
/// ```rust,no_run
/// use rttp_cache::{App, Method, Request, Response, Router, StatusCode};
///
/// # async fn demo() {
/// let mut router = Router::new();
/// router.get("/ping", |_ctx| async { Response::new(StatusCode::OK).body("pong") });
///
/// let app = App::builder().build(router);
/// let response = app.handle(Request::new(Method::Get, "/ping")).await;
/// assert_eq!(response.status(), StatusCode::OK);
/// # }
/// ```
pub struct App {
    chain: Arc<[MiddlewareHandler]>,
    tasks: TaskSet,
    response_caching: Option<ResponseCaching>,
}

impl App {
    pub fn builder() -> AppBuilder {
        AppBuilder::default()
    }

    /// Runs `request` through every middleware and the router.
    pub async fn handle(&self, request: Request) -> Response {
        Next::new(Arc::clone(&self.chain))
            .run(Context::new(request))
            .await
    }

    /// Spawns the registered background tasks. Needs a Tokio runtime.
    pub fn start(&self) {
        self.tasks.start();
        info!(tasks = self.tasks.running(), "application started");
    }

    /// Stops background tasks and waits for them to exit.
    pub async fn shutdown(&self) {
        self.tasks.shutdown().await;
        info!("application stopped");
    }

    /// The response caching layer, if installed.
    pub fn response_caching(&self) -> Option<&ResponseCaching> {
        self.response_caching.as_ref()
    }
}

/// Builder for [`App`]. Middleware runs in the order it is added.
#[derive(Default)]
pub struct AppBuilder {
    middlewares: Vec<MiddlewareHandler>,
    tasks: TaskSet,
    response_caching: Option<ResponseCaching>,
}

impl AppBuilder {
    /// Appends a middleware layer.
    #[must_use]
    pub fn middleware<M>(mut self, middleware: M) -> Self
    where
        M: Middleware + 'static,
    {
        self.middlewares.push(from_middleware(Arc::new(middleware)));
        self
    }

    /// Registers a task started by [`App::start`].
    #[must_use]
    pub fn task(self, task: impl BackgroundTask) -> Self {
        self.tasks.register(task);
        self
    }

    /// Installs response caching at this point of the middleware stack and
    /// registers its sweeper.
    ///
    /// # Errors
    ///
    /// [`CacheError::InvalidConfig`] if `config` does not validate.
    pub fn with_response_caching(self, config: ResponseCachingConfig) -> Result<Self, CacheError> {
        let caching = ResponseCaching::new(config)?;
        Ok(self.with_response_caching_layer(caching))
    }

    /// Installs an already built caching layer, e.g. one whose store is
    /// inspected elsewhere.
    #[must_use]
    pub fn with_response_caching_layer(mut self, caching: ResponseCaching) -> Self {
        self.tasks.register(caching.sweeper());
        self.response_caching = Some(caching.clone());
        self.middleware(caching)
    }

    pub fn build(mut self, router: Router) -> App {
        self.middlewares.push(router.into_middleware());
        App {
            chain: self.middlewares.into(),
            tasks: self.tasks,
            response_caching: self.response_caching,
        }
    }
}
