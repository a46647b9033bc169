use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::CacheError;
use crate::context::Context;
use crate::http::StatusCode;

/// A handler's request to have its response cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachingIntent {
    statuses: Vec<StatusCode>,
    duration: Duration,
}

impl CachingIntent {
    pub fn new(statuses: Vec<StatusCode>, duration: Duration) -> Self {
        Self { statuses, duration }
    }

    pub fn statuses(&self) -> &[StatusCode] {
        &self.statuses
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn accepts(&self, status: StatusCode) -> bool {
        self.statuses.contains(&status)
    }
}

/// Parameters for [`CacheContextExt::cache`].
///
/// With no statuses given only `200 OK` is cached; with no duration the
/// configured default applies.
///
/// ```
/// use std::time::Duration;
/// use rttp_cache::cache::CacheOptions;
/// use rttp_cache::http::StatusCode;
///
/// let options = CacheOptions::new()
///     .status(StatusCode::OK)
///     .status(StatusCode::CREATED)
///     .duration(Duration::from_secs(120));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    statuses: Vec<StatusCode>,
    duration: Option<Duration>,
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one accepted status.
    #[must_use]
    pub fn status(mut self, status: StatusCode) -> Self {
        self.statuses.push(status);
        self
    }

    /// Adds several accepted statuses.
    #[must_use]
    pub fn statuses(mut self, statuses: impl IntoIterator<Item = StatusCode>) -> Self {
        self.statuses.extend(statuses);
        self
    }

    /// Overrides the configured default duration for this response.
    #[must_use]
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    fn into_intent(self, default_duration: Duration) -> CachingIntent {
        let statuses = if self.statuses.is_empty() {
            vec![StatusCode::OK]
        } else {
            self.statuses
        };
        CachingIntent::new(statuses, self.duration.unwrap_or(default_duration))
    }
}

/// Per-request handle the caching middleware attaches to the context.
///
/// Its presence is what marks the pipeline as having response caching
/// installed. The middleware keeps the other half of `intent` and reads it
/// once the handler has returned.
pub(crate) struct CachingSlot {
    pub(crate) default_duration: Duration,
    pub(crate) intent: Arc<Mutex<Option<CachingIntent>>>,
}

/// Opt-in API for handlers.
///
/// ```rust,no_run
/// use rttp_cache::{Response, Router, StatusCode};
/// use rttp_cache::cache::{CacheContextExt, CacheOptions};
///
/// let mut router = Router::new();
/// router.get("/report", |ctx| async move {
///     ctx.cache(CacheOptions::new());
///     Response::new(StatusCode::OK).body("expensive report")
/// });
/// ```
pub trait CacheContextExt {
    /// Marks this request's response as cacheable.
    ///
    /// Calling it again replaces the earlier options.
    ///
    /// # Panics
    ///
    /// Panics if response caching is not installed in the pipeline serving
    /// this request. That is a wiring mistake, not a runtime condition.
    fn cache(&self, options: CacheOptions);

    /// Like [`cache`](Self::cache) but reports a missing installation as
    /// [`CacheError::NotInstalled`].
    fn try_cache(&self, options: CacheOptions) -> Result<(), CacheError>;
}

impl CacheContextExt for Context {
    fn cache(&self, options: CacheOptions) {
        if let Err(err) = self.try_cache(options) {
            panic!("{err}: install it with AppBuilder::with_response_caching");
        }
    }

    fn try_cache(&self, options: CacheOptions) -> Result<(), CacheError> {
        let slot = self
            .extensions()
            .get::<CachingSlot>()
            .ok_or(CacheError::NotInstalled)?;
        let intent = options.into_intent(slot.default_duration);
        *slot.intent.lock() = Some(intent);
        Ok(())
    }
}
