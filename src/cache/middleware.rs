use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::intent::CachingSlot;
use super::{CacheError, CacheKey, CachedEntry, CachingIntent, ResponseCachingConfig, ResponseStore};
use crate::background::Sweeper;
use crate::context::Context;
use crate::http::Response;
use crate::middleware::{BoxResponseFuture, Middleware, Next};

/// Response caching middleware.
///
/// Before the handler runs it looks the request up in the store and, on a
/// fresh hit, answers with the stored response without running the handler.
/// After the handler runs it stores the response if the handler opted in
/// through [`CacheContextExt`](super::CacheContextExt) and the status is one
/// it accepted.
///
/// Cloning is cheap; clones share the same store.
#[derive(Clone, Debug)]
pub struct ResponseCaching {
    store: Arc<ResponseStore>,
    config: ResponseCachingConfig,
}

impl ResponseCaching {
    /// Validates `config` and builds a fresh store for it.
    pub fn new(config: ResponseCachingConfig) -> Result<Self, CacheError> {
        config.validate()?;
        let store = Arc::new(ResponseStore::new(config.maximum_size()));
        Ok(Self { store, config })
    }

    pub fn store(&self) -> &Arc<ResponseStore> {
        &self.store
    }

    pub fn config(&self) -> &ResponseCachingConfig {
        &self.config
    }

    /// Builds the background task that purges expired entries from this store.
    pub fn sweeper(&self) -> Sweeper {
        Sweeper::new(Arc::clone(&self.store), self.config.sweep_interval())
    }

    /// Request-side interception point.
    ///
    /// Returns the response to serve for a fresh hit. An expired entry is
    /// invalidated and reported as a miss, so a stale response is never
    /// served.
    pub fn intercept_request(&self, key: &CacheKey) -> Option<Response> {
        let counters = self.store.counters();
        let Some(entry) = self.store.get(key) else {
            counters.record_miss();
            trace!(key = %key, "cache miss");
            return None;
        };

        let now = Instant::now();
        if entry.is_expired_at(now) {
            self.store.invalidate_expired(key, now);
            counters.record_miss();
            trace!(key = %key, "cache entry expired");
            return None;
        }

        counters.record_hit();
        trace!(key = %key, status = %entry.status(), "cache hit");
        Some(entry.to_response())
    }

    /// Response-side interception point.
    ///
    /// Stores `response` under `key` when `intent` is present and accepts the
    /// response status. Returns `true` if the response was stored.
    pub fn intercept_response(
        &self,
        key: CacheKey,
        intent: Option<&CachingIntent>,
        response: &Response,
    ) -> bool {
        let Some(intent) = intent else {
            return false;
        };
        if !intent.accepts(response.status()) {
            trace!(key = %key, status = %response.status(), "status not accepted for caching");
            return false;
        }

        let duration = intent.duration();
        let Some(expires_at) = Instant::now().checked_add(duration) else {
            debug!(key = %key, ?duration, "cache duration overflows the clock; not caching");
            return false;
        };

        debug!(key = %key, ?duration, "caching response");
        self.store
            .put(key, CachedEntry::from_response(response, expires_at));
        self.store.counters().record_store();
        true
    }
}

impl Middleware for ResponseCaching {
    fn handle(&self, mut ctx: Context, next: Next) -> BoxResponseFuture {
        let this = self.clone();
        Box::pin(async move {
            let key = CacheKey::from_request(ctx.request());
            if let Some(cached) = this.intercept_request(&key) {
                return cached;
            }

            let intent = Arc::new(Mutex::new(None));
            ctx.extensions_mut().insert(CachingSlot {
                default_duration: this.config.default_duration(),
                intent: Arc::clone(&intent),
            });

            let response = next.run(ctx).await;
            let intent = intent.lock().take();
            this.intercept_response(key, intent.as_ref(), &response);
            response
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::http::{Method, Request, StatusCode};

    fn caching() -> ResponseCaching {
        ResponseCaching::new(ResponseCachingConfig::new()).unwrap()
    }

    fn key(target: &str) -> CacheKey {
        CacheKey::from_request(&Request::new(Method::Get, target))
    }

    fn intent(statuses: &[StatusCode], secs: u64) -> CachingIntent {
        CachingIntent::new(statuses.to_vec(), Duration::from_secs(secs))
    }

    #[test]
    fn rejects_invalid_config() {
        let config = ResponseCachingConfig::new().with_maximum_size(0);
        assert!(matches!(
            ResponseCaching::new(config),
            Err(CacheError::InvalidConfig(_))
        ));
    }

    #[test]
    fn no_intent_stores_nothing() {
        let caching = caching();
        let response = Response::new(StatusCode::OK).body("x");
        assert!(!caching.intercept_response(key("/a"), None, &response));
        assert!(caching.store().is_empty());
    }

    #[test]
    fn unaccepted_status_stores_nothing() {
        let caching = caching();
        let response = Response::new(StatusCode::NOT_FOUND);
        let intent = intent(&[StatusCode::OK], 30);
        assert!(!caching.intercept_response(key("/a"), Some(&intent), &response));
        assert!(caching.store().get(&key("/a")).is_none());
    }

    #[test]
    fn accepted_status_is_stored_and_served() {
        let caching = caching();
        let response = Response::new(StatusCode::CREATED)
            .header("Content-Type", "application/json")
            .body("{}");
        let intent = intent(&[StatusCode::OK, StatusCode::CREATED], 30);
        assert!(caching.intercept_response(key("/a"), Some(&intent), &response));

        let served = caching.intercept_request(&key("/a")).unwrap();
        assert_eq!(served.status(), StatusCode::CREATED);
        assert_eq!(served.headers().get("content-type"), Some("application/json"));
        assert_eq!(served.payload().as_ref(), b"{}");
        assert!(caching.intercept_request(&key("/b")).is_none());

        let stats = caching.store().stats();
        assert_eq!((stats.hits, stats.misses, stats.stores), (1, 1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn entry_is_served_until_its_deadline_and_then_invalidated() {
        let caching = caching();
        let response = Response::new(StatusCode::OK).body("fresh");
        caching.intercept_response(key("/a"), Some(&intent(&[StatusCode::OK], 10)), &response);

        tokio::time::advance(Duration::from_millis(9_999)).await;
        assert!(caching.intercept_request(&key("/a")).is_some());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(caching.intercept_request(&key("/a")).is_none());
        assert!(caching.store().get(&key("/a")).is_none());
        assert_eq!(caching.store().stats().expirations, 1);
    }

    #[test]
    fn unrepresentable_deadline_is_not_stored() {
        let caching = caching();
        let response = Response::new(StatusCode::OK);
        let intent = CachingIntent::new(vec![StatusCode::OK], Duration::MAX);
        assert!(!caching.intercept_response(key("/a"), Some(&intent), &response));
        assert!(caching.store().is_empty());
    }

    #[test]
    fn clones_share_the_store() {
        let caching = caching();
        let clone = caching.clone();
        let response = Response::new(StatusCode::OK);
        clone.intercept_response(key("/a"), Some(&intent(&[StatusCode::OK], 30)), &response);
        assert_eq!(caching.store().len(), 1);
    }

    #[test]
    fn independent_instances_do_not_share_entries() {
        let first = caching();
        let second = caching();
        let response = Response::new(StatusCode::OK);
        first.intercept_response(key("/a"), Some(&intent(&[StatusCode::OK], 30)), &response);
        assert!(second.intercept_request(&key("/a")).is_none());
    }
}
