//! Opt-in response caching.
//!
//! Handlers decide which responses are cached; nothing is derived from
//! `Cache-Control` or other response headers.
//!
//! - [`ResponseCaching`] — middleware holding the two interception points:
//!   lookup before the handler, store after it.
//! - [`CacheContextExt`] — the handler-side opt-in (`ctx.cache(...)`).
//! - [`ResponseStore`] — bounded concurrent map with per-entry expiration.
//! - [`CacheKey`] / [`CachedEntry`] — what is stored and under which identity.
//! - [`Sweeper`](crate::background::Sweeper) — periodic purge of expired entries.
//!
//! Expired entries are removed in two places. A lookup that finds one drops
//! it and reports a miss, so nothing stale is ever served. The sweeper drops
//! the ones nobody asks for again, so cold keys do not hold memory until
//! capacity pressure evicts them.
//!
//! ```rust,no_run
//! use rttp_cache::{App, Response, Router, StatusCode};
//! use rttp_cache::cache::{CacheContextExt, CacheOptions, ResponseCachingConfig};
//!
//! # fn build() -> Result<App, rttp_cache::cache::CacheError> {
//! let mut router = Router::new();
//! router.get("/catalog", |ctx| async move {
//!     ctx.cache(CacheOptions::new());
//!     Response::new(StatusCode::OK).body("catalog")
//! });
//!
//! let app = App::builder()
//!     .with_response_caching(ResponseCachingConfig::default())?
//!     .build(router);
//! # Ok(app)
//! # }
//! ```

mod config;
mod entry;
mod error;
mod intent;
mod key;
mod middleware;
mod stats;
mod store;

pub use config::{MAXIMUM_DURATION, ResponseCachingConfig};
pub use entry::CachedEntry;
pub use error::CacheError;
pub use intent::{CacheContextExt, CacheOptions, CachingIntent};
pub use key::CacheKey;
pub use middleware::ResponseCaching;
pub use stats::{CacheStats, CacheStatsSnapshot};
pub use store::ResponseStore;
