//! # rttp-cache
//!
//! Opt-in HTTP response caching for an async HTTP/1.1 pipeline.
//!
//! Handlers mark responses as cacheable; a middleware serves later identical
//! requests from an in-memory, size-bounded store until the entry expires,
//! and a background sweeper drops expired entries nobody asks for again.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use rttp_cache::cache::{CacheContextExt, CacheOptions, ResponseCachingConfig};
//! use rttp_cache::server::Server;
//! use rttp_cache::{App, Response, Router, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut router = Router::new();
//!     router.get("/report", |ctx| async move {
//!         ctx.cache(CacheOptions::new().duration(Duration::from_secs(60)));
//!         Response::new(StatusCode::OK).body("expensive report")
//!     });
//!
//!     let app = App::builder()
//!         .with_response_caching(ResponseCachingConfig::default())?
//!         .build(router);
//!
//!     Server::bind("127.0.0.1:8080").await?.serve(Arc::new(app)).await?;
//!     Ok(())
//! }
//! ```

// ── Response caching ──────────────────────────────────────────────────────────
pub mod background;
pub mod cache;

// ── Host pipeline ─────────────────────────────────────────────────────────────
pub mod app;
pub mod context;
pub mod http;
pub mod middleware;
pub mod router;
pub mod server;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use app::{App, AppBuilder};
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use router::Router;
pub use server::{Server, ServerError};
