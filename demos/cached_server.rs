//! A server with one slow, cacheable endpoint.
//!
//! ```text
//! RUST_LOG=rttp_cache=debug cargo run --example cached_server
//! curl -i 'http://127.0.0.1:8080/report?region=eu'   # slow, stored
//! curl -i 'http://127.0.0.1:8080/report?region=eu'   # instant, from cache
//! curl -i  http://127.0.0.1:8080/stats
//! ```

use std::sync::Arc;
use std::time::Duration;

use rttp_cache::cache::{CacheContextExt, CacheOptions, ResponseCaching, ResponseCachingConfig};
use rttp_cache::context::Context;
use rttp_cache::server::Server;
use rttp_cache::{App, Response, Router, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ResponseCachingConfig::new()
        .with_default_duration(Duration::from_secs(60))
        .with_maximum_size(256)
        .with_sweep_interval(Duration::from_secs(15));
    let caching = ResponseCaching::new(config)?;
    let store = Arc::clone(caching.store());

    let mut router = Router::new();
    router.get("/report", |ctx: Context| async move {
        ctx.cache(
            CacheOptions::new()
                .statuses([StatusCode::OK, StatusCode::NON_AUTHORITATIVE_INFORMATION])
                .duration(Duration::from_secs(20)),
        );
        let region = ctx.request().query_param("region").unwrap_or("global").to_owned();
        tokio::time::sleep(Duration::from_secs(2)).await;
        Response::new(StatusCode::OK)
            .header("Content-Type", "text/plain")
            .body(format!("report for {region}\n"))
    });
    router.get("/stats", move |_ctx: Context| {
        let store = Arc::clone(&store);
        async move {
            match serde_json::to_string(&store.stats()) {
                Ok(json) => Response::new(StatusCode::OK)
                    .header("Content-Type", "application/json")
                    .body(json),
                Err(e) => Response::new(StatusCode::INTERNAL_SERVER_ERROR).body(e.to_string()),
            }
        }
    });

    let app = App::builder().with_response_caching_layer(caching).build(router);

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    Server::bind("127.0.0.1:8080")
        .await?
        .serve_with_shutdown(Arc::new(app), shutdown)
        .await?;
    Ok(())
}
