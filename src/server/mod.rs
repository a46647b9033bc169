//! Async TCP server using Tokio.
//!
//! Accepts TCP connections and runs each HTTP/1.1 request through an
//! [`App`]. Supports persistent connections (keep-alive) and stops accepting
//! on a [`CancellationToken`], stopping the application's background tasks
//! on the way out.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::App;
use crate::http::{
    StatusCode,
    request::{Request, RequestError},
    response::Response,
};

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Maximum size of a complete HTTP request we will buffer before rejecting it (8 MiB).
const MAX_REQUEST_SIZE: usize = 8 * 1024 * 1024;

/// Initial read buffer capacity per connection.
const INITIAL_BUF_SIZE: usize = 4096;

/// The HTTP server.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use rttp_cache::{App, Response, Router, StatusCode};
/// use rttp_cache::server::Server;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut router = Router::new();
///     router.get("/", |_ctx| async { Response::new(StatusCode::OK).body("Hello!") });
///
///     let server = Server::bind("127.0.0.1:8080").await?;
///     server.serve(Arc::new(App::builder().build(router))).await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Binds the server to the given TCP address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound.
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self, ServerError> {
        let addr = addr.as_ref();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.to_owned(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves `app` until the process exits.
    pub async fn serve(self, app: Arc<App>) -> Result<(), ServerError> {
        self.serve_with_shutdown(app, CancellationToken::new()).await
    }

    /// Serves `app` until `shutdown` is cancelled.
    ///
    /// Starts the app's background tasks first and shuts them down after the
    /// accept loop ends. Connections already in flight finish on their own.
    pub async fn serve_with_shutdown(
        self,
        app: Arc<App>,
        shutdown: CancellationToken,
    ) -> Result<(), ServerError> {
        app.start();
        info!(address = %self.local_addr, "listening");

        loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };

            let (stream, peer_addr) = match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            debug!(peer = %peer_addr, "connection accepted");
            let app = Arc::clone(&app);

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer_addr, app).await {
                    warn!(peer = %peer_addr, error = %e, "connection closed with error");
                }
            });
        }

        info!(address = %self.local_addr, "shutting down");
        app.shutdown().await;
        Ok(())
    }
}

/// Handles a single TCP connection over its lifetime, one request per loop
/// iteration, until the peer closes or either side asks for `Connection: close`.
async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    app: Arc<App>,
) -> Result<(), std::io::Error> {
    let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);

    loop {
        // Pipelined requests may already be buffered.
        if buf.is_empty() && stream.read_buf(&mut buf).await? == 0 {
            debug!(peer = %peer_addr, "connection closed by peer");
            break;
        }

        if buf.len() > MAX_REQUEST_SIZE {
            warn!(peer = %peer_addr, "request too large — sending 413");
            let response = Response::new(StatusCode::PAYLOAD_TOO_LARGE)
                .body("Request entity too large")
                .keep_alive(false);
            stream.write_all(&response.into_bytes()).await?;
            break;
        }

        let (request, body_offset) = match Request::parse(&buf) {
            Ok(pair) => pair,
            Err(RequestError::Incomplete) => {
                if stream.read_buf(&mut buf).await? == 0 {
                    break;
                }
                continue;
            }
            Err(e) => {
                warn!(peer = %peer_addr, error = %e, "bad request — sending 400");
                let response = Response::new(StatusCode::BAD_REQUEST)
                    .body(format!("Bad Request: {e}"))
                    .keep_alive(false);
                stream.write_all(&response.into_bytes()).await?;
                break;
            }
        };

        // Wait for the full body when Content-Length says more is coming.
        let total_needed = body_offset + request.content_length().unwrap_or(0);
        if buf.len() < total_needed {
            if stream.read_buf(&mut buf).await? == 0 {
                break;
            }
            continue;
        }

        let keep_alive = request.is_keep_alive();
        debug!(
            peer = %peer_addr,
            method = %request.method(),
            path = %request.path(),
            "dispatching request"
        );

        let mut response = app.handle(request).await;
        if !keep_alive {
            response.set_keep_alive(false);
        }
        stream.write_all(&response.into_bytes()).await?;
        stream.flush().await?;

        let _ = buf.split_to(total_needed);

        if !keep_alive {
            debug!(peer = %peer_addr, "Connection: close — shutting down");
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheContextExt, CacheOptions, ResponseCachingConfig};
    use crate::Router;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn roundtrip(addr: SocketAddr, raw: &[u8]) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw).await.unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn serves_cached_response_over_tcp_and_shuts_down() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut router = Router::new();
        router.get("/n", move |ctx: crate::context::Context| {
            let counter = Arc::clone(&counter);
            async move {
                ctx.cache(CacheOptions::new());
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Response::new(StatusCode::OK).body(n.to_string())
            }
        });
        let app = App::builder()
            .with_response_caching(ResponseCachingConfig::default())
            .unwrap()
            .build(router);

        let server = Server::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(server.serve_with_shutdown(Arc::new(app), shutdown.clone()));

        let raw = b"GET /n HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n";
        let first = roundtrip(addr, raw).await;
        let second = roundtrip(addr, raw).await;
        assert!(first.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(first.ends_with("\r\n\r\n0"));
        assert!(second.ends_with("\r\n\r\n0"));
        assert!(second.contains("Connection: close\r\n"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn malformed_request_gets_400() {
        let server = Server::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr();
        let shutdown = CancellationToken::new();
        let app = Arc::new(App::builder().build(Router::new()));
        let handle = tokio::spawn(server.serve_with_shutdown(app, shutdown.clone()));

        let reply = roundtrip(addr, b"NOT A REQUEST\r\n\r\n").await;
        assert!(reply.starts_with("HTTP/1.1 400 Bad Request\r\n"));

        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }
}
