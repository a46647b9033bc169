use bytes::Bytes;
use tokio::time::Instant;

use crate::http::{Headers, Response, StatusCode};

/// A captured response and the instant it stops being servable.
///
/// Expiration is measured on [`tokio::time::Instant`], so a paused Tokio clock
/// drives it in tests. An entry is expired from its expiration instant
/// onwards.
#[derive(Debug, Clone)]
pub struct CachedEntry {
    expires_at: Instant,
    status: StatusCode,
    headers: Headers,
    body: Bytes,
}

impl CachedEntry {
    pub fn new(expires_at: Instant, status: StatusCode, headers: Headers, body: Bytes) -> Self {
        Self {
            expires_at,
            status,
            headers,
            body,
        }
    }

    /// Captures status, end-to-end headers, and body of `response`.
    ///
    /// Hop-by-hop headers belong to the connection that produced the
    /// response and are left out.
    pub fn from_response(response: &Response, expires_at: Instant) -> Self {
        Self::new(
            expires_at,
            response.status(),
            response.headers().without_hop_by_hop(),
            response.payload().clone(),
        )
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// Rebuilds a response identical to the one captured.
    pub fn to_response(&self) -> Response {
        Response::from_parts(self.status, self.headers.clone(), self.body.clone())
    }
}
