//! Incoming requests, decoded from the wire with [`httparse`] or built in
//! process for [`App::handle`](crate::App::handle).

use bytes::Bytes;
use thiserror::Error;

use super::{Headers, Method, QueryParams};

/// Header slots offered to `httparse`; a request with more is rejected.
const MAX_HEADERS: usize = 64;

#[derive(Debug, Error)]
pub enum RequestError {
    /// The buffer ends before the blank line closing the head.
    #[error("request head is incomplete")]
    Incomplete,

    #[error("malformed request: {0}")]
    Parse(#[from] httparse::Error),

    #[error("request line has no {field}")]
    MissingField { field: &'static str },
}

/// The request target split into path and query.
#[derive(Debug, Clone, Default)]
struct Target {
    path: String,
    raw_query: Option<String>,
    query: QueryParams,
}

impl Target {
    fn parse(target: &str) -> Self {
        let (path, raw_query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };
        Self {
            path: path.to_owned(),
            raw_query: raw_query.map(str::to_owned),
            query: raw_query.map(QueryParams::parse).unwrap_or_default(),
        }
    }
}

/// An HTTP/1.x request.
///
/// ```
/// use rttp_cache::http::{Method, Request};
///
/// let raw = b"GET /feed?tag=rust&tag=http HTTP/1.1\r\nHost: example.org\r\n\r\n";
/// let (parsed, head_len) = Request::parse(raw).unwrap();
/// assert_eq!(head_len, raw.len());
/// assert_eq!(parsed.path(), "/feed");
/// assert_eq!(parsed.query().get_all("tag"), &["rust", "http"]);
/// assert_eq!(parsed.headers().get("HOST"), Some("example.org"));
///
/// let built = Request::new(Method::Get, "/feed?tag=rust&tag=http");
/// assert_eq!(built.query(), parsed.query());
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    target: Target,
    /// Minor version of HTTP/1.x.
    version: u8,
    headers: Headers,
    body: Bytes,
}

impl Request {
    /// An HTTP/1.1 request for `target`, which may carry a `?query`.
    pub fn new(method: Method, target: &str) -> Self {
        Self {
            method,
            target: Target::parse(target),
            version: 1,
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Decodes one request from the front of `buf`.
    ///
    /// On success returns the request and the length of its head, i.e. where
    /// the body starts in `buf`. The body is whatever follows the head, cut at
    /// `Content-Length`; the caller waits for the rest if it is short.
    /// Header values that are not UTF-8 are dropped.
    ///
    /// # Errors
    ///
    /// [`RequestError::Incomplete`] until the whole head is buffered,
    /// [`RequestError::Parse`] for malformed input.
    pub fn parse(buf: &[u8]) -> Result<(Self, usize), RequestError> {
        let mut slots = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut head = httparse::Request::new(&mut slots);
        let httparse::Status::Complete(head_len) = head.parse(buf)? else {
            return Err(RequestError::Incomplete);
        };

        let method = head
            .method
            .ok_or(RequestError::MissingField { field: "method" })?;
        let target = head
            .path
            .ok_or(RequestError::MissingField { field: "target" })?;
        let version = head
            .version
            .ok_or(RequestError::MissingField { field: "version" })?;

        let headers: Headers = head
            .headers
            .iter()
            .filter_map(|h| Some((h.name, std::str::from_utf8(h.value).ok()?)))
            .collect();

        let rest = &buf[head_len..];
        let body_len = headers
            .get("content-length")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .map_or(rest.len(), |n| n.min(rest.len()));

        let request = Self {
            method: method.parse().unwrap_or_else(|never| match never {}),
            target: Target::parse(target),
            version,
            headers,
            body: Bytes::copy_from_slice(&rest[..body_len]),
        };
        Ok((request, head_len))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The target path, without the query.
    pub fn path(&self) -> &str {
        &self.target.path
    }

    /// 0 for HTTP/1.0, 1 for HTTP/1.1.
    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The query as received, without the `?`.
    pub fn query_string(&self) -> Option<&str> {
        self.target.raw_query.as_deref()
    }

    pub fn query(&self) -> &QueryParams {
        &self.target.query
    }

    /// First value of the query parameter `name`.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.target.query.get(name)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Whether the client wants the connection kept open afterwards.
    ///
    /// An explicit `Connection` header decides; otherwise HTTP/1.1 keeps
    /// connections open and HTTP/1.0 closes them.
    pub fn is_keep_alive(&self) -> bool {
        self.headers
            .get("connection")
            .map_or(self.version == 1, |v| v.eq_ignore_ascii_case("keep-alive"))
    }

    pub fn content_length(&self) -> Option<usize> {
        self.headers.get("content-length")?.trim().parse().ok()
    }
}
