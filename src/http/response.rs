//! Outgoing responses and their HTTP/1.1 encoding.

use bytes::{BufMut, Bytes, BytesMut};

use super::{Headers, StatusCode};

const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// A response under construction, or one replayed from the response cache.
///
/// The body is a [`Bytes`] handle; clones share the payload.
///
/// ```
/// use rttp_cache::http::{Response, StatusCode};
///
/// let wire = Response::new(StatusCode::CREATED)
///     .header("Location", "/items/7")
///     .body("created")
///     .into_bytes();
/// let text = std::str::from_utf8(&wire).unwrap();
///
/// assert!(text.starts_with("HTTP/1.1 201 Created\r\n"));
/// assert!(text.contains("Location: /items/7\r\n"));
/// assert!(text.ends_with("Content-Length: 7\r\n\r\ncreated"));
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Bytes,
    keep_alive: bool,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self::from_parts(status, Headers::new(), Bytes::new())
    }

    /// Builds a keep-alive response out of stored parts.
    pub fn from_parts(status: StatusCode, headers: Headers, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
            keep_alive: true,
        }
    }

    /// Adds a header; repeated names are kept side by side.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_header(name, value);
        self
    }

    /// In-place [`header`](Self::header) for middleware holding a `&mut Response`.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name, value);
    }

    #[must_use]
    pub fn body(self, body: impl Into<String>) -> Self {
        let body: String = body.into();
        self.body_bytes(body)
    }

    #[must_use]
    pub fn body_bytes(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Chooses between `Connection: keep-alive` (the default) and `close`.
    #[must_use]
    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.set_keep_alive(keep_alive);
        self
    }

    pub fn set_keep_alive(&mut self, keep_alive: bool) {
        self.keep_alive = keep_alive;
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn payload(&self) -> &Bytes {
        &self.body
    }

    /// Encodes the response for the wire.
    ///
    /// The framing fields are owned by the encoder. `Connection` and
    /// `Content-Length` set by hand are replaced, and a non-empty body
    /// without a `Content-Type` is labelled as UTF-8 text.
    pub fn into_bytes(self) -> BytesMut {
        let Self {
            status,
            mut headers,
            body,
            keep_alive,
        } = self;

        headers.remove("content-length");
        headers.set("Connection", if keep_alive { "keep-alive" } else { "close" });
        if !body.is_empty() && !headers.contains("content-type") {
            headers.insert("Content-Type", DEFAULT_CONTENT_TYPE);
        }

        let head = format!(
            "HTTP/1.1 {status}\r\n{headers}Content-Length: {}\r\n\r\n",
            body.len()
        );
        let mut buf = BytesMut::with_capacity(head.len() + body.len());
        buf.put_slice(head.as_bytes());
        buf.put(body);
        buf
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(response: Response) -> String {
        String::from_utf8(response.into_bytes().to_vec()).unwrap()
    }

    #[test]
    fn empty_body_gets_length_but_no_type() {
        let s = encode(Response::new(StatusCode::NO_CONTENT));
        assert_eq!(
            s,
            "HTTP/1.1 204 No Content\r\nConnection: keep-alive\r\nContent-Length: 0\r\n\r\n"
        );
    }

    #[test]
    fn text_body_is_labelled_unless_typed() {
        let s = encode(Response::new(StatusCode::OK).body("hi"));
        assert!(s.contains("Content-Type: text/plain; charset=utf-8\r\n"));

        let s = encode(
            Response::new(StatusCode::OK)
                .header("content-type", "application/json")
                .body("{}"),
        );
        assert_eq!(s.matches("ontent-").count(), 2);
        assert!(s.contains("content-type: application/json\r\n"));
    }

    #[test]
    fn framing_fields_set_by_hand_are_overridden() {
        let s = encode(
            Response::new(StatusCode::OK)
                .header("Connection", "keep-alive")
                .header("Content-Length", "999")
                .keep_alive(false)
                .body("abc"),
        );
        assert!(s.contains("Connection: close\r\n"));
        assert!(!s.contains("keep-alive"));
        assert_eq!(s.matches("Content-Length").count(), 1);
        assert!(s.ends_with("Content-Length: 3\r\n\r\nabc"));
    }

    #[test]
    fn unregistered_status_writes_only_the_code() {
        let status = StatusCode::from_u16(299).unwrap();
        assert!(encode(Response::new(status)).starts_with("HTTP/1.1 299\r\n"));
    }

    #[test]
    fn clones_share_the_payload() {
        let original = Response::new(StatusCode::OK).body("shared");
        let copy = original.clone();
        assert_eq!(original.payload().as_ptr(), copy.payload().as_ptr());
    }
}
