//! Parsed URL query parameters.
//!
//! A parameter may repeat (`?tag=a&tag=b`), so each name maps to the ordered
//! sequence of its values. Names are kept in a sorted map: two parameter sets
//! compare equal regardless of the order names appeared in, but the order of
//! values under one name is significant.
//!
//! Names and values are stored decoded, so `a%20b` and `a+b` are the same
//! parameter value.

use std::collections::BTreeMap;

use url::form_urlencoded;

/// Multi-valued query parameters with structural equality and hashing.
///
/// # Examples
///
/// ```
/// use rttp_cache::http::QueryParams;
///
/// let a = QueryParams::parse("page=2&tag=x&tag=y");
/// let b = QueryParams::parse("tag=x&tag=y&page=2");
/// let c = QueryParams::parse("tag=y&tag=x&page=2");
///
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// assert_eq!(a.get("tag"), Some("x"));
/// assert_eq!(a.get_all("tag"), &["x".to_string(), "y".to_string()]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QueryParams {
    inner: BTreeMap<String, Vec<String>>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a raw query string (without the leading `?`) as
    /// `application/x-www-form-urlencoded`.
    ///
    /// Percent escapes and `+` are decoded in names and values; invalid
    /// UTF-8 is replaced. A pair without `=` yields an empty value. Empty
    /// segments (`a=1&&b=2`) are skipped.
    pub fn parse(query: &str) -> Self {
        let mut params = Self::new();
        for (name, value) in form_urlencoded::parse(query.as_bytes()) {
            params.append(name, value);
        }
        params
    }

    /// Appends a value under `name`, after any values already present.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.entry(name.into()).or_default().push(value.into());
    }

    /// Returns the first value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns every value for `name` in the order received.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.inner.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}
