//! Response and request header fields.
//!
//! Field names compare ASCII case-insensitively; values are kept verbatim.
//! Fields keep the order they were added in, and a name may repeat.

use std::fmt;

/// Connection-scoped fields (RFC 9110 §7.6.1). They describe one hop of one
/// exchange and must not be replayed on another.
pub const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn same_name(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Returns `true` if `name` is a hop-by-hop field.
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|hop| same_name(hop, name))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
    name: String,
    value: String,
}

/// Ordered multimap of header fields.
///
/// ```
/// use rttp_cache::http::Headers;
///
/// let headers: Headers = [
///     ("Content-Type", "application/json"),
///     ("Vary", "Accept"),
///     ("Vary", "Accept-Encoding"),
///     ("Connection", "keep-alive"),
/// ]
/// .into_iter()
/// .collect();
///
/// assert_eq!(headers.get("content-type"), Some("application/json"));
/// assert_eq!(headers.get_all("VARY").collect::<Vec<_>>(), ["Accept", "Accept-Encoding"]);
///
/// let replayable = headers.without_hop_by_hop();
/// assert!(!replayable.contains("connection"));
/// assert_eq!(replayable.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<Field>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field after any existing ones, even if the name is already present.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push(Field {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Drops every field called `name`, then adds `name: value`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.remove(&name);
        self.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| same_name(&field.name, name))
            .map(|field| field.value.as_str())
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .iter()
            .filter(move |field| same_name(&field.name, name))
            .map(|field| field.value.as_str())
    }

    /// Drops every field called `name`. Returns `true` if there was one.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.fields.len();
        self.retain(|field, _| !same_name(field, name));
        self.fields.len() != before
    }

    /// Keeps only the fields for which `keep(name, value)` holds.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &str) -> bool) {
        self.fields.retain(|field| keep(&field.name, &field.value));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// A copy without [`HOP_BY_HOP`] fields, suitable for storing and
    /// replaying on a later connection.
    #[must_use]
    pub fn without_hop_by_hop(&self) -> Self {
        self.iter()
            .filter(|(name, _)| !is_hop_by_hop(name))
            .collect()
    }

    /// Number of fields, counting repeated names separately.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|field| (field.name.as_str(), field.value.as_str()))
    }
}

impl<N, V> FromIterator<(N, V)> for Headers
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        headers.extend(iter);
        headers
    }
}

impl<N, V> Extend<(N, V)> for Headers
where
    N: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (N, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

/// Wire form: one `Name: value\r\n` line per field.
impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.iter()
            .try_for_each(|(name, value)| write!(f, "{name}: {value}\r\n"))
    }
}
