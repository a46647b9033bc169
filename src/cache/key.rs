use std::fmt;

use crate::http::{Method, QueryParams, Request};

/// Identity of a request for response caching.
///
/// Built from the request path, its query parameters, and its method, with
/// no normalization: `/items` and `/items/` are different keys, as are
/// `GET` and `HEAD`. Parameter names may appear in any order, but the values
/// under one name must match in sequence.
///
/// # Examples
///
/// ```
/// use rttp_cache::cache::CacheKey;
/// use rttp_cache::http::{Method, Request};
///
/// let a = CacheKey::from_request(&Request::new(Method::Get, "/items?page=2&sort=asc"));
/// let b = CacheKey::from_request(&Request::new(Method::Get, "/items?sort=asc&page=2"));
/// let c = CacheKey::from_request(&Request::new(Method::Post, "/items?sort=asc&page=2"));
///
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    route: String,
    parameters: QueryParams,
    method: Method,
}

impl CacheKey {
    pub fn new(route: impl Into<String>, parameters: QueryParams, method: Method) -> Self {
        Self {
            route: route.into(),
            parameters,
            method,
        }
    }

    /// Derives the key for `request`.
    pub fn from_request(request: &Request) -> Self {
        Self::new(
            request.path(),
            request.query().clone(),
            request.method().clone(),
        )
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn parameters(&self) -> &QueryParams {
        &self.parameters
    }

    pub fn method(&self) -> &Method {
        &self.method
    }
}

impl From<&Request> for CacheKey {
    fn from(request: &Request) -> Self {
        Self::from_request(request)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.route)?;
        let mut sep = '?';
        for (name, values) in self.parameters.iter() {
            for value in values {
                write!(f, "{sep}{name}={value}")?;
                sep = '&';
            }
        }
        Ok(())
    }
}
