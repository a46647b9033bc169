use thiserror::Error;

/// Errors raised by the response cache.
///
/// None of these surface while serving a request: lookups and stores fall
/// back to "cache miss" rather than fail. They cover installation and
/// configuration mistakes.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The opt-in API was called on a request whose pipeline never installed
    /// response caching.
    #[error("response caching is not installed in this pipeline")]
    NotInstalled,

    #[error("invalid response caching config: {0}")]
    InvalidConfig(String),

    #[error("failed to parse response caching config: {0}")]
    Parse(#[from] serde_json::Error),
}
