use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::CacheError;

const DEFAULT_DURATION: Duration = Duration::from_secs(30);
const DEFAULT_MAXIMUM_SIZE: usize = 1000;
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);
/// Longest accepted lifetime or sweep period: 365 days.
pub const MAXIMUM_DURATION: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Process-wide response caching settings, fixed once the cache is built.
///
/// Durations are whole seconds when deserialized; missing fields take their
/// defaults.
///
/// ```
/// use std::time::Duration;
/// use rttp_cache::cache::ResponseCachingConfig;
///
/// let config = ResponseCachingConfig::from_json(r#"{"maximum_size": 50}"#).unwrap();
/// assert_eq!(config.maximum_size(), 50);
/// assert_eq!(config.default_duration(), Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResponseCachingConfig {
    /// Lifetime of an entry when the handler does not override it.
    #[serde(rename = "default_duration_secs", with = "secs")]
    default_duration: Duration,

    /// Upper bound on the number of stored entries.
    maximum_size: usize,

    /// Period of the background sweep for expired entries.
    #[serde(rename = "sweep_interval_secs", with = "secs")]
    sweep_interval: Duration,
}

impl Default for ResponseCachingConfig {
    fn default() -> Self {
        Self {
            default_duration: DEFAULT_DURATION,
            maximum_size: DEFAULT_MAXIMUM_SIZE,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl ResponseCachingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a JSON config document.
    pub fn from_json(raw: &str) -> Result<Self, CacheError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_default_duration(mut self, duration: Duration) -> Self {
        self.default_duration = duration;
        self
    }

    #[must_use]
    pub fn with_maximum_size(mut self, maximum_size: usize) -> Self {
        self.maximum_size = maximum_size;
        self
    }

    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn default_duration(&self) -> Duration {
        self.default_duration
    }

    pub fn maximum_size(&self) -> usize {
        self.maximum_size
    }

    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Rejects a zero size bound, and durations that are zero or longer
    /// than [`MAXIMUM_DURATION`].
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.maximum_size == 0 {
            return Err(CacheError::InvalidConfig(
                "maximum_size must be greater than zero".into(),
            ));
        }
        check_duration("default_duration", self.default_duration)?;
        check_duration("sweep_interval", self.sweep_interval)
    }
}

fn check_duration(field: &str, value: Duration) -> Result<(), CacheError> {
    if value.is_zero() {
        return Err(CacheError::InvalidConfig(format!(
            "{field} must be greater than zero"
        )));
    }
    if value > MAXIMUM_DURATION {
        return Err(CacheError::InvalidConfig(format!(
            "{field} must be at most {} seconds, got {}",
            MAXIMUM_DURATION.as_secs(),
            value.as_secs()
        )));
    }
    Ok(())
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
