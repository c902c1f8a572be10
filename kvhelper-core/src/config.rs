use std::time::Duration;

/// Longest TTL the in-memory store will honour (~100 years).
pub const MAX_TTL_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

/// Configuration for the in-memory store
///
/// # Example
///
/// ```rust
/// use kvhelper_core::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::default()
///     .with_cleanup_interval(Duration::from_secs(30))
///     .with_max_ttl(Duration::from_secs(3600));
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Interval between background sweeps of expired keys (default: 60 seconds)
    pub cleanup_interval: Duration,

    /// Upper bound applied to every TTL (default: ~100 years)
    pub max_ttl: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: Duration::from_secs(60),
            max_ttl: Duration::from_secs(MAX_TTL_SECONDS),
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how often the background task removes expired keys.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Caps TTLs passed to `set` and `expire`.
    ///
    /// Values above [`MAX_TTL_SECONDS`] are clamped so that adding the TTL to
    /// the current instant cannot overflow.
    pub fn with_max_ttl(mut self, max_ttl: Duration) -> Self {
        self.max_ttl = max_ttl.min(Duration::from_secs(MAX_TTL_SECONDS));
        self
    }
}
