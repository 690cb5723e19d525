//! Cache-wide configuration and per-query options.

use std::time::Duration;

use crate::retry::RetryPolicy;

/// Configuration for the query client.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Staleness window used when a query does not declare its own.
    pub default_stale_time: Duration,
    /// How long an entry with no subscribers survives before eviction.
    pub gc_time: Duration,
    /// How often the garbage-collection task sweeps.
    pub gc_interval: Duration,
    /// Retry policy for reads when a query does not declare its own.
    pub default_retry: RetryPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_stale_time: Duration::ZERO,
            gc_time: Duration::from_secs(5 * 60),
            gc_interval: Duration::from_secs(60),
            default_retry: RetryPolicy::default(),
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default staleness window.
    pub fn with_stale_time(mut self, duration: Duration) -> Self {
        self.default_stale_time = duration;
        self
    }

    /// Set the inactivity period after which unobserved entries are evicted.
    pub fn with_gc_time(mut self, duration: Duration) -> Self {
        self.gc_time = duration;
        self
    }

    /// Set the garbage-collection sweep interval.
    pub fn with_gc_interval(mut self, duration: Duration) -> Self {
        self.gc_interval = duration;
        self
    }

    /// Set the default read retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.default_retry = retry;
        self
    }

    /// Query options seeded from these defaults.
    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            stale_time: self.default_stale_time,
            refetch_interval: None,
            refetch_on_focus: true,
            retry: self.default_retry.clone(),
        }
    }
}

/// What a subscriber declares about the data it reads.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    /// Data older than this is eligible for background refetch.
    pub stale_time: Duration,
    /// Fixed polling period. Polling lives exactly as long as the
    /// subscriptions that asked for it.
    pub refetch_interval: Option<Duration>,
    /// Refetch stale data when the application regains focus.
    pub refetch_on_focus: bool,
    pub retry: RetryPolicy,
}

impl Default for QueryOptions {
    fn default() -> Self {
        CacheConfig::default().query_options()
    }
}

impl QueryOptions {
    pub fn with_stale_time(mut self, duration: Duration) -> Self {
        self.stale_time = duration;
        self
    }

    pub fn with_refetch_interval(mut self, interval: Duration) -> Self {
        self.refetch_interval = Some(interval);
        self
    }

    pub fn with_refetch_on_focus(mut self, enabled: bool) -> Self {
        self.refetch_on_focus = enabled;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
