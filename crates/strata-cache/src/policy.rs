//! Cache policy.

use std::time::Duration;

/// The sweeper never runs more often than this, whatever is configured.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

fn default_cache_duration() -> Option<Duration> {
    Some(Duration::from_secs(300))
}

fn default_dormant_duration() -> Option<Duration> {
    Some(Duration::from_secs(1800))
}

fn default_sweep_interval() -> Duration {
    MIN_SWEEP_INTERVAL
}

/// How a [`CacheStore`](crate::CacheStore) treats its entries.
///
/// Immutable once built. `None` durations mean "never": an entry with no
/// cache duration never expires, and one with no dormant duration is never
/// evicted by the sweeper.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use strata_cache::CachePolicy;
///
/// let policy = CachePolicy::builder()
///     .cache_duration(Duration::from_secs(1))
///     .never_dormant()
///     .cache_error_result(true)
///     .build();
///
/// assert_eq!(policy.cache_duration(), Some(Duration::from_secs(1)));
/// assert_eq!(policy.dormant_duration(), None);
/// assert!(policy.cache_error_result());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    cache_duration: Option<Duration>,
    dormant_duration: Option<Duration>,
    sweep_interval: Duration,
    cache_null_result: bool,
    cache_error_result: bool,
    load_timeout: Option<Duration>,
}

impl CachePolicy {
    /// Creates a new builder for CachePolicy.
    pub fn builder() -> CachePolicyBuilder {
        CachePolicyBuilder::default()
    }

    /// Returns how long a loaded value stays fresh.
    pub fn cache_duration(&self) -> Option<Duration> {
        self.cache_duration
    }

    /// Returns how long an entry may stay unread before it is dormant.
    pub fn dormant_duration(&self) -> Option<Duration> {
        self.dormant_duration
    }

    /// Returns the configured sweep interval, as given.
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Returns the sweep interval the sweeper actually uses.
    pub fn effective_sweep_interval(&self) -> Duration {
        self.sweep_interval.max(MIN_SWEEP_INTERVAL)
    }

    /// Returns whether an empty load result is memoized.
    pub fn cache_null_result(&self) -> bool {
        self.cache_null_result
    }

    /// Returns whether a load failure is memoized.
    pub fn cache_error_result(&self) -> bool {
        self.cache_error_result
    }

    /// Returns the time budget for a single source call, if any.
    pub fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`CachePolicy`].
#[derive(Debug, Clone, Default)]
pub struct CachePolicyBuilder {
    cache_duration: Option<Option<Duration>>,
    dormant_duration: Option<Option<Duration>>,
    sweep_interval: Option<Duration>,
    cache_null_result: Option<bool>,
    cache_error_result: Option<bool>,
    load_timeout: Option<Duration>,
}

impl CachePolicyBuilder {
    /// Sets how long a loaded value stays fresh.
    pub fn cache_duration(mut self, duration: Duration) -> Self {
        self.cache_duration = Some(Some(duration));
        self
    }

    /// Entries never expire.
    pub fn never_expire(mut self) -> Self {
        self.cache_duration = Some(None);
        self
    }

    /// Sets how long an entry may stay unread before it is dormant.
    pub fn dormant_duration(mut self, duration: Duration) -> Self {
        self.dormant_duration = Some(Some(duration));
        self
    }

    /// Entries are never evicted by the sweeper.
    pub fn never_dormant(mut self) -> Self {
        self.dormant_duration = Some(None);
        self
    }

    /// Sets the sweep interval. Values below one minute are raised to it.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Sets whether an empty load result is memoized.
    pub fn cache_null_result(mut self, cache: bool) -> Self {
        self.cache_null_result = Some(cache);
        self
    }

    /// Sets whether a load failure is memoized.
    pub fn cache_error_result(mut self, cache: bool) -> Self {
        self.cache_error_result = Some(cache);
        self
    }

    /// Bounds every source call by `timeout`.
    pub fn load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = Some(timeout);
        self
    }

    /// Builds the policy.
    pub fn build(self) -> CachePolicy {
        CachePolicy {
            cache_duration: self.cache_duration.unwrap_or_else(default_cache_duration),
            dormant_duration: self.dormant_duration.unwrap_or_else(default_dormant_duration),
            sweep_interval: self.sweep_interval.unwrap_or_else(default_sweep_interval),
            cache_null_result: self.cache_null_result.unwrap_or(true),
            cache_error_result: self.cache_error_result.unwrap_or(false),
            load_timeout: self.load_timeout,
        }
    }
}
