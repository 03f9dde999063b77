//! Session configuration.

use crate::types::Endpoint;
use std::time::Duration;

/// Default diff cycle period.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Default delay between ingestion attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Default number of undelivered messages a subscriber may hold.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 16;

/// Reconnect policy for the ingestion task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Fixed delay before every reconnect attempt.
    /// Default: 5s
    pub interval: Duration,

    /// Give up after this many consecutive connect/initialize failures
    /// (None = retry forever).
    pub max_consecutive_failures: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_RETRY_INTERVAL,
            max_consecutive_failures: None,
        }
    }
}

impl RetryPolicy {
    /// Whether `failures` consecutive failures exhaust the policy.
    pub fn exhausted(&self, failures: u32) -> bool {
        self.max_consecutive_failures
            .map_or(false, |max| failures >= max)
    }
}

/// Configuration for one telemetry session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Session name, used in logs.
    pub name: String,

    /// Game server name passed to the enrichment source.
    pub server_name: String,

    /// Telemetry endpoint.
    pub endpoint: Endpoint,

    /// Diff cycle period. Zero means the default (5s).
    pub refresh_interval: Duration,

    /// Reconnect policy.
    pub retry: RetryPolicy,

    /// Subscriber buffer size before eviction.
    /// Default: 16
    pub subscriber_capacity: usize,

    /// Send a private baseline to each new subscriber of an active session.
    /// Default: false (baseline only on (re)connect)
    pub baseline_on_subscribe: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            server_name: String::new(),
            endpoint: Endpoint::default(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            retry: RetryPolicy::default(),
            subscriber_capacity: DEFAULT_SUBSCRIBER_CAPACITY,
            baseline_on_subscribe: false,
        }
    }
}

impl SessionConfig {
    pub fn new(name: impl Into<String>, endpoint: Endpoint) -> Self {
        Self {
            name: name.into(),
            endpoint,
            ..Default::default()
        }
    }

    pub fn with_server_name(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = server_name.into();
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_baseline_on_subscribe(mut self, enabled: bool) -> Self {
        self.baseline_on_subscribe = enabled;
        self
    }

    /// Refresh interval with the zero-means-default rule applied.
    pub fn effective_refresh_interval(&self) -> Duration {
        if self.refresh_interval.is_zero() {
            DEFAULT_REFRESH_INTERVAL
        } else {
            self.refresh_interval
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_refresh_interval_uses_default() {
        let config = SessionConfig::default().with_refresh_interval(Duration::ZERO);
        assert_eq!(config.effective_refresh_interval(), DEFAULT_REFRESH_INTERVAL);

        let config = config.with_refresh_interval(Duration::from_millis(250));
        assert_eq!(config.effective_refresh_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_retry_policy_exhaustion() {
        let unbounded = RetryPolicy::default();
        assert!(!unbounded.exhausted(u32::MAX));

        let capped = RetryPolicy {
            max_consecutive_failures: Some(3),
            ..Default::default()
        };
        assert!(!capped.exhausted(2));
        assert!(capped.exhausted(3));
    }
}
