//! Reconnection policy.
//!
//! Attempts are counted from 1. The delay before attempt `n` is `base_delay * 2^(n-1)`,
//! optionally capped by `max_delay` and stretched by a random jitter.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Backoff arithmetic and the retry limit for automatic reconnects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Number of automatic retries before giving up. `0` disables reconnection.
    pub max_attempts: u32,
    /// Upper bound for a single delay. `None` means uncapped.
    pub max_delay: Option<Duration>,
    /// Fraction of the delay added at random (0.0 - 1.0).
    pub jitter_factor: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_attempts: 5,
            max_delay: None,
            jitter_factor: 0.0,
        }
    }
}

impl ReconnectPolicy {
    /// Create a policy with the default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Never reconnect automatically
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }

    /// Set the base delay
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the retry limit
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Cap every delay at `delay`
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set the jitter factor, clamped to 0.0 - 1.0
    pub fn with_jitter(mut self, factor: f64) -> Self {
        self.jitter_factor = factor.clamp(0.0, 1.0);
        self
    }

    /// Whether another retry is allowed after `attempt` retries have been made.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay before retry number `attempt` (1-based). `0` is treated like `1`.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let mut delay = self.base_delay.saturating_mul(1u32 << exponent);

        if let Some(ceiling) = self.max_delay {
            delay = delay.min(ceiling);
        }

        if self.jitter_factor > 0.0 {
            let stretch = 1.0 + fastrand::f64() * self.jitter_factor;
            delay = Duration::try_from_secs_f64(delay.as_secs_f64() * stretch).unwrap_or(delay);
        }

        delay
    }

    /// Whether automatic reconnection is enabled at all.
    pub fn is_enabled(&self) -> bool {
        self.max_attempts > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backoff_doubles() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.next_delay(1), Duration::from_millis(1000));
        assert_eq!(policy.next_delay(2), Duration::from_millis(2000));
        assert_eq!(policy.next_delay(3), Duration::from_millis(4000));
        assert_eq!(policy.next_delay(5), Duration::from_millis(16000));
    }

    #[test]
    fn test_default_retry_limit() {
        let policy = ReconnectPolicy::default();
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(4));
        assert!(!policy.should_retry(5));
    }

    #[test]
    fn test_disabled_policy() {
        let policy = ReconnectPolicy::disabled();
        assert!(!policy.is_enabled());
        assert!(!policy.should_retry(0));
    }

    #[test]
    fn test_huge_attempt_saturates() {
        let policy = ReconnectPolicy::default();
        assert!(policy.next_delay(u32::MAX) >= policy.next_delay(32));
        assert_eq!(policy.next_delay(0), policy.next_delay(1));
    }

    #[test]
    fn test_ceiling() {
        let policy = ReconnectPolicy::default().with_max_delay(Duration::from_secs(3));
        assert_eq!(policy.next_delay(2), Duration::from_secs(2));
        assert_eq!(policy.next_delay(3), Duration::from_secs(3));
        assert_eq!(policy.next_delay(10), Duration::from_secs(3));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = ReconnectPolicy::default().with_jitter(0.1);
        for _ in 0..100 {
            let delay = policy.next_delay(1);
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay <= Duration::from_millis(1100));
        }
    }

    #[test]
    fn test_deserialize_partial() {
        let policy: ReconnectPolicy =
            serde_json::from_str(r#"{"max_attempts": 2}"#).unwrap();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.base_delay, Duration::from_millis(1000));
    }
}
