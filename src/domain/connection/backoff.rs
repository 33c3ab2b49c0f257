//! Exponential reconnect backoff with a ceiling.

use std::time::Duration;

/// Reconnect schedule for the upstream change source.
///
/// ## Schedule
///
/// ```text
/// delay(n) = min(base_delay * 2^(n-1), max_delay)     n = 1, 2, ...
/// ```
///
/// After `max_attempts` consecutive failures the supervisor stops retrying
/// until an operator forces a reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    ///
    /// Default: 1 second
    pub base_delay: Duration,

    /// Upper bound on any single delay.
    ///
    /// Default: 60 seconds
    pub max_delay: Duration,

    /// Consecutive failed attempts tolerated before giving up.
    ///
    /// Default: 10
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(60_000),
            max_attempts: 10,
        }
    }
}

impl ReconnectPolicy {
    /// Delay to wait before the given 1-based attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        2u32.checked_pow(exponent)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let policy = ReconnectPolicy::default();

        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(60));
        assert_eq!(policy.max_attempts, 10);
    }

    #[test]
    fn delays_double_then_cap() {
        let policy = ReconnectPolicy::default();
        let delays: Vec<u128> = (1..=9).map(|n| policy.delay_for(n).as_millis()).collect();

        assert_eq!(
            delays,
            vec![1000, 2000, 4000, 8000, 16000, 32000, 60000, 60000, 60000]
        );
    }

    #[test]
    fn huge_attempt_numbers_saturate_at_max_delay() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(40), Duration::from_secs(60));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn attempt_zero_is_treated_as_first() {
        let policy = ReconnectPolicy::default().with_base_delay(Duration::from_millis(250));
        assert_eq!(policy.delay_for(0), Duration::from_millis(250));
    }
}
