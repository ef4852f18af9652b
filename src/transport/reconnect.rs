//! Reconnection backoff.
//!
//! `delay = 2^attempt * base_delay`, where `attempt` counts the automatic
//! retries made since the last successful connect. Once `max_attempts`
//! retries have been used the policy refuses to schedule another.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default number of automatic retries.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Largest exponent applied, keeps the shift from overflowing.
const MAX_EXPONENT: u32 = 16;

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Exponential backoff with a retry cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    base_delay: Duration,
    max_attempts: u32,
    attempts: u32,
}

impl ReconnectPolicy {
    /// Creates a policy with the counter at zero.
    #[must_use]
    pub const fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_attempts,
            attempts: 0,
        }
    }

    /// Delay for a given attempt number.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << attempt.min(MAX_EXPONENT))
    }

    /// Consumes one attempt and returns its delay.
    ///
    /// Returns `None` once the cap is reached; the counter is left untouched.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        let delay = self.delay_for(self.attempts);
        self.attempts += 1;
        Some(delay)
    }

    /// Resets the counter.
    #[inline]
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Returns `true` if no retries remain.
    #[inline]
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Number of retries used.
    #[inline]
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Retry cap.
    #[inline]
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_default_sequence() {
        let mut policy = ReconnectPolicy::default();
        let delays: Vec<_> = std::iter::from_fn(|| policy.next_delay()).collect();

        assert_eq!(
            delays,
            [1, 2, 4, 8, 16].map(Duration::from_secs).to_vec()
        );
        assert!(policy.is_exhausted());
        assert_eq!(policy.attempts(), 5);
        assert_eq!(policy.next_delay(), None);
    }

    #[test]
    fn test_reset_restores_budget() {
        let mut policy = ReconnectPolicy::new(Duration::from_millis(10), 2);
        policy.next_delay();
        policy.next_delay();
        assert!(policy.is_exhausted());

        policy.reset();
        assert_eq!(policy.attempts(), 0);
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(10)));
    }

    #[test]
    fn test_zero_attempts_never_retries() {
        let mut policy = ReconnectPolicy::new(Duration::from_secs(1), 0);
        assert_eq!(policy.next_delay(), None);
    }

    #[test]
    fn test_huge_attempt_does_not_overflow() {
        let policy = ReconnectPolicy::new(Duration::from_secs(u64::MAX / 2), 100);
        let _ = policy.delay_for(99);
    }

    proptest! {
        #[test]
        fn prop_delay_doubles(base_ms in 1u64..10_000, attempt in 0u32..12) {
            let policy = ReconnectPolicy::new(Duration::from_millis(base_ms), 20);
            prop_assert_eq!(policy.delay_for(attempt + 1), policy.delay_for(attempt) * 2);
            prop_assert_eq!(policy.delay_for(attempt), Duration::from_millis(base_ms << attempt));
        }
    }
}
