//! Reconnection decisions after an unexpected close.
//!
//! The policy is pure: given how many consecutive attempts have failed it
//! says whether to try again and how long to wait first. It owns no timers
//! and performs no I/O, so it can be exercised without a runtime.

use std::time::Duration;

/// Default cap on consecutive failed attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default pause between attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Outcome of consulting a [`ReconnectPolicy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Open a new transport after `delay`.
    Retry {
        /// Pause before the next attempt.
        delay: Duration,
    },
    /// Stop trying; the connection becomes terminally failed.
    GiveUp,
}

impl ReconnectDecision {
    /// Whether another attempt should be made.
    #[must_use]
    pub const fn should_retry(&self) -> bool { matches!(self, Self::Retry { .. }) }

    /// Pause before the next attempt, if one should be made.
    #[must_use]
    pub const fn delay(&self) -> Option<Duration> {
        match self {
            Self::Retry { delay } => Some(*delay),
            Self::GiveUp => None,
        }
    }
}

/// Decide whether to reconnect after `attempts` consecutive failures.
///
/// The delay is flat: every retry waits `delay` regardless of how many
/// attempts preceded it.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use tether::policy::{ReconnectDecision, decide};
///
/// let delay = Duration::from_millis(10);
/// assert_eq!(decide(2, 3, delay), ReconnectDecision::Retry { delay });
/// assert_eq!(decide(3, 3, delay), ReconnectDecision::GiveUp);
/// ```
#[must_use]
pub const fn decide(attempts: u32, max_attempts: u32, delay: Duration) -> ReconnectDecision {
    if attempts >= max_attempts {
        ReconnectDecision::GiveUp
    } else {
        ReconnectDecision::Retry { delay }
    }
}

/// Fixed-delay reconnection policy with a capped attempt count.
///
/// # Default Values
/// - `max_attempts`: 5
/// - `delay`: 2 seconds
///
/// # Invariants
/// - `max_attempts` must be at least 1
/// - `delay` must be at least 1 millisecond
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Consecutive failures tolerated before giving up.
    pub max_attempts: u32,
    /// Pause before each new attempt.
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl ReconnectPolicy {
    /// Create a policy from its parts.
    #[must_use]
    pub const fn new(max_attempts: u32, delay: Duration) -> Self { Self { max_attempts, delay } }

    /// Clamp values to sane bounds.
    ///
    /// A zero attempt cap would fail a connection before its first retry and a
    /// zero delay would spin against an unreachable server.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use tether::policy::ReconnectPolicy;
    ///
    /// let policy = ReconnectPolicy::new(0, Duration::ZERO).normalized();
    /// assert_eq!(policy.max_attempts, 1);
    /// assert_eq!(policy.delay, Duration::from_millis(1));
    /// ```
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.max_attempts = self.max_attempts.max(1);
        self.delay = self.delay.max(Duration::from_millis(1));
        self
    }

    /// Decide what to do after `attempts` consecutive failures.
    ///
    /// The caller increments its counter before asking, so with
    /// `max_attempts = 3` exactly three consecutive attempts are made.
    #[must_use]
    pub const fn decide(&self, attempts: u32) -> ReconnectDecision {
        decide(attempts, self.max_attempts, self.delay)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(1, true)]
    #[case(4, true)]
    #[case(5, false)]
    #[case(6, false)]
    #[case(u32::MAX, false)]
    fn default_policy_allows_five_attempts(#[case] attempts: u32, #[case] retry: bool) {
        let decision = ReconnectPolicy::default().decide(attempts);
        assert_eq!(decision.should_retry(), retry);
    }

    #[test]
    fn retry_carries_the_configured_delay() {
        let policy = ReconnectPolicy::new(3, Duration::from_millis(10));
        assert_eq!(policy.decide(1).delay(), Some(Duration::from_millis(10)));
        assert_eq!(policy.decide(3).delay(), None);
    }

    #[test]
    fn normalized_keeps_valid_values() {
        let policy = ReconnectPolicy::new(7, Duration::from_millis(250));
        assert_eq!(policy.normalized(), policy);
    }

    proptest! {
        #[test]
        fn gives_up_exactly_at_the_cap(max in 1_u32..64, attempts in 0_u32..128, delay_ms in 1_u64..10_000) {
            let delay = Duration::from_millis(delay_ms);
            let decision = decide(attempts, max, delay);
            prop_assert_eq!(decision.should_retry(), attempts < max);
        }

        #[test]
        fn delay_is_flat(max in 1_u32..64, delay_ms in 1_u64..10_000) {
            let policy = ReconnectPolicy::new(max, Duration::from_millis(delay_ms));
            for attempts in 0..max {
                prop_assert_eq!(policy.decide(attempts).delay(), Some(policy.delay));
            }
        }
    }
}
