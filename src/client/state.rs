//! Observable connection lifecycle.

use std::fmt;

use crate::payload::CloseReason;

/// Lifecycle state of a [`Client`](super::Client) as seen from outside.
///
/// ```text
/// Idle -> Connecting -> Open -> Closing -> Closed
///             ^                    |
///             +---- (retry) -------+----> Failed
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Constructed and never connected.
    Idle,
    /// A transport attempt is in flight.
    Connecting,
    /// A transport is open.
    Open,
    /// The caller asked to close and the transport is shutting down.
    Closing,
    /// Closed by the caller, or between an abnormal close and the next
    /// scheduled attempt.
    Closed,
    /// Reconnection attempts are exhausted.
    Failed,
}

impl ConnectionState {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Why a connection gave up reconnecting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    /// Consecutive attempts made before giving up.
    pub attempts: u32,
    /// The close that exhausted the policy.
    pub last_close: CloseReason,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gave up after {} attempts; last close: {}",
            self.attempts, self.last_close
        )
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(ConnectionState::Idle, "idle")]
    #[case(ConnectionState::Connecting, "connecting")]
    #[case(ConnectionState::Open, "open")]
    #[case(ConnectionState::Closing, "closing")]
    #[case(ConnectionState::Closed, "closed")]
    #[case(ConnectionState::Failed, "failed")]
    fn displays_lowercase(#[case] state: ConnectionState, #[case] expected: &str) {
        assert_eq!(state.to_string(), expected);
    }

    #[test]
    fn failure_mentions_attempts() {
        let failure = Failure {
            attempts: 3,
            last_close: CloseReason::new(None, "refused"),
        };
        assert!(failure.to_string().starts_with("gave up after 3 attempts"));
    }
}
