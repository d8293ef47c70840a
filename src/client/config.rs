//! Tunables for a [`Client`](super::Client).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    heartbeat::DEFAULT_HEARTBEAT_INTERVAL,
    payload::Payload,
    policy::ReconnectPolicy,
};

/// Upper bound on a graceful transport close.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on a single write, including heartbeat probes.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Reconnection, heartbeat and shutdown settings for a client.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use tether::client::ClientConfig;
///
/// let config = ClientConfig::default()
///     .with_max_attempts(3)
///     .with_reconnect_delay(Duration::from_millis(10));
/// assert_eq!(config.policy.max_attempts, 3);
/// assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// When and how often to reconnect after an abnormal close.
    pub policy: ReconnectPolicy,
    /// Idle time after which a liveness probe is sent. Zero disables probes.
    pub heartbeat_interval: Duration,
    /// Body of each liveness probe.
    pub heartbeat_payload: Payload,
    /// How long a caller-initiated close may wait for the transport.
    pub close_timeout: Duration,
    /// How long one write may stall before the link is treated as lost.
    pub send_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            policy: ReconnectPolicy::default(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            heartbeat_payload: Payload::from("ping"),
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Set the number of consecutive failed attempts tolerated.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.policy.max_attempts = max_attempts;
        self
    }

    /// Set the pause before each reconnection attempt.
    #[must_use]
    pub const fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.policy.delay = delay;
        self
    }

    /// Set the heartbeat interval.
    #[must_use]
    pub const fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the payload sent as a liveness probe.
    #[must_use]
    pub fn with_heartbeat_payload(mut self, payload: impl Into<Payload>) -> Self {
        self.heartbeat_payload = payload.into();
        self
    }

    /// Set the close timeout.
    #[must_use]
    pub const fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Set the send timeout.
    #[must_use]
    pub const fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Clamp the reconnection policy to usable bounds and replace a zero
    /// send timeout with the default.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.policy = self.policy.normalized();
        if self.send_timeout.is_zero() {
            self.send_timeout = DEFAULT_SEND_TIMEOUT;
        }
        self
    }
}

/// Serializable construction options.
///
/// Every field is optional; missing values take the [`ClientConfig`]
/// defaults.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use tether::client::{ClientConfig, ClientOptions};
///
/// let options = ClientOptions {
///     max_attempts: Some(3),
///     reconnect_delay_ms: Some(10),
///     ..ClientOptions::default()
/// };
/// let config = ClientConfig::from(options);
/// assert_eq!(config.policy.delay, Duration::from_millis(10));
/// assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientOptions {
    /// Consecutive failed attempts tolerated before giving up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    /// Pause before each reconnection attempt, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconnect_delay_ms: Option<u64>,
    /// Heartbeat interval in milliseconds. Zero disables probes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heartbeat_interval_ms: Option<u64>,
}

impl ClientOptions {
    /// Overlay these options onto `config`.
    #[must_use]
    pub fn apply(self, mut config: ClientConfig) -> ClientConfig {
        if let Some(max_attempts) = self.max_attempts {
            config.policy.max_attempts = max_attempts;
        }
        if let Some(delay) = self.reconnect_delay_ms {
            config.policy.delay = Duration::from_millis(delay);
        }
        if let Some(interval) = self.heartbeat_interval_ms {
            config.heartbeat_interval = Duration::from_millis(interval);
        }
        config
    }
}

impl From<ClientOptions> for ClientConfig {
    fn from(options: ClientOptions) -> Self { options.apply(Self::default()) }
}
