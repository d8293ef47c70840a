//! Builder for configuring and spawning a [`Client`].

use std::time::Duration;

use super::{Client, ClientConfig, ClientOptions};
use crate::{payload::Payload, transport::Connector};

/// Builder for [`Client`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use tether::{client::ClientBuilder, transport::TcpConnector};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let client = ClientBuilder::new("tcp://127.0.0.1:9000")
///     .max_attempts(3)
///     .reconnect_delay(Duration::from_millis(10))
///     .heartbeat_interval(Duration::ZERO)
///     .build(TcpConnector::new());
/// assert_eq!(client.address(), "tcp://127.0.0.1:9000");
/// # }
/// ```
#[derive(Clone, Debug)]
#[must_use]
pub struct ClientBuilder {
    address: String,
    config: ClientConfig,
}

impl ClientBuilder {
    /// Start building a client for `address` with default settings.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            config: ClientConfig::default(),
        }
    }

    /// Consecutive failed attempts tolerated before giving up.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.config = self.config.with_max_attempts(max_attempts);
        self
    }

    /// Pause before each reconnection attempt.
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.config = self.config.with_reconnect_delay(delay);
        self
    }

    /// Interval between liveness probes. Zero disables them.
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config = self.config.with_heartbeat_interval(interval);
        self
    }

    /// Body of each liveness probe.
    pub fn heartbeat_payload(mut self, payload: impl Into<Payload>) -> Self {
        self.config = self.config.with_heartbeat_payload(payload);
        self
    }

    /// Bound on a caller-initiated close.
    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_close_timeout(timeout);
        self
    }

    /// Bound on a single write before the link is dropped.
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_send_timeout(timeout);
        self
    }

    /// Overlay deserialized options on the current settings.
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.config = options.apply(self.config);
        self
    }

    /// Replace every setting at once.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Spawn the connection task and return a handle to it.
    ///
    /// The client starts [`Idle`](super::ConnectionState::Idle); call
    /// [`Client::connect`] to open the first transport.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn build<C: Connector>(self, connector: C) -> Client {
        Client::new(self.address, connector, self.config)
    }
}
