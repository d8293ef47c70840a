//! Shared utilities for integration tests.
//!
//! Builds clients wired to a scripted connector with heartbeats disabled so
//! the paused test clock only advances past reconnect delays.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use std::time::Duration;

use tether::{Client, ConnectionState};
use tether_testing::{ConnectorHandle, EventLog, PeerHandle, TEST_DELAY, scripted};

pub const ADDRESS: &str = "wss://svc/x";

/// A client, the handle scripting its attempts and a log of its events.
pub struct Harness {
    pub client: Client,
    pub attempts: ConnectorHandle,
    pub log: EventLog,
}

impl Harness {
    /// Client tolerating `max_attempts` failures, retrying after
    /// [`TEST_DELAY`], with heartbeats disabled.
    pub fn new(max_attempts: u32) -> Self {
        Self::with_heartbeat(max_attempts, Duration::ZERO)
    }

    pub fn with_heartbeat(max_attempts: u32, heartbeat: Duration) -> Self {
        let (connector, attempts) = scripted();
        let client = Client::builder(ADDRESS)
            .max_attempts(max_attempts)
            .reconnect_delay(TEST_DELAY)
            .heartbeat_interval(heartbeat)
            .build(connector);
        let log = EventLog::attach(&client);
        Self {
            client,
            attempts,
            log,
        }
    }

    /// Accept the next attempt and wait for the client to report it open.
    pub async fn accept_next(&mut self) -> PeerHandle {
        let peer = self
            .attempts
            .next_attempt()
            .await
            .expect("client should start an attempt")
            .accept();
        self.wait_for(ConnectionState::Open).await;
        peer
    }

    /// Refuse the next attempt.
    pub async fn refuse_next(&mut self) {
        self.attempts
            .next_attempt()
            .await
            .expect("client should start an attempt")
            .refuse();
    }

    pub async fn wait_for(&self, target: ConnectionState) {
        let reached = self.client.wait_for_state(|state| state == target).await;
        assert_eq!(reached, Some(target));
    }
}
