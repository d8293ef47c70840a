//! Utilities for driving a [`tether::Client`] against scripted, in-memory
//! transports during tests.
//!
//! [`scripted`] returns a connector whose attempts park until the test
//! accepts or refuses them, so reconnect sequences can be stepped through
//! deterministically under a paused Tokio clock. [`EventLog`] captures the
//! events a client publishes for later assertions.

mod recorder;
mod scripted;

use std::time::Duration;

pub use recorder::{EventLog, Recorded};
pub use scripted::{
    ConnectorHandle,
    MemoryTransport,
    PeerHandle,
    PendingAttempt,
    ScriptedConnector,
    scripted,
};

/// Let spawned tasks process everything already queued.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Short reconnect delay used by test clients.
pub const TEST_DELAY: Duration = Duration::from_millis(10);
