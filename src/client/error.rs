//! Error types reported through the client's `Error` event.

use super::ConnectionState;
use crate::transport::TransportError;

/// Non-fatal failures published to [`Error`](crate::events::Error) handlers.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// `send` was called while no transport was open. The payload was
    /// discarded.
    #[error("cannot send while connection is {state}")]
    NotOpen {
        /// State at the time of the call.
        state: ConnectionState,
    },
    /// Writing an outbound payload failed.
    #[error("failed to send message")]
    Send(#[source] TransportError),
    /// Writing a liveness probe failed.
    #[error("failed to send heartbeat")]
    Heartbeat(#[source] TransportError),
}
