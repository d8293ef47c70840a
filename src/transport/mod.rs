//! Transport abstraction consumed by the connection task.
//!
//! A [`Connector`] opens one physical link per attempt; the resulting
//! [`Transport`] is owned exclusively by the connection task until it
//! closes. Each transport signal (data received, peer closed, I/O failure)
//! is returned from [`Transport::recv`] and handled by exactly one place in
//! the client, so nothing outside the crate can intercept or overwrite it.

use async_trait::async_trait;

use crate::payload::{CloseReason, Payload};

mod error;
pub mod tcp;
#[cfg(feature = "websocket")]
pub mod websocket;

pub use error::TransportError;
pub use tcp::{TcpConnector, TcpTransport};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnector, WebSocketTransport};

/// Something a transport can hand back from [`Transport::recv`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Incoming {
    /// Data from the peer.
    Message(Payload),
    /// The peer ended the link. The transport must not be polled again.
    Closed(CloseReason),
}

/// A single open, bidirectional message channel.
///
/// # Cancel safety
///
/// [`recv`](Self::recv) is raced against commands and timers, so it must be
/// cancel-safe: dropping the future before it resolves must not lose data.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Write `payload` to the peer.
    async fn send(&mut self, payload: Payload) -> Result<(), TransportError>;

    /// Wait for the next message or for the link to end.
    async fn recv(&mut self) -> Result<Incoming, TransportError>;

    /// Ask the peer to close the link and release local resources.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Factory opening a fresh [`Transport`] for each connection attempt.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Transport produced by a successful attempt.
    type Transport: Transport;

    /// Open a transport to `address`.
    async fn connect(&self, address: &str) -> Result<Self::Transport, TransportError>;
}
