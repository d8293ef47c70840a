//! Error types for transport operations.

use std::{io, time::Duration};

/// Errors raised while opening or using a transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Socket or codec error.
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),
    /// The address could not be used by this transport.
    #[error("invalid address `{0}`")]
    InvalidAddress(String),
    /// The link is already gone.
    #[error("connection closed")]
    Closed,
    /// A write made no progress within the allowed time.
    #[error("write timed out after {0:?}")]
    TimedOut(Duration),
    /// WebSocket handshake or protocol failure.
    #[cfg(feature = "websocket")]
    #[error("websocket error: {0}")]
    WebSocket(#[source] Box<tokio_tungstenite::tungstenite::Error>),
}

#[cfg(feature = "websocket")]
impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(value: tokio_tungstenite::tungstenite::Error) -> Self { Self::WebSocket(Box::new(value)) }
}
