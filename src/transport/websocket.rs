//! WebSocket transport for `ws://` and `wss://` addresses.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream,
    WebSocketStream,
    connect_async,
    tungstenite::{Error as WsError, Message, protocol::CloseFrame},
};
use tracing::debug;

use super::{Connector, Incoming, Transport, TransportError};
use crate::payload::{CloseReason, Payload};

/// Opens [`WebSocketTransport`]s with the client handshake.
#[derive(Clone, Copy, Debug, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    /// Create a connector.
    #[must_use]
    pub const fn new() -> Self { Self }
}

#[async_trait]
impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    async fn connect(&self, address: &str) -> Result<WebSocketTransport, TransportError> {
        let (stream, response) = connect_async(address).await?;
        debug!(status = %response.status(), "websocket handshake complete");
        Ok(WebSocketTransport { stream })
    }
}

/// An open WebSocket.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

fn close_reason(frame: Option<CloseFrame>) -> CloseReason {
    match frame {
        Some(frame) => CloseReason::new(Some(u16::from(frame.code)), frame.reason.as_str()),
        None => CloseReason::new(None, "connection closed by peer"),
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, payload: Payload) -> Result<(), TransportError> {
        let message = match payload {
            Payload::Text(text) => Message::text(text),
            Payload::Binary(bytes) => Message::binary(bytes),
        };
        self.stream.send(message).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Incoming, TransportError> {
        loop {
            let Some(next) = self.stream.next().await else {
                return Ok(Incoming::Closed(close_reason(None)));
            };
            match next {
                Ok(Message::Text(text)) => {
                    return Ok(Incoming::Message(Payload::Text(text.as_str().to_owned())));
                }
                Ok(Message::Binary(bytes)) => return Ok(Incoming::Message(Payload::Binary(bytes))),
                Ok(Message::Close(frame)) => return Ok(Incoming::Closed(close_reason(frame))),
                // Control frames are answered by tungstenite itself.
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => {
                    return Ok(Incoming::Closed(close_reason(None)));
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
