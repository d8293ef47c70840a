//! Length-prefixed frames over plain TCP.
//!
//! Each payload travels as one frame with a four byte big-endian length
//! prefix. Frames carry no type tag, so everything received arrives as
//! [`Payload::Binary`].

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::debug;

use super::{Connector, Incoming, Transport, TransportError};
use crate::payload::{CloseReason, Payload};

const MIN_FRAME_LENGTH: usize = 64;
const MAX_FRAME_LENGTH: usize = 16 * 1024 * 1024;
/// Default largest frame accepted in either direction.
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 1024 * 1024;

const SCHEME: &str = "tcp://";

/// Opens [`TcpTransport`]s to `host:port` or `tcp://host:port` addresses.
///
/// # Examples
///
/// ```
/// use tether::transport::TcpConnector;
///
/// let connector = TcpConnector::new().max_frame_length(8);
/// assert_eq!(connector.max_frame_length_value(), 64);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct TcpConnector {
    max_frame_length: usize,
    nodelay: bool,
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self {
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            nodelay: true,
        }
    }
}

impl TcpConnector {
    /// Create a connector with a 1 MiB frame limit and `TCP_NODELAY` set.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Set the maximum frame length for encoding and decoding.
    ///
    /// The value is clamped between 64 bytes and 16 MiB.
    #[must_use]
    pub fn max_frame_length(mut self, max_frame_length: usize) -> Self {
        self.max_frame_length = max_frame_length.clamp(MIN_FRAME_LENGTH, MAX_FRAME_LENGTH);
        self
    }

    /// Configured maximum frame length.
    #[must_use]
    pub const fn max_frame_length_value(&self) -> usize { self.max_frame_length }

    /// Toggle `TCP_NODELAY` on new sockets.
    #[must_use]
    pub const fn nodelay(mut self, enabled: bool) -> Self {
        self.nodelay = enabled;
        self
    }

    fn build_codec(&self) -> LengthDelimitedCodec {
        LengthDelimitedCodec::builder()
            .length_field_length(4)
            .big_endian()
            .max_frame_length(self.max_frame_length)
            .new_codec()
    }
}

/// Strip an optional `tcp://` scheme and any trailing path.
fn host_port(address: &str) -> Result<&str, TransportError> {
    let rest = address.strip_prefix(SCHEME).unwrap_or(address);
    let host = rest.split('/').next().unwrap_or_default();
    if host.is_empty() || !host.contains(':') {
        return Err(TransportError::InvalidAddress(address.to_owned()));
    }
    Ok(host)
}

#[async_trait]
impl Connector for TcpConnector {
    type Transport = TcpTransport;

    async fn connect(&self, address: &str) -> Result<TcpTransport, TransportError> {
        let target = host_port(address)?;
        let stream = TcpStream::connect(target).await?;
        stream.set_nodelay(self.nodelay)?;
        debug!(peer = ?stream.peer_addr().ok(), "tcp link established");
        Ok(TcpTransport::new(stream, self.build_codec()))
    }
}

/// A framed TCP stream.
#[derive(Debug)]
pub struct TcpTransport {
    framed: Framed<TcpStream, LengthDelimitedCodec>,
}

impl TcpTransport {
    fn new(stream: TcpStream, codec: LengthDelimitedCodec) -> Self {
        Self {
            framed: Framed::new(stream, codec),
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, payload: Payload) -> Result<(), TransportError> {
        self.framed.send(payload.into_bytes()).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Incoming, TransportError> {
        match self.framed.next().await {
            Some(Ok(frame)) => Ok(Incoming::Message(Payload::Binary(frame.freeze()))),
            Some(Err(err)) => Err(err.into()),
            None => Ok(Incoming::Closed(CloseReason::new(
                None,
                "connection closed by peer",
            ))),
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        SinkExt::<Bytes>::close(&mut self.framed).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tokio::net::TcpListener;

    use super::*;

    async fn listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        (listener, format!("tcp://{addr}"))
    }

    #[rstest]
    #[case("tcp://127.0.0.1:9000", "127.0.0.1:9000")]
    #[case("127.0.0.1:9000", "127.0.0.1:9000")]
    #[case("tcp://localhost:80/ignored", "localhost:80")]
    fn host_port_strips_scheme(#[case] address: &str, #[case] expected: &str) {
        assert_eq!(host_port(address).expect("valid address"), expected);
    }

    #[rstest]
    #[case("tcp://")]
    #[case("localhost")]
    #[case("")]
    fn host_port_rejects_missing_port(#[case] address: &str) {
        assert!(matches!(
            host_port(address),
            Err(TransportError::InvalidAddress(_))
        ));
    }

    #[rstest]
    #[case(0, 64)]
    #[case(4096, 4096)]
    #[case(usize::MAX, 16 * 1024 * 1024)]
    fn frame_length_is_clamped(#[case] requested: usize, #[case] expected: usize) {
        let connector = TcpConnector::new().max_frame_length(requested);
        assert_eq!(connector.max_frame_length_value(), expected);
    }

    #[tokio::test]
    async fn frames_flow_both_ways() {
        let (listener, address) = listener().await;
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut framed = Framed::new(stream, LengthDelimitedCodec::new());
            let frame = framed.next().await.expect("frame").expect("decode");
            framed.send(frame.freeze()).await.expect("echo");
        });

        let mut transport = TcpConnector::new().connect(&address).await.expect("connect");
        transport.send(Payload::from("hello")).await.expect("send");
        let echoed = transport.recv().await.expect("recv");

        assert_eq!(
            echoed,
            Incoming::Message(Payload::Binary(Bytes::from_static(b"hello")))
        );
        server.await.expect("server task");
    }

    #[tokio::test]
    async fn peer_shutdown_is_reported_as_close() {
        let (listener, address) = listener().await;
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            drop(stream);
        });

        let mut transport = TcpConnector::new().connect(&address).await.expect("connect");
        server.await.expect("server task");

        let incoming = transport.recv().await.expect("recv");
        assert!(matches!(incoming, Incoming::Closed(reason) if reason.code.is_none()));
    }

    #[tokio::test]
    async fn refused_connection_is_an_io_error() {
        let (listener, address) = listener().await;
        drop(listener);

        let result = TcpConnector::new().connect(&address).await;
        assert!(matches!(result, Err(TransportError::Io(_))));
    }
}
