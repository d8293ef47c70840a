//! In-memory connector whose attempts are decided by the test.
//!
//! Every call to [`Connector::connect`] parks until the test picks the
//! matching [`PendingAttempt`] off the [`ConnectorHandle`] and either
//! accepts it, yielding a [`PeerHandle`] for the server side, or refuses it.

use std::{
    future,
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use tether::{
    CloseReason,
    Payload,
    transport::{Connector, Incoming, Transport, TransportError},
};
use tokio::sync::{mpsc, oneshot};

type Reply = oneshot::Sender<Result<MemoryTransport, TransportError>>;

/// Create a connector and the handle that scripts its attempts.
///
/// ```
/// use tether::{Client, ConnectionState};
/// use tether_testing::scripted;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (connector, mut attempts) = scripted();
/// let client = Client::builder("mem://test").build(connector);
/// client.connect();
///
/// let _peer = attempts.next_attempt().await.expect("attempt").accept();
/// client.wait_for_state(|s| s == ConnectionState::Open).await;
/// # }
/// ```
#[must_use]
pub fn scripted() -> (ScriptedConnector, ConnectorHandle) {
    let (tx, rx) = mpsc::unbounded_channel();
    let made = Arc::new(AtomicUsize::new(0));
    (
        ScriptedConnector {
            attempts: tx,
            made: Arc::clone(&made),
        },
        ConnectorHandle { attempts: rx, made },
    )
}

/// Connector handing each attempt to a [`ConnectorHandle`].
#[derive(Debug)]
pub struct ScriptedConnector {
    attempts: mpsc::UnboundedSender<PendingAttempt>,
    made: Arc<AtomicUsize>,
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Transport = MemoryTransport;

    async fn connect(&self, address: &str) -> Result<MemoryTransport, TransportError> {
        self.made.fetch_add(1, Ordering::SeqCst);
        let (reply, outcome) = oneshot::channel();
        let attempt = PendingAttempt {
            address: address.to_owned(),
            reply,
        };
        if self.attempts.send(attempt).is_err() {
            return Err(refused());
        }
        // A dropped attempt counts as refused.
        outcome.await.unwrap_or_else(|_| Err(refused()))
    }
}

fn refused() -> TransportError {
    io::Error::from(io::ErrorKind::ConnectionRefused).into()
}

/// Test side of a [`ScriptedConnector`].
#[derive(Debug)]
pub struct ConnectorHandle {
    attempts: mpsc::UnboundedReceiver<PendingAttempt>,
    made: Arc<AtomicUsize>,
}

impl ConnectorHandle {
    /// Wait for the client to start an attempt.
    ///
    /// Returns `None` once the connector has been dropped.
    pub async fn next_attempt(&mut self) -> Option<PendingAttempt> { self.attempts.recv().await }

    /// Take an attempt that has already started, if any.
    pub fn try_next_attempt(&mut self) -> Option<PendingAttempt> { self.attempts.try_recv().ok() }

    /// Number of times [`Connector::connect`] has been called.
    #[must_use]
    pub fn attempts_made(&self) -> usize { self.made.load(Ordering::SeqCst) }
}

/// A connection attempt awaiting the test's verdict.
#[derive(Debug)]
pub struct PendingAttempt {
    address: String,
    reply: Reply,
}

impl PendingAttempt {
    /// Address the client asked for.
    #[must_use]
    pub fn address(&self) -> &str { &self.address }

    /// Let the attempt succeed and return the server side of the link.
    ///
    /// If the client abandoned the attempt meanwhile, the returned peer is
    /// already disconnected.
    #[must_use]
    pub fn accept(self) -> PeerHandle {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let fail_sends = Arc::new(AtomicBool::new(false));
        let stall_sends = Arc::new(AtomicBool::new(false));
        let transport = MemoryTransport {
            inbound: inbound_rx,
            outbound: outbound_tx,
            closed: Arc::clone(&closed),
            fail_sends: Arc::clone(&fail_sends),
            stall_sends: Arc::clone(&stall_sends),
        };
        let _ = self.reply.send(Ok(transport));
        PeerHandle {
            inbound: inbound_tx,
            outbound: outbound_rx,
            closed,
            fail_sends,
            stall_sends,
        }
    }

    /// Fail the attempt with `ConnectionRefused`.
    pub fn refuse(self) { self.fail(refused()); }

    /// Fail the attempt with `error`.
    pub fn fail(self, error: TransportError) { let _ = self.reply.send(Err(error)); }
}

/// Client side of an accepted in-memory link.
#[derive(Debug)]
pub struct MemoryTransport {
    inbound: mpsc::UnboundedReceiver<Result<Incoming, TransportError>>,
    outbound: mpsc::UnboundedSender<Payload>,
    closed: Arc<AtomicBool>,
    fail_sends: Arc<AtomicBool>,
    stall_sends: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&mut self, payload: Payload) -> Result<(), TransportError> {
        if self.stall_sends.load(Ordering::SeqCst) {
            // A peer that stopped reading: the write never completes.
            future::pending::<()>().await;
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe).into());
        }
        self.outbound
            .send(payload)
            .map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Result<Incoming, TransportError> {
        match self.inbound.recv().await {
            Some(item) => item,
            None => Ok(Incoming::Closed(CloseReason::new(None, "connection reset"))),
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        self.inbound.close();
        Ok(())
    }
}

/// Server side of an accepted in-memory link.
#[derive(Debug)]
pub struct PeerHandle {
    inbound: mpsc::UnboundedSender<Result<Incoming, TransportError>>,
    outbound: mpsc::UnboundedReceiver<Payload>,
    closed: Arc<AtomicBool>,
    fail_sends: Arc<AtomicBool>,
    stall_sends: Arc<AtomicBool>,
}

impl PeerHandle {
    /// Deliver `payload` to the client.
    pub fn push(&self, payload: impl Into<Payload>) {
        let _ = self.inbound.send(Ok(Incoming::Message(payload.into())));
    }

    /// End the link with a close frame.
    pub fn close_with(self, code: u16, reason: &str) {
        let _ = self
            .inbound
            .send(Ok(Incoming::Closed(CloseReason::new(Some(code), reason))));
    }

    /// End the link with a transport error.
    pub fn fail(self, kind: io::ErrorKind) {
        let _ = self.inbound.send(Err(io::Error::from(kind).into()));
    }

    /// Drop the link without a close frame.
    pub fn drop_link(self) {}

    /// Make every later client send fail with `BrokenPipe`.
    pub fn fail_sends(&self) { self.fail_sends.store(true, Ordering::SeqCst); }

    /// Make every later client send block forever, as if the peer stopped
    /// reading.
    pub fn stall_sends(&self) { self.stall_sends.store(true, Ordering::SeqCst); }

    /// Wait for the next payload written by the client.
    ///
    /// Returns `None` once the client side has been dropped.
    pub async fn next_sent(&mut self) -> Option<Payload> { self.outbound.recv().await }

    /// Take a payload the client has already written, if any.
    pub fn try_next_sent(&mut self) -> Option<Payload> { self.outbound.try_recv().ok() }

    /// Whether the client closed the link itself.
    #[must_use]
    pub fn was_closed(&self) -> bool { self.closed.load(Ordering::SeqCst) }
}
