//! Resilient client handle and its connection task.
//!
//! [`Client`] is a cheap, cloneable handle. Every operation is a
//! non-blocking request to a background task that owns the transport;
//! outcomes are reported through [`events`](crate::events) and the
//! observable [`ConnectionState`], never as return values.
//!
//! The task exits once every [`Client`] handle has been dropped. A handler
//! that captures a `Client` is itself such a handle and keeps the task alive
//! for as long as it stays registered; handlers should capture a
//! [`WeakClient`] instead.

mod actor;
mod builder;
mod config;
mod error;
mod state;

use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use actor::{Command, ConnectionActor};
pub use builder::ClientBuilder;
pub use config::{ClientConfig, ClientOptions, DEFAULT_CLOSE_TIMEOUT, DEFAULT_SEND_TIMEOUT};
pub use error::ClientError;
pub use state::{ConnectionState, Failure};
use tokio::sync::{mpsc, watch};
use tracing::{Instrument, debug, info_span};

use crate::{
    events::{EventBus, EventKind, ListenerId, WeakEventBus},
    payload::Payload,
    transport::Connector,
};

/// Handle to a persistent, self-healing connection.
///
/// # Examples
///
/// ```no_run
/// use tether::{
///     Client,
///     events::{Message, Open},
///     transport::WebSocketConnector,
/// };
///
/// # #[tokio::main]
/// # async fn main() {
/// let client = Client::builder("wss://svc/x").build(WebSocketConnector::new());
/// let sender = client.downgrade();
/// client.on::<Open>(move |()| sender.send("hello"));
/// client.on::<Message>(|payload| println!("{payload:?}"));
/// client.connect();
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    address: Arc<str>,
    commands: mpsc::UnboundedSender<Command>,
    events: EventBus,
    state: watch::Receiver<ConnectionState>,
    attempts: Arc<AtomicU32>,
}

impl Client {
    /// Spawn a connection task for `address` using `connector`.
    ///
    /// No transport is opened until [`connect`](Self::connect) is called.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new<C: Connector>(address: impl Into<String>, connector: C, config: ClientConfig) -> Self {
        let address: Arc<str> = Arc::from(address.into());
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ConnectionState::Idle);
        let events = EventBus::new();
        let attempts = Arc::new(AtomicU32::new(0));

        let actor = ConnectionActor::new(
            Arc::clone(&address),
            connector,
            config.normalized(),
            command_rx,
            events.clone(),
            state_tx,
            Arc::clone(&attempts),
        );
        let span = info_span!("tether.connection", address = %address);
        tokio::spawn(actor.run().instrument(span));

        Self {
            address,
            commands,
            events,
            state,
            attempts,
        }
    }

    /// Start configuring a client for `address`.
    pub fn builder(address: impl Into<String>) -> ClientBuilder { ClientBuilder::new(address) }

    /// Target address.
    #[must_use]
    pub fn address(&self) -> &str { &self.address }

    /// Open the transport.
    ///
    /// From `Idle`, `Closed` or `Failed` this starts a fresh session with the
    /// attempt counter at zero. While a retry is pending it skips the
    /// remaining delay. Ignored while connecting or open.
    pub fn connect(&self) { self.dispatch(Command::Connect); }

    /// Forward `payload` to the transport unchanged.
    ///
    /// If the connection is not open when the request is processed, the
    /// payload is dropped and a [`ClientError::NotOpen`] is published to
    /// [`Error`](crate::events::Error) handlers.
    pub fn send(&self, payload: impl Into<Payload>) { self.dispatch(Command::Send(payload.into())); }

    /// Close the transport and cancel any pending reconnect.
    ///
    /// No further attempts are made until [`connect`](Self::connect) is
    /// called again.
    pub fn close(&self) { self.dispatch(Command::Close); }

    /// Register `handler` for every `K` event.
    pub fn on<K: EventKind>(
        &self,
        handler: impl Fn(&K::Payload) + Send + Sync + 'static,
    ) -> ListenerId {
        self.events.on::<K>(handler)
    }

    /// Register `handler` for the next `K` event only.
    pub fn once<K: EventKind>(&self, handler: impl FnOnce(&K::Payload) + Send + 'static) -> ListenerId {
        self.events.once::<K>(handler)
    }

    /// Unregister a handler. Returns `false` if it was not registered.
    pub fn off<K: EventKind>(&self, id: ListenerId) -> bool { self.events.off::<K>(id) }

    /// Event registry shared with the connection task.
    #[must_use]
    pub fn events(&self) -> &EventBus { &self.events }

    /// Most recently published state.
    #[must_use]
    pub fn state(&self) -> ConnectionState { *self.state.borrow() }

    /// A receiver notified on every state transition.
    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> { self.state.clone() }

    /// Wait until the state satisfies `predicate` and return it.
    ///
    /// Resolves immediately if the current state already matches. Returns
    /// `None` if the connection task has exited.
    pub async fn wait_for_state(
        &self,
        mut predicate: impl FnMut(ConnectionState) -> bool,
    ) -> Option<ConnectionState> {
        let mut state = self.state.clone();
        state.wait_for(|current| predicate(*current)).await.ok().map(|current| *current)
    }

    /// Consecutive failed attempts since the last successful open.
    #[must_use]
    pub fn attempts(&self) -> u32 { self.attempts.load(Ordering::Relaxed) }

    /// A handle that does not keep the connection task alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakClient {
        WeakClient {
            address: Arc::clone(&self.address),
            commands: self.commands.downgrade(),
            events: self.events.downgrade(),
            state: self.state.clone(),
            attempts: Arc::clone(&self.attempts),
        }
    }

    fn dispatch(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!(address = %self.address, "connection task has exited");
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("address", &self.address)
            .field("state", &self.state())
            .field("attempts", &self.attempts())
            .finish_non_exhaustive()
    }
}

/// Non-owning handle to a [`Client`]'s connection.
///
/// Requests made through a `WeakClient` reach the connection task while any
/// [`Client`] handle exists and are dropped after that. Capture one in event
/// handlers so the registry does not keep its own task running.
#[derive(Clone)]
pub struct WeakClient {
    address: Arc<str>,
    commands: mpsc::WeakUnboundedSender<Command>,
    events: WeakEventBus,
    state: watch::Receiver<ConnectionState>,
    attempts: Arc<AtomicU32>,
}

impl WeakClient {
    /// Target address.
    #[must_use]
    pub fn address(&self) -> &str { &self.address }

    /// See [`Client::connect`].
    pub fn connect(&self) { self.dispatch(Command::Connect); }

    /// See [`Client::send`].
    pub fn send(&self, payload: impl Into<Payload>) { self.dispatch(Command::Send(payload.into())); }

    /// See [`Client::close`].
    pub fn close(&self) { self.dispatch(Command::Close); }

    /// Most recently published state.
    #[must_use]
    pub fn state(&self) -> ConnectionState { *self.state.borrow() }

    /// Recover a full handle, or `None` once every [`Client`] is gone.
    #[must_use]
    pub fn upgrade(&self) -> Option<Client> {
        Some(Client {
            address: Arc::clone(&self.address),
            commands: self.commands.upgrade()?,
            events: self.events.upgrade()?,
            state: self.state.clone(),
            attempts: Arc::clone(&self.attempts),
        })
    }

    fn dispatch(&self, command: Command) {
        match self.commands.upgrade() {
            Some(commands) if commands.send(command).is_ok() => {}
            _ => debug!(address = %self.address, "client dropped; request ignored"),
        }
    }
}

impl std::fmt::Debug for WeakClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakClient")
            .field("address", &self.address)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
