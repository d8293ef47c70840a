//! The connection task.
//!
//! One task per [`Client`](super::Client) owns the live transport, the
//! attempt counter, the heartbeat and any pending reconnect timer. It waits
//! on a single `select!` over caller commands and whichever source the
//! current [`Phase`] makes relevant, so a transport signal, a heartbeat and a
//! retry can never race each other.

use std::{
    mem,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use futures::future::BoxFuture;
use tokio::{
    sync::{mpsc, watch},
    time::{Sleep, sleep, timeout},
};
use tracing::{debug, info, trace, warn};

use super::{ClientConfig, ClientError, ConnectionState, Failure};
use crate::{
    events::{self, EventBus},
    heartbeat::HeartbeatMonitor,
    metrics::{self, Direction},
    payload::{CloseReason, Payload},
    policy::ReconnectDecision,
    transport::{Connector, Incoming, Transport, TransportError},
};

/// Requests sent from [`Client`](super::Client) handles.
#[derive(Debug)]
pub(super) enum Command {
    Connect,
    Send(Payload),
    Close,
}

/// Where the connection is in its lifecycle.
///
/// A caller-initiated close replaces whatever is in flight with `Closed`,
/// dropping a pending attempt or retry timer with it, so no stale timer can
/// reconnect afterwards.
enum Phase<T> {
    Idle,
    Connecting(BoxFuture<'static, Result<T, TransportError>>),
    Open(T),
    Backoff(Pin<Box<Sleep>>),
    Closed,
    Failed,
}

/// Events returned by [`ConnectionActor::next_event`].
enum Event<T> {
    Command(Option<Command>),
    Connected(Result<T, TransportError>),
    Inbound(Result<Incoming, TransportError>),
    HeartbeatDue,
    RetryDue,
}

pub(super) struct ConnectionActor<C: Connector> {
    address: Arc<str>,
    connector: Arc<C>,
    config: ClientConfig,
    commands: mpsc::UnboundedReceiver<Command>,
    events: EventBus,
    state: watch::Sender<ConnectionState>,
    attempts: Arc<AtomicU32>,
    heartbeat: HeartbeatMonitor,
    phase: Phase<C::Transport>,
}

impl<C: Connector> ConnectionActor<C> {
    pub(super) fn new(
        address: Arc<str>,
        connector: C,
        config: ClientConfig,
        commands: mpsc::UnboundedReceiver<Command>,
        events: EventBus,
        state: watch::Sender<ConnectionState>,
        attempts: Arc<AtomicU32>,
    ) -> Self {
        let heartbeat = HeartbeatMonitor::new(config.heartbeat_interval);
        Self {
            address,
            connector: Arc::new(connector),
            config,
            commands,
            events,
            state,
            attempts,
            heartbeat,
            phase: Phase::Idle,
        }
    }

    /// Drive the connection until every client handle is dropped.
    pub(super) async fn run(mut self) {
        loop {
            match self.next_event().await {
                Event::Command(None) => break,
                Event::Command(Some(command)) => self.handle_command(command).await,
                Event::Connected(result) => self.handle_connected(result),
                Event::Inbound(result) => self.handle_inbound(result),
                Event::HeartbeatDue => self.send_probe().await,
                Event::RetryDue => self.begin_attempt(),
            }
        }
        self.shutdown().await;
    }

    /// Wait for the next thing to act on.
    ///
    /// Commands are polled first so a close always wins over a transport
    /// signal or timer that became ready at the same time.
    async fn next_event(&mut self) -> Event<C::Transport> {
        let Self {
            commands,
            phase,
            heartbeat,
            ..
        } = self;

        match phase {
            Phase::Connecting(attempt) => tokio::select! {
                biased;

                command = commands.recv() => Event::Command(command),
                result = attempt.as_mut() => Event::Connected(result),
            },
            Phase::Open(transport) => tokio::select! {
                biased;

                command = commands.recv() => Event::Command(command),
                result = transport.recv() => Event::Inbound(result),
                () = heartbeat.tick() => Event::HeartbeatDue,
            },
            Phase::Backoff(delay) => tokio::select! {
                biased;

                command = commands.recv() => Event::Command(command),
                () = delay.as_mut() => Event::RetryDue,
            },
            Phase::Idle | Phase::Closed | Phase::Failed => Event::Command(commands.recv().await),
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect => self.connect(),
            Command::Send(payload) => self.send(payload).await,
            Command::Close => self.close().await,
        }
    }

    fn current_state(&self) -> ConnectionState { *self.state.borrow() }

    fn set_state(&self, next: ConnectionState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            debug!(from = %current, to = %next, "state changed");
            *current = next;
            true
        });
    }

    fn connect(&mut self) {
        match self.phase {
            Phase::Idle | Phase::Closed | Phase::Failed => {
                self.attempts.store(0, Ordering::Relaxed);
                self.begin_attempt();
            }
            // Skip the rest of the delay; the counter carries on.
            Phase::Backoff(_) => self.begin_attempt(),
            Phase::Connecting(_) | Phase::Open(_) => {
                debug!(state = %self.current_state(), "connect ignored");
            }
        }
    }

    fn begin_attempt(&mut self) {
        let attempts = self.attempts.load(Ordering::Relaxed);
        let connector = Arc::clone(&self.connector);
        let address = Arc::clone(&self.address);
        self.phase = Phase::Connecting(Box::pin(
            async move { connector.connect(&address).await },
        ));
        self.set_state(ConnectionState::Connecting);

        if attempts == 0 {
            info!("connecting");
            self.events.emit::<events::Opening>(&*self.address);
        } else {
            metrics::inc_reconnect_attempts();
            info!(attempt = attempts + 1, "reconnecting");
        }
    }

    fn handle_connected(&mut self, result: Result<C::Transport, TransportError>) {
        match result {
            Ok(transport) => {
                self.attempts.store(0, Ordering::Relaxed);
                self.phase = Phase::Open(transport);
                self.heartbeat.start();
                metrics::inc_connections();
                self.set_state(ConnectionState::Open);
                info!("connection open");
                self.events.emit::<events::Open>(&());
            }
            Err(err) => {
                warn!(error = %err, "connection attempt failed");
                self.link_lost(CloseReason::from_error(&err));
            }
        }
    }

    fn handle_inbound(&mut self, result: Result<Incoming, TransportError>) {
        match result {
            Ok(Incoming::Message(payload)) => {
                self.heartbeat.restart();
                metrics::inc_messages(Direction::Inbound);
                trace!(len = payload.len(), "message received");
                self.events.emit::<events::Message>(&payload);
            }
            Ok(Incoming::Closed(reason)) => {
                info!(%reason, "connection closed by peer");
                self.link_lost(reason);
            }
            Err(err) => {
                warn!(error = %err, "connection lost");
                self.link_lost(CloseReason::from_error(&err));
            }
        }
    }

    /// Handle any close the caller did not ask for, including a failed
    /// attempt, and decide whether to try again.
    fn link_lost(&mut self, reason: CloseReason) {
        self.heartbeat.stop();
        if matches!(mem::replace(&mut self.phase, Phase::Closed), Phase::Open(_)) {
            metrics::dec_connections();
        }

        let attempts = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        match self.config.policy.decide(attempts) {
            ReconnectDecision::Retry { delay } => {
                self.phase = Phase::Backoff(Box::pin(sleep(delay)));
                self.set_state(ConnectionState::Closed);
                info!(
                    attempt = attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "reconnect scheduled"
                );
                self.events.emit::<events::Close>(&reason);
            }
            ReconnectDecision::GiveUp => {
                self.phase = Phase::Failed;
                self.set_state(ConnectionState::Failed);
                warn!(attempts, "reconnect attempts exhausted");
                self.events.emit::<events::Close>(&reason);
                self.events.emit::<events::Failed>(&Failure {
                    attempts,
                    last_close: reason,
                });
            }
        }
    }

    async fn send(&mut self, payload: Payload) {
        let Phase::Open(transport) = &mut self.phase else {
            let state = self.current_state();
            self.report(ClientError::NotOpen { state });
            return;
        };
        let len = payload.len();
        match Self::write(transport, payload, self.config.send_timeout).await {
            Ok(()) => {
                metrics::inc_messages(Direction::Outbound);
                trace!(len, "message sent");
            }
            Err(err) => self.write_failed(err, ClientError::Send),
        }
    }

    async fn send_probe(&mut self) {
        let Phase::Open(transport) = &mut self.phase else {
            return;
        };
        trace!("sending heartbeat");
        let probe = self.config.heartbeat_payload.clone();
        match Self::write(transport, probe, self.config.send_timeout).await {
            Ok(()) => metrics::inc_messages(Direction::Outbound),
            Err(err) => self.write_failed(err, ClientError::Heartbeat),
        }
    }

    // A stalled write would otherwise keep commands from being polled.
    async fn write(
        transport: &mut C::Transport,
        payload: Payload,
        limit: Duration,
    ) -> Result<(), TransportError> {
        timeout(limit, transport.send(payload))
            .await
            .unwrap_or(Err(TransportError::TimedOut(limit)))
    }

    /// Report a failed write. A timed-out write also drops the link, since
    /// the transport may be left with a partial frame.
    fn write_failed(&mut self, err: TransportError, wrap: fn(TransportError) -> ClientError) {
        let lost = matches!(err, TransportError::TimedOut(_)).then(|| CloseReason::from_error(&err));
        self.report(wrap(err));
        if let Some(reason) = lost {
            self.link_lost(reason);
        }
    }

    /// Caller-initiated close. Never schedules a reconnect.
    async fn close(&mut self) {
        match mem::replace(&mut self.phase, Phase::Closed) {
            Phase::Open(mut transport) => {
                self.set_state(ConnectionState::Closing);
                self.heartbeat.stop();
                Self::close_transport(&mut transport, self.config.close_timeout).await;
                drop(transport);
                metrics::dec_connections();
                self.set_state(ConnectionState::Closed);
                info!("connection closed by client");
                self.events.emit::<events::Close>(&CloseReason::by_client());
            }
            Phase::Connecting(_) | Phase::Backoff(_) => {
                self.set_state(ConnectionState::Closed);
                info!("pending connection cancelled");
            }
            Phase::Idle | Phase::Failed | Phase::Closed => {
                self.set_state(ConnectionState::Closed);
            }
        }
    }

    // Takes no `&self`: holding a shared borrow of the actor across this
    // await would require the actor to be `Sync`.
    async fn close_transport(transport: &mut C::Transport, limit: Duration) {
        match timeout(limit, transport.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(error = %err, "transport close failed"),
            Err(_) => warn!(
                timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                "transport close timed out"
            ),
        }
    }

    fn report(&self, error: ClientError) {
        metrics::inc_errors();
        warn!(error = %error, "client error");
        self.events.emit::<events::Error>(&error);
    }

    /// Every handle is gone: release the transport without notifying anyone.
    async fn shutdown(mut self) {
        self.heartbeat.stop();
        if let Phase::Open(mut transport) = mem::replace(&mut self.phase, Phase::Closed) {
            Self::close_transport(&mut transport, self.config.close_timeout).await;
            metrics::dec_connections();
        }
        self.set_state(ConnectionState::Closed);
        debug!("connection task exiting");
    }
}
