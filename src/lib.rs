#![doc(html_root_url = "https://docs.rs/tether/latest")]
//! Public API for the `tether` library.
//!
//! This crate provides a persistent message-stream client that keeps a
//! logical connection alive over an unreliable transport: it reconnects
//! after unexpected drops under a bounded retry policy, probes idle links
//! with heartbeats, and republishes every lifecycle change through a typed
//! event bus.

pub mod client;
pub mod events;
pub mod heartbeat;
pub mod metrics;
pub mod panic;
pub mod payload;
pub mod policy;
pub mod transport;

pub use client::{
    Client,
    ClientBuilder,
    ClientConfig,
    ClientError,
    ClientOptions,
    ConnectionState,
    Failure,
    WeakClient,
};
pub use events::{EventBus, EventKind, ListenerId};
pub use heartbeat::HeartbeatMonitor;
pub use metrics::Direction;
pub use payload::{CloseReason, Payload};
pub use policy::{ReconnectDecision, ReconnectPolicy};
pub use transport::{Connector, Incoming, Transport, TransportError};
