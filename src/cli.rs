//! Command line interface for the `tether` binary.
//!
//! Kept free of library imports so the build script can include it to
//! render the man page.

use clap::{Parser, ValueEnum};

/// Transport used to reach the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TransportKind {
    /// WebSocket (`ws://` or `wss://`).
    Websocket,
    /// Length-prefixed frames over TCP.
    Tcp,
}

impl TransportKind {
    /// Pick a transport from the address scheme.
    #[must_use]
    pub fn infer(address: &str) -> Self {
        if address.starts_with("tcp://") {
            Self::Tcp
        } else {
            Self::Websocket
        }
    }
}

/// Command line arguments for the `tether` binary.
///
/// Inbound messages are printed to stdout; each line read from stdin is sent
/// as a text message.
#[derive(Debug, Parser)]
#[command(
    name = "tether",
    version,
    about = "Keep a message stream open across network failures"
)]
pub struct Cli {
    /// Server address, e.g. `wss://host/path` or `tcp://host:port`.
    pub address: String,

    /// Consecutive failed attempts tolerated before giving up.
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Pause before each reconnection attempt, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub reconnect_delay_ms: Option<u64>,

    /// Idle time before a heartbeat is sent, in milliseconds. Zero disables
    /// heartbeats.
    #[arg(long, value_name = "MS")]
    pub heartbeat_interval_ms: Option<u64>,

    /// Transport to use. Inferred from the address scheme when omitted.
    #[arg(long, value_enum)]
    pub transport: Option<TransportKind>,
}
