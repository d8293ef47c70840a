//! Metric helpers for `tether`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. With the `metrics` feature
//! disabled the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the gauge tracking currently open connections.
pub const CONNECTIONS_OPEN: &str = "tether_connections_open";
/// Name of the counter tracking messages moved over open connections.
pub const MESSAGES_TOTAL: &str = "tether_messages_total";
/// Name of the counter tracking reconnection attempts.
pub const RECONNECT_ATTEMPTS: &str = "tether_reconnect_attempts_total";
/// Name of the counter tracking errors reported through the `Error` event.
pub const ERRORS_TOTAL: &str = "tether_errors_total";
/// Name of the counter tracking panics raised by event handlers.
pub const HANDLER_PANICS: &str = "tether_handler_panics_total";

/// Direction of message flow.
#[derive(Clone, Copy, Debug)]
pub enum Direction {
    /// Messages received from the server.
    Inbound,
    /// Messages written to the server, heartbeat probes included.
    Outbound,
}

impl Direction {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Increment the open connections gauge.
pub fn inc_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_OPEN).increment(1.0);
}

/// Decrement the open connections gauge.
pub fn dec_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_OPEN).decrement(1.0);
}

/// Record a message for the given direction.
pub fn inc_messages(direction: Direction) {
    #[cfg(feature = "metrics")]
    counter!(MESSAGES_TOTAL, "direction" => direction.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = direction;
}

/// Record a reconnection attempt.
pub fn inc_reconnect_attempts() {
    #[cfg(feature = "metrics")]
    counter!(RECONNECT_ATTEMPTS).increment(1);
}

/// Record an error occurrence.
pub fn inc_errors() {
    #[cfg(feature = "metrics")]
    counter!(ERRORS_TOTAL).increment(1);
}

/// Record a panic raised by an event handler.
pub fn inc_handler_panics() {
    #[cfg(feature = "metrics")]
    counter!(HANDLER_PANICS).increment(1);
}
