//! Capture every event a client publishes, in order.

use std::sync::{Arc, Mutex, PoisonError};

use tether::{
    Client,
    CloseReason,
    Failure,
    Payload,
    events::{Close, Error, Failed, Message, Open, Opening},
};

/// One captured event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recorded {
    /// `Opening` with the target address.
    Opening(String),
    /// `Open`.
    Open,
    /// `Message` with its payload.
    Message(Payload),
    /// `Close` with its reason.
    Close(CloseReason),
    /// `Error`, rendered with `Display`.
    Error(String),
    /// `Failed` with its summary.
    Failed(Failure),
}

/// Ordered log of a client's events.
///
/// ```
/// use tether::Client;
/// use tether_testing::{EventLog, scripted};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (connector, _attempts) = scripted();
/// let client = Client::builder("mem://test").build(connector);
/// let log = EventLog::attach(&client);
/// assert!(log.entries().is_empty());
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    entries: Arc<Mutex<Vec<Recorded>>>,
}

impl EventLog {
    /// Register handlers for every event kind on `client`.
    #[must_use]
    pub fn attach(client: &Client) -> Self {
        let log = Self::default();
        let sink = log.clone();
        client.on::<Opening>(move |address| sink.push(Recorded::Opening(address.to_owned())));
        let sink = log.clone();
        client.on::<Open>(move |()| sink.push(Recorded::Open));
        let sink = log.clone();
        client.on::<Message>(move |payload| sink.push(Recorded::Message(payload.clone())));
        let sink = log.clone();
        client.on::<Close>(move |reason| sink.push(Recorded::Close(reason.clone())));
        let sink = log.clone();
        client.on::<Error>(move |error| sink.push(Recorded::Error(error.to_string())));
        let sink = log.clone();
        client.on::<Failed>(move |failure| sink.push(Recorded::Failed(failure.clone())));
        log
    }

    fn push(&self, entry: Recorded) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    /// Copy of everything captured so far.
    #[must_use]
    pub fn entries(&self) -> Vec<Recorded> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of captured events matching `predicate`.
    #[must_use]
    pub fn count(&self, predicate: impl Fn(&Recorded) -> bool) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|entry| predicate(entry))
            .count()
    }

    /// Number of `Close` events.
    #[must_use]
    pub fn closes(&self) -> usize { self.count(|entry| matches!(entry, Recorded::Close(_))) }

    /// Number of `Open` events.
    #[must_use]
    pub fn opens(&self) -> usize { self.count(|entry| matches!(entry, Recorded::Open)) }
}
