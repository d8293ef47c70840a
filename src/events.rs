//! Typed publish/subscribe dispatch for connection lifecycle events.
//!
//! Each event kind is a marker type implementing [`EventKind`]; its
//! associated `Payload` fixes the handler signature at compile time, so an
//! `Open` handler can never be handed a `Message` payload. Handlers are kept
//! per kind in registration order and invoked in that order.
//!
//! Dispatch isolates handlers from each other: a handler that panics is
//! logged and skipped, and the remaining handlers still run.

use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
    PoisonError,
    Weak,
    atomic::{AtomicU64, Ordering},
};

use tracing::error;

use crate::{
    client::{ClientError, Failure},
    metrics,
    panic::invoke_isolated,
    payload::{CloseReason, Payload},
};

/// Shared, type-erased event handler.
pub type Handler<P> = Arc<dyn Fn(&P) + Send + Sync>;

/// Identifies a registered handler so it can later be removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

mod sealed {
    pub trait Sealed {}
}

/// A kind of event published by the client.
///
/// This trait is sealed; the kinds are [`Opening`], [`Open`], [`Message`],
/// [`Close`], [`Error`] and [`Failed`].
pub trait EventKind: sealed::Sealed + Send + Sync + 'static {
    /// Data handed to handlers of this kind.
    type Payload: ?Sized;

    /// Stable name used in logs.
    const NAME: &'static str;

    #[doc(hidden)]
    fn handlers(bus: &EventBus) -> &HandlerList<Self::Payload>;
}

macro_rules! event_kinds {
    ($($(#[$docs:meta])* $kind:ident => $field:ident: $payload:ty, $name:literal;)*) => {
        $(
            $(#[$docs])*
            #[derive(Clone, Copy, Debug)]
            pub struct $kind;

            impl sealed::Sealed for $kind {}

            impl EventKind for $kind {
                type Payload = $payload;
                const NAME: &'static str = $name;

                fn handlers(bus: &EventBus) -> &HandlerList<$payload> { &bus.inner.$field }
            }
        )*

        struct Registry {
            next_id: AtomicU64,
            $($field: HandlerList<$payload>,)*
        }

        impl Default for Registry {
            fn default() -> Self {
                Self {
                    next_id: AtomicU64::new(1),
                    $($field: HandlerList::new(),)*
                }
            }
        }
    };
}

event_kinds! {
    /// The first transport attempt of a session is starting. Carries the
    /// target address. Silent retries do not repeat it.
    Opening => opening: str, "opening";
    /// The transport opened.
    Open => open: (), "open";
    /// Data arrived from the server.
    Message => message: Payload, "message";
    /// The transport closed, abnormally or at the caller's request.
    Close => close: CloseReason, "close";
    /// A non-fatal failure, such as sending while the link is down.
    Error => error: ClientError, "error";
    /// Reconnection attempts are exhausted; the connection is terminal until
    /// the caller connects again.
    Failed => failed: Failure, "failed";
}

/// Ordered collection of handlers for a single event kind.
pub struct HandlerList<P: ?Sized> {
    entries: Mutex<Vec<(ListenerId, Handler<P>)>>,
}

impl<P: ?Sized> HandlerList<P> {
    fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    // Handlers never run under this lock, so poisoning cannot leave the list
    // half-updated.
    fn lock(&self) -> MutexGuard<'_, Vec<(ListenerId, Handler<P>)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, id: ListenerId, handler: Handler<P>) { self.lock().push((id, handler)); }

    fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        entries.len() != before
    }

    fn get(&self, id: ListenerId) -> Option<Handler<P>> {
        self.lock()
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, handler)| Arc::clone(handler))
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize { self.lock().len() }

    /// Whether no handlers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.lock().is_empty() }

    fn emit(&self, kind: &'static str, payload: &P) {
        let ids: Vec<ListenerId> = self.lock().iter().map(|(id, _)| *id).collect();
        for id in ids {
            // Removed by an earlier handler during this emission.
            let Some(handler) = self.get(id) else {
                continue;
            };
            if let Err(panic) = invoke_isolated(|| handler(payload)) {
                metrics::inc_handler_panics();
                error!(event = kind, panic = %panic, "event handler panicked");
            }
        }
    }
}

/// Registry of event handlers shared between a client handle and its
/// connection task.
///
/// Cloning an `EventBus` yields another handle to the same registry.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, Mutex};
///
/// use tether::events::{EventBus, Message};
///
/// let bus = EventBus::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&seen);
/// let id = bus.on::<Message>(move |payload| {
///     sink.lock().unwrap().push(payload.clone());
/// });
///
/// bus.emit::<Message>(&"hello".into());
/// assert!(bus.off::<Message>(id));
/// bus.emit::<Message>(&"ignored".into());
///
/// assert_eq!(seen.lock().unwrap().len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Registry>,
}

impl EventBus {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Append `handler` to the handlers for `K`.
    pub fn on<K: EventKind>(
        &self,
        handler: impl Fn(&K::Payload) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = self.allocate_id();
        self.insert::<K>(id, Arc::new(handler));
        id
    }

    /// Register `handler` for the next `K` event only.
    ///
    /// The wrapper unregisters itself before running `handler`, and a guard
    /// ensures it can run at most once even if emissions overlap. The
    /// returned id can cancel it before it fires.
    pub fn once<K: EventKind>(
        &self,
        handler: impl FnOnce(&K::Payload) + Send + 'static,
    ) -> ListenerId {
        let id = self.allocate_id();
        let bus = self.downgrade();
        let slot = Mutex::new(Some(handler));
        self.insert::<K>(
            id,
            Arc::new(move |payload: &K::Payload| {
                let Some(handler) = slot.lock().unwrap_or_else(PoisonError::into_inner).take() else {
                    return;
                };
                if let Some(bus) = bus.upgrade() {
                    bus.off::<K>(id);
                }
                handler(payload);
            }),
        );
        id
    }

    /// Remove the handler registered under `id` for `K`.
    ///
    /// Returns `false` if no such handler was registered.
    pub fn off<K: EventKind>(&self, id: ListenerId) -> bool { K::handlers(self).remove(id) }

    /// Invoke every handler registered for `K`, in registration order.
    ///
    /// Handlers removed by an earlier handler during the same emission are
    /// skipped; handlers added during an emission first run on the next one.
    pub fn emit<K: EventKind>(&self, payload: &K::Payload) { K::handlers(self).emit(K::NAME, payload); }

    /// Number of handlers registered for `K`.
    #[must_use]
    pub fn listener_count<K: EventKind>(&self) -> usize { K::handlers(self).len() }

    fn allocate_id(&self) -> ListenerId {
        ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn insert<K: EventKind>(&self, id: ListenerId, handler: Handler<K::Payload>) {
        K::handlers(self).insert(id, handler);
    }

    pub(crate) fn downgrade(&self) -> WeakEventBus { WeakEventBus(Arc::downgrade(&self.inner)) }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("opening", &self.listener_count::<Opening>())
            .field("open", &self.listener_count::<Open>())
            .field("message", &self.listener_count::<Message>())
            .field("close", &self.listener_count::<Close>())
            .field("error", &self.listener_count::<Error>())
            .field("failed", &self.listener_count::<Failed>())
            .finish_non_exhaustive()
    }
}

/// Non-owning reference to an [`EventBus`], held by handlers that need to
/// unregister themselves without keeping the registry alive.
#[derive(Clone)]
pub(crate) struct WeakEventBus(Weak<Registry>);

impl WeakEventBus {
    pub(crate) fn upgrade(&self) -> Option<EventBus> { self.0.upgrade().map(|inner| EventBus { inner }) }
}
