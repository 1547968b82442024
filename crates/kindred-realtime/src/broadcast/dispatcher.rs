//! Event dispatcher
//!
//! Routes every [`ServerEvent`] to the handlers registered for its [`EventKind`].

use kindred_core::{EventKind, ServerEvent};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Handler callback. Returning an error only affects that handler.
pub type EventHandler = Arc<dyn Fn(&ServerEvent) -> anyhow::Result<()> + Send + Sync>;

/// Identifies one registered handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl std::fmt::Display for HandlerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of a single dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers that returned `Ok`
    pub delivered: usize,
    /// Handlers that returned an error or panicked
    pub failed: usize,
}

#[derive(Default)]
struct DispatcherInner {
    next_id: AtomicU64,
    handlers: RwLock<HashMap<EventKind, Vec<(HandlerId, EventHandler)>>>,
}

/// Multi-handler pub/sub keyed by event kind.
///
/// Handlers for one kind run in registration order. A failing or panicking handler is
/// logged and skipped; the remaining handlers still run.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    inner: Arc<DispatcherInner>,
}

impl EventDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler.
    ///
    /// Dropping the returned [`Subscription`] keeps the handler registered; call
    /// [`Subscription::unsubscribe`] to remove it.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&ServerEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = HandlerId(self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.inner
            .handlers
            .write()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));

        tracing::trace!(event = %kind, handler = %id, "Handler registered");

        Subscription {
            kind,
            id,
            dispatcher: Arc::downgrade(&self.inner),
        }
    }

    /// Remove a specific handler; returns `false` if it was not registered
    pub fn off(&self, kind: EventKind, id: HandlerId) -> bool {
        remove_handler(&self.inner, kind, id)
    }

    /// Deliver an event to every handler registered for its kind
    pub fn dispatch(&self, event: &ServerEvent) -> DispatchReport {
        let kind = event.kind();
        let handlers: Vec<(HandlerId, EventHandler)> = self
            .inner
            .handlers
            .read()
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        let mut report = DispatchReport::default();
        for (id, handler) in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    tracing::warn!(event = %kind, handler = %id, error = %e, "Event handler failed");
                }
                Err(_) => {
                    report.failed += 1;
                    tracing::error!(event = %kind, handler = %id, "Event handler panicked");
                }
            }
        }
        report
    }

    /// Number of handlers registered for a kind
    #[must_use]
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.inner.handlers.read().get(&kind).map_or(0, Vec::len)
    }

    /// Remove every handler
    pub fn clear(&self) {
        self.inner.handlers.write().clear();
    }
}

fn remove_handler(inner: &DispatcherInner, kind: EventKind, id: HandlerId) -> bool {
    let mut handlers = inner.handlers.write();
    let Some(list) = handlers.get_mut(&kind) else {
        return false;
    };
    let before = list.len();
    list.retain(|(existing, _)| *existing != id);
    let removed = list.len() != before;
    if list.is_empty() {
        handlers.remove(&kind);
    }
    removed
}

/// Handle to one registered handler
#[derive(Debug)]
pub struct Subscription {
    kind: EventKind,
    id: HandlerId,
    dispatcher: Weak<DispatcherInner>,
}

impl Subscription {
    #[must_use]
    pub fn id(&self) -> HandlerId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Remove exactly this handler
    pub fn unsubscribe(self) -> bool {
        self.dispatcher
            .upgrade()
            .is_some_and(|inner| remove_handler(&inner, self.kind, self.id))
    }
}
