use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use crate::event::{EventKind, ServerEvent};

type Handler = Arc<dyn Fn(&ServerEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: HashMap<u64, (EventKind, Handler)>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Client-side event hub for one live connection. Handlers are added with
/// [`Channel::on`] and stay registered exactly as long as the returned
/// [`Subscription`] lives.
#[derive(Clone, Default)]
pub struct Channel {
    registry: Arc<Mutex<Registry>>,
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Channel")
            .field("handlers", &lock(&self.registry).handlers.len())
            .finish()
    }
}

impl Channel {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "the handler is removed as soon as the subscription is dropped"]
    pub fn on(
        &self,
        kind: EventKind,
        handler: impl Fn(&ServerEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let handler: Handler = Arc::new(handler);
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.handlers.insert(id, (kind, handler));

        Subscription {
            registry: Arc::downgrade(&self.registry),
            id,
        }
    }

    /// Run every handler registered for the event's kind.
    pub fn dispatch(&self, event: &ServerEvent) {
        let kind = event.kind();
        // handlers run unlocked so they may subscribe or unsubscribe
        let handlers: Vec<Handler> = lock(&self.registry)
            .handlers
            .values()
            .filter(|(k, _)| *k == kind)
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        for handler in handlers {
            handler(event);
        }
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        lock(&self.registry)
            .handlers
            .values()
            .filter(|(k, _)| *k == kind)
            .count()
    }
}

/// Registration of one handler. Dropping it removes the handler.
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).handlers.remove(&self.id);
        }
    }
}
