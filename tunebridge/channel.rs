use crate::error::App;
use crate::message::Outbound;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;

pub type Handler = Arc<dyn Fn(&Value) -> Result<(), App> + Send + Sync>;

struct Listeners {
    by_name: Mutex<HashMap<String, Vec<(u64, Handler)>>>,
    next_id: AtomicU64,
}

impl Listeners {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<(u64, Handler)>>> {
        self.by_name.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Host-to-client message path. Inbound messages are fanned out to named
/// listeners; outbound messages are queued for the transport.
#[derive(Clone)]
pub struct Channel {
    listeners: Arc<Listeners>,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl Channel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (outbound, receiver) = mpsc::unbounded_channel();
        let channel = Self {
            listeners: Arc::new(Listeners {
                by_name: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
            }),
            outbound,
        };
        (channel, receiver)
    }

    /// Registers `handler` for `name`. The listener lives as long as the
    /// returned subscription.
    #[must_use = "dropping the subscription unregisters the listener"]
    pub fn on<F>(&self, name: &str, handler: F) -> Subscription
    where
        F: Fn(&Value) -> Result<(), App> + Send + Sync + 'static,
    {
        let id = self.listeners.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .entry(name.to_string())
            .or_default()
            .push((id, Arc::new(handler)));
        Subscription {
            listeners: Arc::downgrade(&self.listeners),
            name: name.to_string(),
            id,
        }
    }

    /// Delivers an inbound message to every listener registered for `name`
    /// and returns how many ran.
    pub fn emit(&self, name: &str, payload: &Value) -> Result<usize, App> {
        let handlers: Vec<Handler> = self
            .listeners
            .lock()
            .get(name)
            .map(|entries| entries.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        for handler in &handlers {
            handler(payload)?;
        }
        Ok(handlers.len())
    }

    pub fn send(&self, message: Outbound) -> Result<(), App> {
        self.outbound.send(message)?;
        Ok(())
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners.lock().get(name).map_or(0, Vec::len)
    }
}

/// Disposer for a single listener.
pub struct Subscription {
    listeners: Weak<Listeners>,
    name: String,
    id: u64,
}

impl Subscription {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(listeners) = self.listeners.upgrade() else {
            return;
        };
        let mut by_name = listeners.lock();
        if let Some(entries) = by_name.get_mut(&self.name) {
            entries.retain(|(id, _)| *id != self.id);
            if entries.is_empty() {
                by_name.remove(&self.name);
            }
        }
    }
}
