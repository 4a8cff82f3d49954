/// Resolution event hub
///
/// Observers register a callback (for every address or a single one) and get
/// back a `Subscription`; dropping or calling `unsubscribe` removes them.
/// Stream consumers can take a broadcast receiver instead.
use crate::{metrics, names::{NameResolved, WalletAddress}};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::broadcast;

type Callback = Arc<dyn Fn(&NameResolved) + Send + Sync>;

struct Observer {
    /// `None` observes every address
    address: Option<WalletAddress>,
    callback: Callback,
}

struct EventsInner {
    next_id: AtomicU64,
    observers: Mutex<BTreeMap<u64, Observer>>,
    sender: broadcast::Sender<NameResolved>,
}

impl EventsInner {
    fn observers(&self) -> MutexGuard<'_, BTreeMap<u64, Observer>> {
        // Callbacks run outside the lock, so a poisoned map is still consistent
        self.observers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Fan-out hub for `NameResolved` events
#[derive(Clone)]
pub struct NameEvents {
    inner: Arc<EventsInner>,
}

impl NameEvents {
    /// Create a hub whose stream subscribers buffer up to `capacity` events
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(EventsInner {
                next_id: AtomicU64::new(1),
                observers: Mutex::new(BTreeMap::new()),
                sender,
            }),
        }
    }

    /// Observe every resolution
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&NameResolved) + Send + Sync + 'static,
    {
        self.register(None, Arc::new(callback))
    }

    /// Observe resolutions of a single address (any casing)
    pub fn subscribe_address<F>(&self, address: &str, callback: F) -> Option<Subscription>
    where
        F: Fn(&NameResolved) + Send + Sync + 'static,
    {
        let address = WalletAddress::normalize(address)?;
        Some(self.register(Some(address), Arc::new(callback)))
    }

    fn register(&self, address: Option<WalletAddress>, callback: Callback) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.observers().insert(id, Observer { address, callback });
        Subscription {
            id,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Receiver for stream consumers; slow receivers observe `Lagged`
    pub fn events(&self) -> broadcast::Receiver<NameResolved> {
        self.inner.sender.subscribe()
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers().len()
    }

    /// Deliver an event to every matching observer, in registration order
    pub fn publish(&self, event: NameResolved) {
        let callbacks: Vec<Callback> = self
            .inner
            .observers()
            .values()
            .filter(|o| match &o.address {
                Some(address) => address.as_str() == event.address,
                None => true,
            })
            .map(|o| Arc::clone(&o.callback))
            .collect();

        for callback in callbacks {
            callback(&event);
        }

        // No stream subscribers is fine
        let _ = self.inner.sender.send(event);
        metrics::record_event_published();
    }
}

/// Handle returned by `NameEvents::subscribe*`
pub struct Subscription {
    id: u64,
    hub: Weak<EventsInner>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.observers().remove(&self.id);
        }
    }
}
