//! Observer registry with scoped subscriptions.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Callback receiving each new counter value.
pub type Observer = Arc<dyn Fn(i64) + Send + Sync>;

/// Identifier of one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Set of observers notified on every tick.
///
/// Delivery never holds the registry lock: [`ObserverRegistry::snapshot`]
/// clones the callbacks out first, so an observer may subscribe or
/// unsubscribe while being notified.
#[derive(Default)]
pub struct ObserverRegistry {
    next_id: AtomicU64,
    entries: Mutex<Vec<(ObserverId, Observer)>>,
}

impl ObserverRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(ObserverId, Observer)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `observer` and return the capability that releases it.
    pub fn subscribe(self: &Arc<Self>, observer: Observer) -> Subscription {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, observer));
        Subscription {
            id,
            registry: Arc::downgrade(self),
            released: false,
        }
    }

    /// Remove a registration. Returns false if it was already gone.
    pub fn remove(&self, id: ObserverId) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Number of current observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nobody is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Clone out the current observers for lock-free delivery.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Observer> {
        self.lock().iter().map(|(_, o)| Observer::clone(o)).collect()
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.len())
            .finish()
    }
}

/// Release capability for one observer registration.
///
/// Dropping it unsubscribes, so hold it for as long as notifications are
/// wanted. Outliving the counter is harmless.
#[must_use = "dropping a Subscription unsubscribes immediately"]
#[derive(Debug)]
pub struct Subscription {
    id: ObserverId,
    registry: Weak<ObserverRegistry>,
    released: bool,
}

impl Subscription {
    /// Identifier of this registration.
    #[must_use]
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Stop receiving notifications.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
