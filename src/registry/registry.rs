use parking_lot::Mutex;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

type Callback = Box<dyn Fn() + Send + Sync>;

struct Entry {
    id: u64,
    active: AtomicBool,
    callback: Callback,
}

struct RegistryInner {
    next_id: u64,
    entries: Vec<Arc<Entry>>,
}

/// The listener set for one store.
///
/// Listeners take no arguments: when notified they re-read whatever snapshot
/// they care about. Delivery is synchronous and in registration order.
#[derive(Clone)]
pub struct NotificationRegistry {
    inner: Arc<Mutex<RegistryInner>>,
    name: Arc<str>,
}

impl NotificationRegistry {
    /// Create an empty registry. `name` labels tracing events.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryInner {
                next_id: 0,
                entries: Vec::new(),
            })),
            name: name.into(),
        }
    }

    /// Register a listener.
    ///
    /// The returned handle removes exactly this listener. Dropping the handle
    /// does not unsubscribe; use [`Unsubscribe::into_guard`] for that.
    pub fn add<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;

        let entry = Arc::new(Entry {
            id,
            active: AtomicBool::new(true),
            callback: Box::new(listener),
        });
        inner.entries.push(Arc::clone(&entry));
        tracing::debug!(store = %self.name, listener = id, "listener added");

        Unsubscribe {
            entry,
            registry: Arc::downgrade(&self.inner),
            name: Arc::clone(&self.name),
        }
    }

    /// Invoke every listener registered when the pass begins.
    ///
    /// The listener list is copied before iterating and no lock is held while
    /// callbacks run, so a listener may read or mutate the store, subscribe,
    /// or unsubscribe. Listeners added during the pass wait for the next one;
    /// listeners removed during the pass are skipped.
    ///
    /// A panicking listener is reported and the pass continues.
    pub fn notify(&self) {
        let entries = self.inner.lock().entries.clone();
        tracing::trace!(store = %self.name, listeners = entries.len(), "notify");

        for entry in entries {
            if !entry.active.load(Ordering::Acquire) {
                continue;
            }
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| (entry.callback)())) {
                tracing::error!(
                    store = %self.name,
                    listener = entry.id,
                    panic = %panic_message(&*payload),
                    "listener panicked during notify"
                );
            }
        }
    }

    /// Number of live listeners.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Label used in tracing events.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Capability that removes one listener from its registry.
///
/// Calling [`unsubscribe`](Self::unsubscribe) more than once is a no-op. The
/// handle only holds a weak reference to the registry.
pub struct Unsubscribe {
    entry: Arc<Entry>,
    registry: Weak<Mutex<RegistryInner>>,
    name: Arc<str>,
}

impl Unsubscribe {
    /// Remove the listener. Idempotent.
    pub fn unsubscribe(&self) {
        if !self.entry.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().entries.retain(|e| e.id != self.entry.id);
        }
        tracing::debug!(store = %self.name, listener = self.entry.id, "listener removed");
    }

    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.entry.active.load(Ordering::Acquire)
    }

    /// Turn the handle into a guard that unsubscribes when dropped.
    pub fn into_guard(self) -> Subscription {
        Subscription(self)
    }
}

/// RAII guard for a registered listener.
pub struct Subscription(Unsubscribe);

impl Subscription {
    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.0.is_active()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.0.unsubscribe();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
