use crate::action::Actions;
use crate::bridge::scope::{ComponentScope, RenderTrigger};
use crate::registry::{Subscription, Unsubscribe};
use crate::state::Snapshot;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What the bridge needs from a store.
pub trait ExternalStore {
    /// Context type of the store's actions.
    type Context: Send + Sync + 'static;

    fn subscribe<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn() + Send + Sync + 'static;

    /// The state as of now.
    fn snapshot(&self) -> Snapshot;

    /// The bound actions; must be the same allocation on every call.
    fn actions(&self) -> Arc<Actions<Self::Context>>;

    /// Identity of the underlying store, shared by all of its handles.
    fn origin(&self) -> usize;

    fn name(&self) -> &str;
}

/// One component's subscription to one store.
///
/// The listener only marks the binding stale and asks the host to re-render;
/// the snapshot is re-read on the next render. Change detection is therefore
/// driven by notifications and works the same for stores whose state identity
/// never changes.
pub(crate) struct Binding {
    origin: usize,
    snapshot: Snapshot,
    stale: Arc<AtomicBool>,
    _subscription: Subscription,
}

impl Binding {
    fn attach<S: ExternalStore + ?Sized>(store: &S, rerender: &RenderTrigger) -> Self {
        let stale = Arc::new(AtomicBool::new(false));
        let subscription = {
            let stale = Arc::clone(&stale);
            let rerender = Arc::clone(rerender);
            store
                .subscribe(move || {
                    stale.store(true, Ordering::Release);
                    rerender();
                })
                .into_guard()
        };
        tracing::debug!(store = %store.name(), "component subscribed");

        // Read after subscribing so a mutation in between is not lost.
        Self {
            origin: store.origin(),
            snapshot: store.snapshot(),
            stale,
            _subscription: subscription,
        }
    }

    pub(crate) fn origin(&self) -> usize {
        self.origin
    }

    fn read<S: ExternalStore + ?Sized>(&mut self, store: &S) -> Snapshot {
        if self.stale.swap(false, Ordering::AcqRel) {
            self.snapshot = store.snapshot();
        }
        Arc::clone(&self.snapshot)
    }
}

/// Subscribe the component in `scope` to `store` and return its current
/// snapshot together with the store's actions.
///
/// The first call in a scope registers exactly one listener; later renders
/// reuse it. Unmounting the scope unsubscribes.
pub fn use_store<S>(store: &S, scope: &mut ComponentScope) -> (Snapshot, Arc<Actions<S::Context>>)
where
    S: ExternalStore + ?Sized,
{
    let binding = scope.binding(store.origin(), |rerender| Binding::attach(store, rerender));
    (binding.read(store), store.actions())
}
