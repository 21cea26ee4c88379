use crate::action::Actions;
use crate::bridge::{self, ComponentScope, ExternalStore};
use crate::error::StoreError;
use crate::proxy::StateProxy;
use crate::registry::{NotificationRegistry, Unsubscribe};
use crate::state::{Snapshot, State};
use crate::store::StoreOptions;
use serde::Serialize;
use std::sync::Arc;

/// The context proxy-store actions run with.
pub struct ProxyContext {
    state: StateProxy,
    initial: Arc<State>,
}

impl ProxyContext {
    /// The live, intercepted state. Writes through it notify.
    pub fn state(&self) -> &StateProxy {
        &self.state
    }

    /// A copy of the state as of now.
    pub fn snapshot(&self) -> State {
        self.state.snapshot()
    }

    /// Shallow-merge `partial` into the live record, then notify once.
    pub fn patch(&self, partial: State) {
        self.state.patch(partial);
    }

    /// [`patch`](Self::patch) with any value that serializes to a record.
    pub fn patch_with<T: Serialize + ?Sized>(&self, partial: &T) -> Result<(), StoreError> {
        self.state.patch(State::from_serialize(partial)?);
        Ok(())
    }

    /// Restore the initial state in place, then notify once.
    pub fn reset(&self) {
        tracing::debug!(store = %self.state.registry().name(), "reset");
        self.state.reset(&self.initial);
    }

    /// Notify listeners without mutating.
    pub fn notify(&self) {
        self.state.registry().notify();
    }
}

/// A proxy-discipline store.
///
/// State is mutated by writing through [`state()`](Self::state); the record
/// keeps one identity for the life of the store.
///
/// # Examples
///
/// ```
/// use hoist::{define_proxy_store, ProxyStore, State};
/// use serde_json::json;
///
/// let session = define_proxy_store(
///     ProxyStore::options()
///         .state(|| State::try_from(json!({ "username": null })).unwrap())
///         .action("login", |ctx, name| {
///             ctx.state().set("username", name);
///             Ok(json!(true))
///         }),
/// )
/// .unwrap();
///
/// let output = session.actions().call("login", json!("ada")).unwrap();
/// assert_eq!(output.into_ready().unwrap().unwrap(), json!(true));
/// assert_eq!(session.state().get("username"), Some(json!("ada")));
///
/// session.state().set("username", "grace");
/// assert_eq!(session.snapshot().get("username"), Some(&json!("grace")));
/// ```
#[derive(Clone)]
pub struct ProxyStore {
    actions: Arc<Actions<ProxyContext>>,
}

impl ProxyStore {
    /// Options for a proxy store, with the action context type fixed.
    pub fn options() -> StoreOptions<ProxyContext> {
        StoreOptions::new()
    }

    /// Define a proxy store: run the state factory once and bind the actions.
    pub fn define(options: StoreOptions<ProxyContext>) -> Result<Self, StoreError> {
        let parts = options.into_parts()?;
        let registry = NotificationRegistry::new(Arc::clone(&parts.name));
        let state = StateProxy::new(parts.initial.clone(), registry, parts.skip_unchanged_writes);
        let context = Arc::new(ProxyContext {
            state,
            initial: Arc::new(parts.initial),
        });

        tracing::debug!(
            store = %parts.name,
            actions = parts.actions.len(),
            skip_unchanged_writes = parts.skip_unchanged_writes,
            "proxy store defined"
        );

        Ok(Self {
            actions: Arc::new(Actions::bind(context, parts.actions, parts.name)),
        })
    }

    fn context(&self) -> &ProxyContext {
        self.actions.context()
    }

    /// The live, intercepted state.
    pub fn state(&self) -> &StateProxy {
        self.context().state()
    }

    /// A copy of the state as of now.
    pub fn snapshot(&self) -> State {
        self.context().snapshot()
    }

    /// Shallow-merge `partial` into the live record, then notify once.
    pub fn patch(&self, partial: State) {
        self.context().patch(partial);
    }

    /// [`patch`](Self::patch) with any value that serializes to a record.
    pub fn patch_with<T: Serialize + ?Sized>(&self, partial: &T) -> Result<(), StoreError> {
        self.context().patch_with(partial)
    }

    /// Restore the initial state in place, then notify once.
    pub fn reset(&self) {
        self.context().reset();
    }

    /// The bound actions. The same allocation is returned every time.
    pub fn actions(&self) -> Arc<Actions<ProxyContext>> {
        Arc::clone(&self.actions)
    }

    /// Subscribe a listener outside of any component.
    pub fn subscribe<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.state().registry().add(listener)
    }

    /// Number of live listeners, components included.
    pub fn listener_count(&self) -> usize {
        self.state().registry().len()
    }

    /// Label used in tracing events.
    pub fn name(&self) -> &str {
        self.state().registry().name()
    }

    /// Bind this store to a component, like [`Store::use_store`](crate::Store::use_store).
    pub fn use_store(&self, scope: &mut ComponentScope) -> (Snapshot, Arc<Actions<ProxyContext>>) {
        bridge::use_store(self, scope)
    }

    /// The store as a callable hook, equivalent to [`use_store`](Self::use_store).
    pub fn hook(
        &self,
    ) -> impl Fn(&mut ComponentScope) -> (Snapshot, Arc<Actions<ProxyContext>>) + Clone + Send + Sync + 'static
    {
        let store = self.clone();
        move |scope| bridge::use_store(&store, scope)
    }
}

impl ExternalStore for ProxyStore {
    type Context = ProxyContext;

    fn subscribe<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn() + Send + Sync + 'static,
    {
        ProxyStore::subscribe(self, listener)
    }

    /// The record's identity never changes, so each snapshot is a copy.
    fn snapshot(&self) -> Snapshot {
        Arc::new(ProxyStore::snapshot(self))
    }

    fn actions(&self) -> Arc<Actions<ProxyContext>> {
        ProxyStore::actions(self)
    }

    fn origin(&self) -> usize {
        Arc::as_ptr(&self.actions) as usize
    }

    fn name(&self) -> &str {
        ProxyStore::name(self)
    }
}

/// Define a proxy-discipline store. See [`ProxyStore`].
pub fn define_proxy_store(options: StoreOptions<ProxyContext>) -> Result<ProxyStore, StoreError> {
    ProxyStore::define(options)
}
