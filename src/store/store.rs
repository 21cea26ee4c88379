use crate::action::Actions;
use crate::bridge::{self, ComponentScope, ExternalStore};
use crate::error::StoreError;
use crate::registry::{NotificationRegistry, Unsubscribe};
use crate::state::{Snapshot, State};
use crate::store::StoreOptions;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

struct Container {
    current: RwLock<Snapshot>,
    initial: Arc<State>,
    registry: NotificationRegistry,
}

impl Container {
    /// Install a new state record and notify.
    fn replace(&self, next: State) {
        *self.current.write() = Arc::new(next);
        self.registry.notify();
    }
}

/// The context plain-store actions run with.
///
/// Every mutation installs a fresh `Arc<State>` and then notifies once, so
/// snapshots handed out earlier never change underneath their holders.
pub struct StoreContext {
    container: Arc<Container>,
}

impl StoreContext {
    /// The live state.
    pub fn get_state(&self) -> Snapshot {
        Arc::clone(&self.container.current.read())
    }

    /// Replace the state wholesale, then notify. The record is not validated.
    pub fn set_state(&self, next: State) {
        self.container.replace(next);
    }

    /// Shallow-merge `partial` into the state, then notify.
    pub fn patch(&self, partial: State) {
        {
            let mut current = self.container.current.write();
            *current = Arc::new(current.merged(partial));
        }
        self.container.registry.notify();
    }

    /// [`patch`](Self::patch) with any value that serializes to a record.
    pub fn patch_with<T: Serialize + ?Sized>(&self, partial: &T) -> Result<(), StoreError> {
        self.patch(State::from_serialize(partial)?);
        Ok(())
    }

    /// Restore a fresh copy of the initial state, then notify.
    pub fn reset(&self) {
        tracing::debug!(store = %self.container.registry.name(), "reset");
        self.container.replace(State::clone(&self.container.initial));
    }

    /// Notify listeners without mutating.
    pub fn notify(&self) {
        self.container.registry.notify();
    }
}

/// A plain-discipline store.
///
/// Handles are cheap to clone and share one container; a `static` holding a
/// `Store` is the usual way to make it process-wide.
///
/// # Examples
///
/// ```
/// use hoist::{define_store, State, Store};
/// use serde_json::json;
///
/// let counter = define_store(
///     Store::options()
///         .state(|| State::try_from(json!({ "count": 0 })).unwrap())
///         .action("increment", |ctx, _| {
///             let count = ctx.get_state().get_as::<i64>("count")?.unwrap_or(0);
///             ctx.patch(State::try_from(json!({ "count": count + 1 }))?);
///             Ok(json!(count + 1))
///         }),
/// )
/// .unwrap();
///
/// let output = counter.actions().call("increment", json!(null)).unwrap();
/// assert_eq!(output.into_ready().unwrap().unwrap(), json!(1));
/// assert_eq!(counter.get_state().get("count"), Some(&json!(1)));
///
/// counter.reset();
/// assert_eq!(counter.get_state().get("count"), Some(&json!(0)));
/// ```
#[derive(Clone)]
pub struct Store {
    actions: Arc<Actions<StoreContext>>,
}

impl Store {
    /// Options for a plain store, with the action context type fixed.
    pub fn options() -> StoreOptions<StoreContext> {
        StoreOptions::new()
    }

    /// Define a store: run the state factory once and bind the actions.
    pub fn define(options: StoreOptions<StoreContext>) -> Result<Self, StoreError> {
        let parts = options.into_parts()?;
        let initial = Arc::new(parts.initial);

        let container = Arc::new(Container {
            current: RwLock::new(Arc::new(State::clone(&initial))),
            initial,
            registry: NotificationRegistry::new(Arc::clone(&parts.name)),
        });
        let context = Arc::new(StoreContext { container });

        tracing::debug!(
            store = %parts.name,
            actions = parts.actions.len(),
            "store defined"
        );

        Ok(Self {
            actions: Arc::new(Actions::bind(context, parts.actions, parts.name)),
        })
    }

    fn context(&self) -> &StoreContext {
        self.actions.context()
    }

    /// The live state.
    pub fn get_state(&self) -> Snapshot {
        self.context().get_state()
    }

    /// Replace the state wholesale, then notify.
    pub fn set_state(&self, next: State) {
        self.context().set_state(next);
    }

    /// Shallow-merge `partial` into the state, then notify.
    pub fn patch(&self, partial: State) {
        self.context().patch(partial);
    }

    /// [`patch`](Self::patch) with any value that serializes to a record.
    pub fn patch_with<T: Serialize + ?Sized>(&self, partial: &T) -> Result<(), StoreError> {
        self.context().patch_with(partial)
    }

    /// Restore a fresh copy of the initial state, then notify.
    pub fn reset(&self) {
        self.context().reset();
    }

    /// The bound actions. The same allocation is returned every time.
    pub fn actions(&self) -> Arc<Actions<StoreContext>> {
        Arc::clone(&self.actions)
    }

    /// Subscribe a listener outside of any component.
    pub fn subscribe<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.context().container.registry.add(listener)
    }

    /// Number of live listeners, components included.
    pub fn listener_count(&self) -> usize {
        self.context().container.registry.len()
    }

    /// Label used in tracing events.
    pub fn name(&self) -> &str {
        self.context().container.registry.name()
    }

    /// Bind this store to a component: returns the current snapshot and the
    /// actions, and keeps the component subscribed until it unmounts.
    pub fn use_store(&self, scope: &mut ComponentScope) -> (Snapshot, Arc<Actions<StoreContext>>) {
        bridge::use_store(self, scope)
    }

    /// The store as a callable hook, equivalent to [`use_store`](Self::use_store).
    pub fn hook(
        &self,
    ) -> impl Fn(&mut ComponentScope) -> (Snapshot, Arc<Actions<StoreContext>>) + Clone + Send + Sync + 'static
    {
        let store = self.clone();
        move |scope| bridge::use_store(&store, scope)
    }
}

impl ExternalStore for Store {
    type Context = StoreContext;

    fn subscribe<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn() + Send + Sync + 'static,
    {
        Store::subscribe(self, listener)
    }

    fn snapshot(&self) -> Snapshot {
        self.get_state()
    }

    fn actions(&self) -> Arc<Actions<StoreContext>> {
        Store::actions(self)
    }

    fn origin(&self) -> usize {
        Arc::as_ptr(&self.actions) as usize
    }

    fn name(&self) -> &str {
        Store::name(self)
    }
}

/// Define a plain-discipline store. See [`Store`].
pub fn define_store(options: StoreOptions<StoreContext>) -> Result<Store, StoreError> {
    Store::define(options)
}
