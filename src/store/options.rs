use crate::action::{async_action, sync_action, ActionResult, RawAction};
use crate::error::StoreError;
use crate::state::State;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type StateFactory = Box<dyn FnOnce() -> Result<State, StoreError> + Send>;

static NEXT_STORE_ID: AtomicUsize = AtomicUsize::new(0);

/// Settings that can be loaded from a host's configuration file.
///
/// Unknown keys are ignored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Label used in tracing events. Defaults to `store-<n>`.
    pub name: Option<String>,
    /// Proxy stores only: skip notification when a write stores a value equal
    /// to the current one.
    pub skip_unchanged_writes: bool,
}

/// Everything needed to define a store.
///
/// `C` is the context type actions receive: [`StoreContext`] for plain
/// stores, [`ProxyContext`] for proxy stores.
///
/// [`StoreContext`]: crate::StoreContext
/// [`ProxyContext`]: crate::ProxyContext
pub struct StoreOptions<C> {
    config: StoreConfig,
    state: Option<StateFactory>,
    actions: BTreeMap<String, RawAction<C>>,
}

pub(crate) struct StoreParts<C> {
    pub name: Arc<str>,
    pub initial: State,
    pub actions: BTreeMap<String, RawAction<C>>,
    pub skip_unchanged_writes: bool,
}

impl<C: Send + Sync + 'static> StoreOptions<C> {
    /// Empty options. A state factory must be supplied before defining.
    pub fn new() -> Self {
        Self {
            config: StoreConfig::default(),
            state: None,
            actions: BTreeMap::new(),
        }
    }

    /// The initial-state factory. Called exactly once, when the store is defined.
    pub fn state<F>(mut self, factory: F) -> Self
    where
        F: FnOnce() -> State + Send + 'static,
    {
        self.state = Some(Box::new(move || Ok(factory())));
        self
    }

    /// A typed initial-state factory. The value must serialize to a record.
    pub fn state_from<T, F>(mut self, factory: F) -> Self
    where
        T: Serialize,
        F: FnOnce() -> T + Send + 'static,
    {
        self.state = Some(Box::new(move || State::from_serialize(&factory())));
        self
    }

    /// Register a synchronous action. A later action with the same name
    /// replaces an earlier one.
    pub fn action<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&C, Value) -> ActionResult + Send + Sync + 'static,
    {
        self.actions.insert(name.into(), sync_action(f));
        self
    }

    /// Register an asynchronous action. The future receives its own handle
    /// to the context, so it can keep mutating the store after an await.
    ///
    /// Calls are lazy: the body runs only once the returned
    /// [`ActionOutput`](crate::ActionOutput) is awaited or polled, and not at
    /// all if it is dropped.
    pub fn async_action<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arc<C>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult> + Send + 'static,
    {
        self.actions.insert(name.into(), async_action(f));
        self
    }

    /// Label the store in tracing events.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = Some(name.into());
        self
    }

    /// See [`StoreConfig::skip_unchanged_writes`].
    pub fn skip_unchanged_writes(mut self, skip: bool) -> Self {
        self.config.skip_unchanged_writes = skip;
        self
    }

    /// Apply loaded settings, replacing any set so far.
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolve the options: name the store and run the state factory.
    pub(crate) fn into_parts(self) -> Result<StoreParts<C>, StoreError> {
        let name = match self.config.name {
            Some(name) => name,
            None => format!("store-{}", NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed)),
        };
        let factory = self
            .state
            .ok_or_else(|| StoreError::MissingStateFactory { store: name.clone() })?;

        Ok(StoreParts {
            initial: factory()?,
            name: name.into(),
            actions: self.actions,
            skip_unchanged_writes: self.config.skip_unchanged_writes,
        })
    }
}

impl<C: Send + Sync + 'static> Default for StoreOptions<C> {
    fn default() -> Self {
        Self::new()
    }
}
