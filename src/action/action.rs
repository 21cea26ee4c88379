use crate::error::StoreError;
use futures::future::{self, BoxFuture, FutureExt};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::sync::Arc;

/// What an action returns: its value, or the error it raised.
pub type ActionResult = anyhow::Result<Value>;

pub(crate) type RawAction<C> = Arc<dyn Fn(&Arc<C>, Value) -> ActionOutput + Send + Sync>;

/// Result of invoking a bound action.
///
/// Synchronous actions produce `Ready`; asynchronous ones produce `Pending`
/// and run only when polled. Dropping a `Pending` output cancels the action
/// before its body starts. Both can be awaited through [`IntoFuture`].
#[must_use = "async actions do nothing unless awaited"]
pub enum ActionOutput {
    Ready(ActionResult),
    Pending(BoxFuture<'static, ActionResult>),
}

impl ActionOutput {
    /// Whether the action still has to be awaited.
    pub fn is_pending(&self) -> bool {
        matches!(self, ActionOutput::Pending(_))
    }

    /// The result of a synchronous action, or `None` if it is still pending.
    pub fn into_ready(self) -> Option<ActionResult> {
        match self {
            ActionOutput::Ready(result) => Some(result),
            ActionOutput::Pending(_) => None,
        }
    }
}

impl IntoFuture for ActionOutput {
    type Output = ActionResult;
    type IntoFuture = BoxFuture<'static, ActionResult>;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            ActionOutput::Ready(result) => future::ready(result).boxed(),
            ActionOutput::Pending(fut) => fut,
        }
    }
}

impl fmt::Debug for ActionOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionOutput::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            ActionOutput::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// Wrap a synchronous user function.
pub(crate) fn sync_action<C, F>(f: F) -> RawAction<C>
where
    C: Send + Sync + 'static,
    F: Fn(&C, Value) -> ActionResult + Send + Sync + 'static,
{
    Arc::new(move |ctx: &Arc<C>, args: Value| ActionOutput::Ready(f(ctx.as_ref(), args)))
}

/// Wrap an asynchronous user function. The future owns its context handle so
/// mutations issued after a suspension still reach the store.
pub(crate) fn async_action<C, F, Fut>(f: F) -> RawAction<C>
where
    C: Send + Sync + 'static,
    F: Fn(Arc<C>, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ActionResult> + Send + 'static,
{
    Arc::new(move |ctx: &Arc<C>, args: Value| {
        ActionOutput::Pending(f(Arc::clone(ctx), args).boxed())
    })
}

/// The bound action table of a store.
///
/// Built once when the store is defined; every invocation shares the same
/// context allocation, whose handles are live rather than snapshots.
pub struct Actions<C> {
    context: Arc<C>,
    table: BTreeMap<String, RawAction<C>>,
    store: Arc<str>,
}

impl<C> Actions<C> {
    pub(crate) fn bind(
        context: Arc<C>,
        table: BTreeMap<String, RawAction<C>>,
        store: Arc<str>,
    ) -> Self {
        Self {
            context,
            table,
            store,
        }
    }

    /// Invoke an action by name, forwarding `args` unchanged.
    pub fn call(&self, name: &str, args: Value) -> Result<ActionOutput, StoreError> {
        let action = self
            .get(name)
            .ok_or_else(|| StoreError::UnknownAction(name.to_string()))?;
        Ok(action.call(args))
    }

    /// Look up a bound action.
    pub fn get(&self, name: &str) -> Option<BoundAction<'_, C>> {
        self.table.get_key_value(name).map(|(name, raw)| BoundAction {
            name,
            raw,
            context: &self.context,
            store: &self.store,
        })
    }

    /// Whether an action named `name` is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Action names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    /// Number of bound actions.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the store defines no actions.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// The context every action runs with.
    pub fn context(&self) -> &Arc<C> {
        &self.context
    }
}

/// A single action, bound to its store's context.
pub struct BoundAction<'a, C> {
    name: &'a str,
    raw: &'a RawAction<C>,
    context: &'a Arc<C>,
    store: &'a str,
}

impl<C> BoundAction<'_, C> {
    /// The name the action was registered under.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Invoke the action with `args`. A `Pending` output must be awaited for
    /// the action to run.
    pub fn call(&self, args: Value) -> ActionOutput {
        tracing::trace!(store = %self.store, action = %self.name, "action invoked");
        (self.raw)(self.context, args)
    }
}
