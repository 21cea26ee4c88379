use crate::bridge::binding::Binding;
use std::sync::Arc;

/// Callback that asks the host to re-render a component.
pub type RenderTrigger = Arc<dyn Fn() + Send + Sync>;

/// The mounted lifetime of one component instance.
///
/// This is the host-framework side of the bridge: it owns the component's
/// store bindings, positionally, in the order the component uses them during
/// a render. Bindings stay subscribed until the scope unmounts or is dropped.
///
/// Outside [`render`](Self::render) there is no hook order to follow, so a
/// store used directly on the scope reuses whichever binding it already has.
///
/// # Examples
///
/// ```
/// use hoist::{define_store, ComponentScope, State, StoreOptions};
/// use serde_json::json;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let store = define_store(
///     StoreOptions::new().state(|| State::try_from(json!({ "count": 0 })).unwrap()),
/// )
/// .unwrap();
///
/// let renders = Arc::new(AtomicUsize::new(0));
/// let renders_clone = renders.clone();
/// let mut scope = ComponentScope::new(move || {
///     renders_clone.fetch_add(1, Ordering::SeqCst);
/// });
///
/// let (snapshot, _actions) = scope.render(|scope| store.use_store(scope));
/// assert_eq!(snapshot.get("count"), Some(&json!(0)));
///
/// store.patch(State::try_from(json!({ "count": 1 })).unwrap());
/// assert_eq!(renders.load(Ordering::SeqCst), 1);
///
/// scope.unmount();
/// assert_eq!(store.listener_count(), 0);
/// ```
pub struct ComponentScope {
    bindings: Vec<Binding>,
    cursor: usize,
    rerender: RenderTrigger,
    mounted: bool,
    in_render: bool,
}

impl ComponentScope {
    /// Create an unmounted scope. `rerender` is called whenever a bound store
    /// notifies.
    pub fn new<F>(rerender: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            bindings: Vec::new(),
            cursor: 0,
            rerender: Arc::new(rerender),
            mounted: false,
            in_render: false,
        }
    }

    /// Run one render pass of the component.
    ///
    /// The first pass mounts the scope. Bindings the pass did not reach are
    /// released when it ends.
    pub fn render<R>(&mut self, f: impl FnOnce(&mut ComponentScope) -> R) -> R {
        if !self.mounted {
            tracing::debug!("component mounted");
            self.mounted = true;
        }
        let outer = std::mem::replace(&mut self.in_render, true);
        self.cursor = 0;
        let result = f(self);
        self.bindings.truncate(self.cursor);
        self.in_render = outer;
        result
    }

    /// Release every binding. A later render mounts the scope again.
    pub fn unmount(&mut self) {
        if !self.mounted && self.bindings.is_empty() {
            return;
        }
        tracing::debug!(bindings = self.bindings.len(), "component unmounted");
        self.bindings.clear();
        self.cursor = 0;
        self.mounted = false;
    }

    /// Whether the scope has rendered since it was created or last unmounted.
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Number of store bindings currently held.
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// The binding at the current hook position, attached fresh if this is the
    /// first use or if the position previously held a different store.
    /// Outside a render pass the binding is looked up by store instead.
    pub(crate) fn binding(
        &mut self,
        origin: usize,
        attach: impl FnOnce(&RenderTrigger) -> Binding,
    ) -> &mut Binding {
        self.mounted = true;
        if !self.in_render {
            let index = match self.bindings.iter().position(|b| b.origin() == origin) {
                Some(index) => index,
                None => {
                    self.bindings.push(attach(&self.rerender));
                    self.bindings.len() - 1
                }
            };
            return &mut self.bindings[index];
        }

        let index = self.cursor;
        self.cursor += 1;

        match self.bindings.get(index).map(|b| b.origin() == origin) {
            Some(true) => {}
            Some(false) => {
                tracing::warn!(slot = index, "hook order changed between renders, rebinding");
                self.bindings[index] = attach(&self.rerender);
            }
            None => self.bindings.push(attach(&self.rerender)),
        }
        &mut self.bindings[index]
    }
}

impl Drop for ComponentScope {
    fn drop(&mut self) {
        self.unmount();
    }
}
