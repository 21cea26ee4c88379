use crate::error::StoreError;
use crate::registry::NotificationRegistry;
use crate::state::State;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::convert::Infallible;
use std::sync::Arc;

struct ProxyInner {
    state: RwLock<State>,
    registry: NotificationRegistry,
    skip_unchanged: bool,
}

/// Outcome of one intercepted write.
struct Intercepted<R> {
    output: R,
    changed: bool,
}

/// A state record whose writes are observed.
///
/// Every write (top-level [`set`](Self::set), [`remove`](Self::remove),
/// [`update`](Self::update), writes through a [`NestedProxy`], patches and
/// resets) passes through one interception point that applies the change and
/// then notifies. Reads pass straight through.
///
/// Clones share the same record; the proxy's identity never changes.
#[derive(Clone)]
pub struct StateProxy {
    inner: Arc<ProxyInner>,
}

impl StateProxy {
    pub(crate) fn new(initial: State, registry: NotificationRegistry, skip_unchanged: bool) -> Self {
        Self {
            inner: Arc::new(ProxyInner {
                state: RwLock::new(initial),
                registry,
                skip_unchanged,
            }),
        }
    }

    /// The interception point. `op` runs under the write lock; listeners are
    /// notified after the lock is released, unless `op` reports no change.
    fn intercept<R, E>(
        &self,
        op: impl FnOnce(&mut State) -> Result<Intercepted<R>, E>,
    ) -> Result<R, E> {
        let write = {
            let mut state = self.inner.state.write();
            op(&mut *state)?
        };
        if write.changed {
            self.inner.registry.notify();
        }
        Ok(write.output)
    }

    fn intercept_infallible<R>(&self, op: impl FnOnce(&mut State) -> Intercepted<R>) -> R {
        match self.intercept(|state| Ok::<_, Infallible>(op(state))) {
            Ok(output) => output,
            Err(never) => match never {},
        }
    }

    /// Whether storing `value` over `current` counts as a change.
    fn changes(&self, current: Option<&Value>, value: &Value) -> bool {
        !(self.inner.skip_unchanged && current == Some(value))
    }

    /// Assign a field. Undeclared fields are accepted.
    pub fn set(&self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        self.intercept_infallible(|state| {
            let changed = self.changes(state.get(&field), &value);
            state.insert(field, value);
            Intercepted {
                output: (),
                changed,
            }
        });
    }

    /// Delete a field. Notifies only if the field existed.
    pub fn remove(&self, field: &str) -> Option<Value> {
        self.intercept_infallible(|state| {
            let removed = state.remove(field);
            Intercepted {
                changed: removed.is_some(),
                output: removed,
            }
        })
    }

    /// Read-modify-write a field with one notification.
    ///
    /// `f` receives a copy of the current value and runs with no lock held, so
    /// it may read or write the store itself. Its result is stored last.
    pub fn update<F>(&self, field: &str, f: F)
    where
        F: FnOnce(Option<&Value>) -> Value,
    {
        let current = self.get(field);
        let value = f(current.as_ref());
        self.intercept_infallible(|state| {
            let changed = self.changes(state.get(field), &value);
            state.insert(field, value);
            Intercepted {
                output: (),
                changed,
            }
        });
    }

    /// A view into the sub-object stored at `field`.
    pub fn nested(&self, field: impl Into<String>) -> NestedProxy {
        NestedProxy {
            root: self.clone(),
            path: vec![field.into()],
        }
    }

    /// A copy of one field.
    pub fn get(&self, field: &str) -> Option<Value> {
        self.inner.state.read().get(field).cloned()
    }

    /// Get a field and deserialize it. Returns `Ok(None)` when absent.
    pub fn get_as<T: DeserializeOwned>(&self, field: &str) -> Result<Option<T>, StoreError> {
        self.inner.state.read().get_as(field)
    }

    /// Whether the field is present.
    pub fn contains(&self, field: &str) -> bool {
        self.inner.state.read().contains(field)
    }

    /// Read the record without copying it.
    pub fn with<R>(&self, f: impl FnOnce(&State) -> R) -> R {
        f(&*self.inner.state.read())
    }

    /// A copy of the record as of now.
    pub fn snapshot(&self) -> State {
        self.inner.state.read().clone()
    }

    /// Whether two proxies wrap the same record.
    pub fn ptr_eq(&self, other: &StateProxy) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Merge `partial` in place with a single notification. An empty patch
    /// still notifies unless unchanged writes are skipped.
    pub(crate) fn patch(&self, partial: State) {
        self.intercept_infallible(|state| {
            let changed = !self.inner.skip_unchanged
                || partial
                    .iter()
                    .any(|(field, value)| self.changes(state.get(field), value));
            state.merge(partial);
            Intercepted {
                output: (),
                changed,
            }
        });
    }

    /// Restore the record's contents from `initial` in place, with a single
    /// notification. Fields absent from `initial` are dropped.
    pub(crate) fn reset(&self, initial: &State) {
        self.intercept_infallible(|state| {
            *state = initial.clone();
            Intercepted {
                output: (),
                changed: true,
            }
        });
    }

    pub(crate) fn registry(&self) -> &NotificationRegistry {
        &self.inner.registry
    }
}

/// A write handle on a sub-object of a [`StateProxy`].
///
/// Writes fail with [`StoreError::NotAnObject`] when any parent along the path
/// is missing or is not an object; nothing is written and nobody is notified.
#[derive(Clone)]
pub struct NestedProxy {
    root: StateProxy,
    path: Vec<String>,
}

impl NestedProxy {
    /// A view one level deeper.
    pub fn nested(&self, field: impl Into<String>) -> NestedProxy {
        let mut path = self.path.clone();
        path.push(field.into());
        NestedProxy {
            root: self.root.clone(),
            path,
        }
    }

    /// Assign a field of the sub-object.
    pub fn set(&self, field: impl Into<String>, value: impl Into<Value>) -> Result<(), StoreError> {
        let field = field.into();
        let value = value.into();
        self.root.intercept(|state| {
            let target = resolve_mut(state.fields_mut(), &self.path)?;
            let changed = self.root.changes(target.get(&field), &value);
            target.insert(field, value);
            Ok(Intercepted {
                output: (),
                changed,
            })
        })
    }

    /// Read a field of the sub-object.
    pub fn get(&self, field: &str) -> Option<Value> {
        self.root.with(|state| {
            let mut value = state.get(self.path.first()?)?;
            for key in &self.path[1..] {
                value = value.get(key)?;
            }
            value.get(field).cloned()
        })
    }

    /// Dotted path from the root record.
    pub fn path(&self) -> String {
        self.path.join(".")
    }
}

fn resolve_mut<'a>(
    mut map: &'a mut Map<String, Value>,
    path: &[String],
) -> Result<&'a mut Map<String, Value>, StoreError> {
    for (depth, key) in path.iter().enumerate() {
        map = match map.get_mut(key) {
            Some(Value::Object(child)) => child,
            _ => {
                return Err(StoreError::NotAnObject {
                    path: path[..=depth].join("."),
                })
            }
        };
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn proxy(skip_unchanged: bool) -> (StateProxy, Arc<AtomicUsize>) {
        let registry = NotificationRegistry::new("proxy-test");
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        registry.add(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        let initial = State::try_from(json!({
            "username": "anon",
            "profile": { "theme": "light", "layout": { "columns": 2 } },
        }))
        .unwrap();
        (StateProxy::new(initial, registry, skip_unchanged), calls)
    }

    #[test]
    fn set_writes_and_notifies() {
        let (state, calls) = proxy(false);
        state.set("username", "x");

        assert_eq!(state.get("username"), Some(json!("x")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn undeclared_field_accepted() {
        let (state, calls) = proxy(false);
        state.set("fresh", 1);

        assert!(state.contains("fresh"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn same_value_notifies_by_default() {
        let (state, calls) = proxy(false);
        state.set("username", "anon");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn skip_unchanged_writes() {
        let (state, calls) = proxy(true);
        state.set("username", "anon");
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        state.set("username", "other");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_notifies_only_when_present() {
        let (state, calls) = proxy(false);
        assert_eq!(state.remove("missing"), None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(state.remove("username"), Some(json!("anon")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn update_reads_and_writes_once() {
        let (state, calls) = proxy(false);
        state.update("visits", |v| json!(v.and_then(Value::as_i64).unwrap_or(0) + 1));
        state.update("visits", |v| json!(v.and_then(Value::as_i64).unwrap_or(0) + 1));

        assert_eq!(state.get("visits"), Some(json!(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn update_closure_can_read_the_record() {
        let (state, calls) = proxy(false);
        let reader = state.clone();
        state.update("greeting", |_| {
            let name = reader.get("username").unwrap_or(Value::Null);
            json!(format!("hello {}", name.as_str().unwrap_or("?")))
        });

        assert_eq!(state.get("greeting"), Some(json!("hello anon")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn update_closure_can_write_the_record() {
        let (state, calls) = proxy(false);
        let writer = state.clone();
        state.update("visits", |_| {
            writer.set("last_seen", 1);
            json!(1)
        });

        assert_eq!(state.get("last_seen"), Some(json!(1)));
        assert_eq!(state.get("visits"), Some(json!(1)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn empty_patch_notifies() {
        let (state, calls) = proxy(false);
        state.patch(State::new());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let (state, calls) = proxy(true);
        state.patch(State::new());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn nested_write_notifies() {
        let (state, calls) = proxy(false);
        state.nested("profile").set("theme", "dark").unwrap();
        state
            .nested("profile")
            .nested("layout")
            .set("columns", 3)
            .unwrap();

        assert_eq!(state.nested("profile").get("theme"), Some(json!("dark")));
        assert_eq!(
            state.nested("profile").nested("layout").get("columns"),
            Some(json!(3))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn nested_write_through_non_object_fails() {
        let (state, calls) = proxy(false);

        let err = state.nested("username").set("x", 1).unwrap_err();
        assert!(matches!(err, StoreError::NotAnObject { path } if path == "username"));

        let err = state
            .nested("profile")
            .nested("missing")
            .set("x", 1)
            .unwrap_err();
        assert!(matches!(err, StoreError::NotAnObject { path } if path == "profile.missing"));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn reset_keeps_identity() {
        let (state, calls) = proxy(false);
        let held = state.clone();
        let initial = state.snapshot();

        state.set("username", "x");
        state.set("extra", true);
        state.reset(&initial);

        assert!(held.ptr_eq(&state));
        assert_eq!(held.snapshot(), initial);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
