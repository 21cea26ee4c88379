//! Integration tests for Hoist

use futures::channel::oneshot;
use futures::executor::block_on;
use hoist::{
    define_proxy_store, define_store, ComponentScope, ProxyStore, State, Store, StoreConfig,
    StoreError, StoreOptions,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::future::{Future, IntoFuture};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, OnceLock,
};
use std::task::{Context, Poll};

fn record(value: Value) -> State {
    State::try_from(value).unwrap()
}

fn counting_listener() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
    let counter = Arc::new(AtomicUsize::new(0));
    let counter_clone = counter.clone();
    (counter, move || {
        counter_clone.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn patch_then_reset() {
    let store = define_store(StoreOptions::new().state(|| record(json!({ "count": 0 })))).unwrap();

    store.patch(record(json!({ "count": 1 })));
    assert_eq!(*store.get_state(), record(json!({ "count": 1 })));

    store.reset();
    assert_eq!(*store.get_state(), record(json!({ "count": 0 })));
}

#[test]
fn unsubscribed_listener_is_not_called() {
    let store = define_store(StoreOptions::new().state(|| record(json!({ "count": 0 })))).unwrap();
    let (counter, listener) = counting_listener();

    let handle = store.subscribe(listener);
    store.set_state(record(json!({ "count": 5 })));
    handle.unsubscribe();
    store.set_state(record(json!({ "count": 9 })));

    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn proxy_back_to_back_assignments() {
    let store =
        define_proxy_store(ProxyStore::options().state(|| record(json!({ "name": "n" })))).unwrap();
    let (counter, listener) = counting_listener();
    store.subscribe(listener);

    store.state().set("a", 1);
    store.state().set("b", 2);

    assert!(counter.load(Ordering::SeqCst) >= 2);
    assert_eq!(store.snapshot(), record(json!({ "name": "n", "a": 1, "b": 2 })));
}

#[test]
fn subscribers_observe_same_sequence() {
    let store = define_store(StoreOptions::new().state(|| record(json!({ "count": 0 })))).unwrap();
    let seen: Vec<Arc<Mutex<Vec<Value>>>> = (0..2).map(|_| Arc::default()).collect();

    for log in &seen {
        let log = log.clone();
        let reader = store.clone();
        store.subscribe(move || {
            let count = reader.get_state().get("count").cloned().unwrap_or(Value::Null);
            log.lock().push(count);
        });
    }

    for n in 1..=3 {
        store.patch(record(json!({ "count": n })));
    }
    store.reset();

    let expected = vec![json!(1), json!(2), json!(3), json!(0)];
    assert_eq!(*seen[0].lock(), expected);
    assert_eq!(*seen[1].lock(), expected);
}

fn cart() -> &'static Store {
    static CART: OnceLock<Store> = OnceLock::new();
    CART.get_or_init(|| {
        define_store(
            Store::options()
                .name("cart")
                .state(|| record(json!({ "items": [], "open": false })))
                .action("add", |ctx, item| {
                    let mut items = ctx
                        .get_state()
                        .get_as::<Vec<Value>>("items")?
                        .unwrap_or_default();
                    items.push(item);
                    let len = items.len();
                    ctx.patch(State::from_iter([("items", Value::from(items))]));
                    Ok(json!(len))
                }),
        )
        .unwrap()
    })
}

#[test]
fn process_wide_store_shared_by_unrelated_components() {
    let (header_renders, header_rerender) = counting_listener();
    let (drawer_renders, drawer_rerender) = counting_listener();
    let mut header = ComponentScope::new(header_rerender);
    let mut drawer = ComponentScope::new(drawer_rerender);
    let use_cart = cart().hook();

    let (_, actions) = header.render(|scope| use_cart(scope));
    drawer.render(|scope| cart().use_store(scope));

    // Mutation from inside one component, through the bound actions.
    let len = actions.call("add", json!("apple")).unwrap().into_ready().unwrap().unwrap();
    assert_eq!(len, json!(1));
    // Mutation from outside any component.
    cart().patch(record(json!({ "open": true })));

    assert_eq!(header_renders.load(Ordering::SeqCst), 2);
    assert_eq!(drawer_renders.load(Ordering::SeqCst), 2);

    let (snapshot, again) = drawer.render(|scope| cart().use_store(scope));
    assert_eq!(snapshot.get("items"), Some(&json!(["apple"])));
    assert_eq!(snapshot.get("open"), Some(&json!(true)));
    assert!(Arc::ptr_eq(&actions, &again));

    drop(header);
    drawer.unmount();
    assert_eq!(cart().listener_count(), 0);
}

#[test]
fn async_action_mutates_after_resuming() {
    let (tx, rx) = oneshot::channel::<i64>();
    let gate = Arc::new(Mutex::new(Some(rx)));

    let store = define_store(
        Store::options()
            .state(|| record(json!({ "count": 0, "loading": false })))
            .async_action("load", move |ctx, _| {
                let rx = gate.lock().take();
                async move {
                    ctx.patch(State::from_iter([("loading", true)]));
                    let value = rx.ok_or_else(|| anyhow::anyhow!("already loaded"))?.await?;
                    ctx.patch(State::from_iter([
                        ("count", Value::from(value)),
                        ("loading", Value::from(false)),
                    ]));
                    Ok::<_, anyhow::Error>(json!(value))
                }
            }),
    )
    .unwrap();
    let (notified, listener) = counting_listener();
    store.subscribe(listener);

    let mut fut = store.actions().call("load", Value::Null).unwrap().into_future();
    assert_eq!(notified.load(Ordering::SeqCst), 0);

    let mut cx = Context::from_waker(futures::task::noop_waker_ref());
    assert!(matches!(fut.as_mut().poll(&mut cx), Poll::Pending));
    assert_eq!(notified.load(Ordering::SeqCst), 1);
    assert_eq!(store.get_state().get("loading"), Some(&json!(true)));

    // Another actor resets while the action is suspended; the action still
    // applies its write when it resumes.
    store.reset();
    assert_eq!(notified.load(Ordering::SeqCst), 2);

    tx.send(7).unwrap();
    assert_eq!(block_on(fut).unwrap(), json!(7));
    assert_eq!(notified.load(Ordering::SeqCst), 3);
    assert_eq!(*store.get_state(), record(json!({ "count": 7, "loading": false })));
}

#[test]
fn async_action_error_propagates() {
    let store = define_proxy_store(
        ProxyStore::options()
            .state(State::new)
            .async_action("fetch", |ctx, url| async move {
                ctx.state().set("last_url", url.clone());
                Err::<Value, _>(anyhow::anyhow!("unreachable host: {url}"))
            }),
    )
    .unwrap();

    let err = block_on(store.actions().call("fetch", json!("http://x")).unwrap().into_future())
        .unwrap_err();

    assert_eq!(err.to_string(), "unreachable host: \"http://x\"");
    assert_eq!(store.state().get("last_url"), Some(json!("http://x")));
}

#[test]
fn unknown_action_is_an_error() {
    let store = define_store(StoreOptions::new().state(State::new)).unwrap();
    assert!(matches!(
        store.actions().call("nope", Value::Null),
        Err(StoreError::UnknownAction(_))
    ));
}

#[test]
fn missing_state_factory_fails_fast() {
    let result = define_proxy_store(ProxyStore::options().name("broken"));
    assert!(matches!(
        result.err(),
        Some(StoreError::MissingStateFactory { store }) if store == "broken"
    ));
}

#[test]
fn panicking_listener_is_isolated() {
    let store = define_store(StoreOptions::new().state(State::new)).unwrap();
    let (counter, listener) = counting_listener();

    store.subscribe(|| panic!("render failed"));
    store.subscribe(listener);
    store.patch(record(json!({ "x": 1 })));
    store.patch(record(json!({ "x": 2 })));

    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(store.get_state().get("x"), Some(&json!(2)));
}

#[test]
fn proxy_update_may_read_the_store() {
    let store = define_proxy_store(
        ProxyStore::options().state(|| record(json!({ "a": 1, "b": 41 }))),
    )
    .unwrap();
    let (counter, listener) = counting_listener();
    store.subscribe(listener);

    store
        .state()
        .update("a", |_| json!(store.state().get_as::<i64>("b").unwrap().unwrap() + 1));

    assert_eq!(store.state().get("a"), Some(json!(42)));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn empty_patch_notifies_in_both_disciplines() {
    let plain = define_store(StoreOptions::new().state(|| record(json!({ "x": 1 })))).unwrap();
    let proxy =
        define_proxy_store(ProxyStore::options().state(|| record(json!({ "x": 1 })))).unwrap();
    let (plain_calls, plain_listener) = counting_listener();
    let (proxy_calls, proxy_listener) = counting_listener();
    plain.subscribe(plain_listener);
    proxy.subscribe(proxy_listener);

    plain.patch(State::new());
    proxy.patch(State::new());

    assert_eq!(plain_calls.load(Ordering::SeqCst), 1);
    assert_eq!(proxy_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn use_store_outside_render_keeps_one_listener() {
    let store = define_store(StoreOptions::new().state(|| record(json!({ "count": 0 })))).unwrap();
    let mut scope = ComponentScope::new(|| {});

    for _ in 0..3 {
        store.use_store(&mut scope);
    }
    assert_eq!(store.listener_count(), 1);
    assert_eq!(scope.binding_count(), 1);

    scope.render(|scope| store.use_store(scope));
    assert_eq!(store.listener_count(), 1);
}

#[test]
fn listener_may_mutate_during_notify() {
    let store = define_store(StoreOptions::new().state(|| record(json!({ "count": 0 })))).unwrap();
    {
        let clamp = store.clone();
        store.subscribe(move || {
            let count = clamp.get_state().get_as::<i64>("count").unwrap().unwrap_or(0);
            if count > 10 {
                clamp.patch(record(json!({ "count": 10 })));
            }
        });
    }

    store.patch(record(json!({ "count": 50 })));
    assert_eq!(store.get_state().get("count"), Some(&json!(10)));
}

#[test]
fn config_loaded_from_json() {
    let config: StoreConfig =
        serde_json::from_str(r#"{ "name": "prefs", "skip_unchanged_writes": true, "ttl": 30 }"#)
            .unwrap();
    let store = define_proxy_store(
        ProxyStore::options()
            .state(|| record(json!({ "theme": "light" })))
            .config(config),
    )
    .unwrap();
    let (counter, listener) = counting_listener();
    store.subscribe(listener);

    store.state().set("theme", "light");
    store.state().set("theme", "dark");

    assert_eq!(store.name(), "prefs");
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn typed_state_round_trip() {
    #[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
    struct Prefs {
        theme: String,
        font_size: u8,
    }

    let store = define_store(StoreOptions::new().state_from(|| Prefs {
        theme: "light".to_string(),
        font_size: 12,
    }))
    .unwrap();

    store.patch_with(&json!({ "font_size": 14 })).unwrap();

    assert_eq!(
        store.get_state().deserialize::<Prefs>().unwrap(),
        Prefs {
            theme: "light".to_string(),
            font_size: 14,
        }
    );
}
