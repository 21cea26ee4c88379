//! Counter application: one process-wide store, two unrelated components

use hoist::{define_store, ComponentScope, State, Store};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct CounterState {
    count: i64,
    step: i64,
    history: Vec<i64>,
}

impl CounterState {
    fn new() -> Self {
        Self {
            count: 0,
            step: 1,
            history: vec![0],
        }
    }
}

fn counter() -> &'static Store {
    static COUNTER: OnceLock<Store> = OnceLock::new();
    COUNTER.get_or_init(|| {
        define_store(
            Store::options()
                .name("counter")
                .state_from(CounterState::new)
                .action("increment", |ctx, _| {
                    let mut state: CounterState = ctx.get_state().deserialize()?;
                    state.count += state.step;
                    state.history.push(state.count);
                    ctx.set_state(State::from_serialize(&state)?);
                    Ok(json!(state.count))
                })
                .action("set_step", |ctx, step| {
                    ctx.patch(State::from_iter([("step", step)]));
                    Ok(json!(null))
                }),
        )
        .expect("counter store definition is valid")
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Counter Application ===\n");

    // Two components with no common owner, each with its own re-render trigger
    let display_renders = Arc::new(AtomicUsize::new(0));
    let mut display = ComponentScope::new({
        let renders = display_renders.clone();
        move || {
            renders.fetch_add(1, Ordering::SeqCst);
        }
    });
    let mut history = ComponentScope::new(|| println!("   [history] re-render requested"));

    println!("1. Mounting components");
    let use_counter = counter().hook();
    let (state, actions) = display.render(|scope| use_counter(scope));
    println!("   [display] count = {}", state.get("count").unwrap_or(&json!(0)));
    history.render(|scope| counter().use_store(scope));

    println!("\n2. Incrementing from the display component");
    actions.call("increment", json!(null))?.await_ready()?;
    actions.call("increment", json!(null))?.await_ready()?;

    println!("\n3. Changing the step from outside any component");
    counter().patch(State::from_iter([("step", 5)]));
    actions.call("increment", json!(null))?.await_ready()?;

    println!("\n4. Re-rendering");
    let (state, _) = display.render(|scope| use_counter(scope));
    let (snapshot, _) = history.render(|scope| counter().use_store(scope));
    let typed: CounterState = snapshot.deserialize()?;
    println!("   [display] count = {}", state.get("count").unwrap_or(&json!(0)));
    println!("   [history] {:?}", typed.history);
    println!(
        "   display re-render requests: {}",
        display_renders.load(Ordering::SeqCst)
    );

    println!("\n5. Resetting");
    counter().reset();
    let (state, _) = display.render(|scope| use_counter(scope));
    println!("   [display] count = {}", state.get("count").unwrap_or(&json!(0)));

    println!("\n6. Unmounting");
    display.unmount();
    drop(history);
    println!("   listeners left: {}", counter().listener_count());

    println!("\n✓ Example complete!");
    Ok(())
}

trait AwaitReady {
    fn await_ready(self) -> anyhow::Result<serde_json::Value>;
}

impl AwaitReady for hoist::ActionOutput {
    fn await_ready(self) -> anyhow::Result<serde_json::Value> {
        futures::executor::block_on(std::future::IntoFuture::into_future(self))
    }
}
