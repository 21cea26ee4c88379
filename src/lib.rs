//! # Hoist
//!
//! Shared reactive stores for Rust UIs.
//!
//! A store is defined once, usually in a `static`, and used from any number
//! of independently rendered components. None of them has to own it or sit
//! under a common ancestor. Any caller holding the store may read or mutate
//! it, inside a render or not.
//!
//! ## Two mutation disciplines
//!
//! - [`Store`]: state changes by explicit calls (`set_state`, `patch`,
//!   `reset`). Each call swaps the state `Arc` and notifies once.
//! - [`ProxyStore`]: state changes by writing through a [`StateProxy`], the
//!   Rust rendition of property assignment. Every write notifies.
//!
//! ## Actions
//!
//! Actions are registered on [`StoreOptions`] and receive the store's context
//! explicitly. They may be synchronous or `async`; an async action keeps
//! mutating the store after it resumes.
//!
//! ## Components
//!
//! [`ComponentScope`] models one mounted component. `store.use_store(scope)`
//! (or the equivalent `store.hook()`) subscribes it once, hands back the
//! current snapshot and the actions, and unsubscribes on unmount.

pub mod action;
pub mod bridge;
pub mod error;
pub mod proxy;
pub mod registry;
pub mod state;
pub mod store;

// Re-export main types for convenience
pub use action::{ActionOutput, ActionResult, Actions};
pub use bridge::{use_store, ComponentScope, ExternalStore};
pub use error::StoreError;
pub use proxy::{define_proxy_store, NestedProxy, ProxyContext, ProxyStore, StateProxy};
pub use registry::{NotificationRegistry, Subscription, Unsubscribe};
pub use state::{Snapshot, State};
pub use store::{define_store, Store, StoreConfig, StoreContext, StoreOptions};
