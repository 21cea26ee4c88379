//! Plain-discipline stores.
//!
//! State changes by explicit replace, merge or reset calls, each of which
//! swaps the state `Arc` and notifies.

mod options;
mod store;

pub use options::{StoreConfig, StoreOptions};
pub use store::{define_store, Store, StoreContext};
