//! Proxy-discipline stores.
//!
//! The state record is wrapped in a [`StateProxy`]; writing a field through
//! it is the equivalent of property assignment and notifies listeners
//! without an explicit setter call on the store.

mod proxy;
mod store;

pub use proxy::{NestedProxy, StateProxy};
pub use store::{define_proxy_store, ProxyContext, ProxyStore};
