//! The bridge between stores and rendering components.
//!
//! [`ComponentScope`] stands in for a host framework's component instance;
//! [`use_store`] attaches a store to it. Stores expose the same logic as a
//! `use_store` method and as a callable `hook()`.

mod binding;
mod scope;

pub use binding::{use_store, ExternalStore};
pub use scope::{ComponentScope, RenderTrigger};
