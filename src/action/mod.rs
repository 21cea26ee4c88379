//! Action binding.
//!
//! User actions are plain functions that receive the store's context
//! explicitly. They are bound once, when the store is defined.

mod action;

pub use action::{ActionOutput, ActionResult, Actions, BoundAction};
pub(crate) use action::{async_action, sync_action, RawAction};
