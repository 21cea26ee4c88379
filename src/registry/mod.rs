//! Listener registration and notification.
//!
//! Every store owns one [`NotificationRegistry`]. Mutations call
//! [`NotificationRegistry::notify`]; subscribers hold an [`Unsubscribe`]
//! handle or a [`Subscription`] guard.

mod registry;

pub use registry::{NotificationRegistry, Subscription, Unsubscribe};
