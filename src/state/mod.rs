//! State records shared by both store disciplines.

mod state;

pub use state::State;

/// The state as observed by one read or render.
///
/// Snapshots are immutable: a later mutation produces a new snapshot rather
/// than changing one already handed out.
pub type Snapshot = std::sync::Arc<State>;
