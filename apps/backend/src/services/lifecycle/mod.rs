//! Game lifecycle - creation, start, cancellation, departures.
//!
//! Lifecycle mutations run under a row lock rather than the processing
//! lease; a turn in flight loses its version check instead of corrupting
//! state. Every commit that parks a game in a terminal status also flips
//! the state's finished flag in the same transaction.

mod cancel;
mod create;
mod leave;
mod start;

pub(crate) use cancel::cancel_locked;
pub use create::{AgentSeat, StartGameSpec};
pub use leave::PlayerLeftResolution;

/// Game lifecycle service.
#[derive(Debug, Default)]
pub struct GameLifecycleService;

impl GameLifecycleService {
    pub fn new() -> Self {
        Self
    }
}
