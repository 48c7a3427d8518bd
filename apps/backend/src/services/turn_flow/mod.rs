//! Turn processing - the per-turn state machine.
//!
//! One turn moves through claim, validate, decide, apply, persist, release.
//! The lease claim is the sole admission-control point: once it succeeds
//! this worker owns the game until release, and every path out of the turn
//! must still release. The claim commits in its own transaction so the
//! lease is visible to other workers while the agent deliberates.

mod decision_loop;
mod persist;
mod processor;
mod timeout;

pub use processor::{TurnOutcome, TurnRequest};

/// Turn processing service.
///
/// Stateless; everything it needs arrives through [`crate::state::AppState`].
#[derive(Debug, Default)]
pub struct TurnFlowService;

impl TurnFlowService {
    pub fn new() -> Self {
        Self
    }
}
