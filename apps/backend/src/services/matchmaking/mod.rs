//! Matchmaking over WAITING games.
//!
//! A join picks the fullest open candidate and claims its seat under the
//! game's row lock, so capacity checks never race; the open-game listing
//! is only an advisory ordering. Entry fees are charged after the seat
//! commits and compensated by giving the seat back when the charge fails.

mod join;
mod sweep;

pub use join::{JoinOutcome, JoinRequest, LeaveOutcome};
pub use sweep::SweepAction;

use super::GameLifecycleService;

/// Pools waiting players into shared games and starts them when ready.
#[derive(Debug, Default)]
pub struct MatchmakingService {
    lifecycle: GameLifecycleService,
}

impl MatchmakingService {
    pub fn new() -> Self {
        Self::default()
    }
}
