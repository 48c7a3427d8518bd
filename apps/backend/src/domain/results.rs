use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::domain::{DomainError, InfraErrorKind};

/// Why a game ended by forfeit rather than by play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForfeitReason {
    /// The agent exhausted its decision attempts and no fallback existed.
    FailedToMove,
    /// The agent asked to exit the game.
    Resigned,
    /// The player ran out the clock in a time-controlled game.
    Timeout,
    /// The player left mid-game and was not replaced.
    Abandoned,
}

/// Terminal outcome of a finished game.
///
/// A result is either a win (possibly shared), or a draw. Forfeit is an
/// annotation on a win, never on a draw; `with_forfeit` keeps that rule by
/// construction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GameResult {
    pub winner_ids: Vec<i64>,
    pub draw_reason: Option<String>,
    pub forfeit_reason: Option<ForfeitReason>,
    /// Game-specific score breakdown, opaque to the engine.
    pub final_scores: Option<Value>,
}

impl GameResult {
    pub fn winners(winner_ids: Vec<i64>) -> Self {
        Self {
            winner_ids,
            ..Self::default()
        }
    }

    pub fn draw(reason: impl Into<String>) -> Self {
        Self {
            draw_reason: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn is_draw(&self) -> bool {
        self.draw_reason.is_some()
    }

    /// Single-winner convenience for two-player games.
    pub fn winner_id(&self) -> Option<i64> {
        match self.winner_ids.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// Annotate the result with a forfeit reason. Draws are never forfeits,
    /// so the annotation is dropped on a draw result.
    pub fn with_forfeit(mut self, reason: ForfeitReason) -> Self {
        if self.draw_reason.is_none() {
            self.forfeit_reason = Some(reason);
        }
        self
    }

    /// Validate the exclusivity rules on a result produced by a game
    /// environment. A violation means the environment is buggy, not the
    /// caller.
    pub fn ensure_consistent(&self) -> Result<(), DomainError> {
        if self.draw_reason.is_some() && self.forfeit_reason.is_some() {
            return Err(DomainError::infra(
                InfraErrorKind::Other("InconsistentResult".into()),
                "Game result claims both a draw and a forfeit",
            ));
        }
        if self.draw_reason.is_some() && !self.winner_ids.is_empty() {
            return Err(DomainError::infra(
                InfraErrorKind::Other("InconsistentResult".into()),
                "Game result claims both a draw and winners",
            ));
        }
        Ok(())
    }
}
