//! Rating updates after finished games.
//!
//! Rating is strictly fire-and-log: a failure here must never fail or roll
//! back the game-finish transaction that triggered it, so the trait is only
//! ever called after that transaction has committed.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::ids::GameId;
use crate::domain::results::GameResult;
use crate::entities::games::GameType;

/// Which agent (and owning user) sat behind each player id, as the rating
/// backend needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerAgent {
    pub player_id: i64,
    pub agent_version_id: i64,
    /// `None` for system-controlled fallback agents, which stay unrated.
    pub user_id: Option<i64>,
}

/// Failure reported by a rating backend. Callers log it and move on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingError(pub String);

impl std::fmt::Display for RatingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rating update failed: {}", self.0)
    }
}

impl std::error::Error for RatingError {}

/// Trait for rating backends.
#[async_trait]
pub trait RatingUpdater: Send + Sync {
    async fn update_ratings_after_game(
        &self,
        game_id: &GameId,
        game_type: GameType,
        players: &[PlayerAgent],
        result: &GameResult,
    ) -> Result<(), RatingError>;
}

/// Rating backend that records nothing. The default wiring for playground
/// deployments and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRatingUpdater;

#[async_trait]
impl RatingUpdater for NoopRatingUpdater {
    async fn update_ratings_after_game(
        &self,
        game_id: &GameId,
        game_type: GameType,
        players: &[PlayerAgent],
        _result: &GameResult,
    ) -> Result<(), RatingError> {
        debug!(
            game_id = %game_id,
            game_type = %game_type,
            players = players.len(),
            "skipping rating update"
        );
        Ok(())
    }
}
