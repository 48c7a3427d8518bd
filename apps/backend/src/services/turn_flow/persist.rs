use time::OffsetDateTime;
use tracing::{info, warn};

use super::decision_loop::TurnResolution;
use super::processor::TurnOutcome;
use super::TurnFlowService;
use crate::db::with_txn;
use crate::domain::results::GameResult;
use crate::engine::GameEnv;
use crate::entities::games::MatchmakingStatus;
use crate::error::AppError;
use crate::repos::games::{Game, GameUpdate};
use crate::repos::players::GamePlayer;
use crate::repos::{events, games, players};
use crate::scoring::PlayerAgent;
use crate::state::AppState;

impl TurnFlowService {
    /// Commit a resolved turn: the versioned game update, the event batch,
    /// and on a finish the leave times, all in one transaction. Ratings run
    /// after the commit and never fail the turn.
    pub(super) async fn persist_turn(
        &self,
        state: &AppState,
        game: &Game,
        env: &dyn GameEnv,
        seats: &[GamePlayer],
        resolution: TurnResolution,
    ) -> Result<TurnOutcome, AppError> {
        let TurnResolution {
            state: next_state,
            events: drafts,
            result,
        } = resolution;

        let finished = next_state.is_finished;
        let result = match (finished, result) {
            (true, Some(result)) => Some(result),
            (true, None) => {
                let result = env.extract_game_result(&next_state)?;
                result.ensure_consistent()?;
                Some(result)
            }
            (false, _) => None,
        };

        let now = OffsetDateTime::now_utc();
        let next_turn = next_state.turn;
        let mut update = GameUpdate::new(game.id.as_str(), game.version)
            .with_state(next_state.to_value())
            .with_current_turn(next_turn);
        if finished {
            games::ensure_status_transition(game.status, MatchmakingStatus::Finished)?;
            update = update
                .with_status(MatchmakingStatus::Finished)
                .with_finished_at(now);
        }

        let leave_ids: Vec<i64> = if finished {
            seats.iter().filter(|p| p.is_active()).map(|p| p.id).collect()
        } else {
            Vec::new()
        };

        let game_id = game.id.clone();
        let version = with_txn(state, |txn| {
            Box::pin(async move {
                let updated = games::update_game(txn, update).await?;
                events::append_events(txn, &game_id, &drafts).await?;
                for player_id in leave_ids {
                    players::mark_left(txn, player_id, now).await?;
                }
                Ok(updated.version)
            })
        })
        .await?;

        match result {
            Some(result) => {
                info!(game_id = %game.id, version, "game finished");
                if !game.is_playground {
                    self.fire_rating_update(state, game, seats, &result).await;
                }
                Ok(TurnOutcome::Finished { result, version })
            }
            None => {
                info!(game_id = %game.id, turn = next_turn, version, "turn persisted");
                Ok(TurnOutcome::Continued {
                    turn: next_turn,
                    version,
                })
            }
        }
    }

    /// Fire-and-log rating update. Runs strictly after the finish commit; a
    /// failure here must never unwind the finished game.
    async fn fire_rating_update(
        &self,
        state: &AppState,
        game: &Game,
        seats: &[GamePlayer],
        result: &GameResult,
    ) {
        let mapping: Vec<PlayerAgent> = seats
            .iter()
            .map(|p| PlayerAgent {
                player_id: p.id,
                agent_version_id: p.agent_version_id,
                user_id: p.user_id,
            })
            .collect();

        if let Err(e) = state
            .ratings
            .update_ratings_after_game(&game.id, game.game_type, &mapping, result)
            .await
        {
            warn!(game_id = %game.id, error = %e, "rating update failed");
        }
    }
}
