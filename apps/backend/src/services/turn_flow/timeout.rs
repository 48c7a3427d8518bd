use time::OffsetDateTime;
use tracing::info;

use super::decision_loop::TurnResolution;
use super::processor::TurnOutcome;
use super::TurnFlowService;
use crate::db::with_txn;
use crate::domain::ids::GameId;
use crate::domain::results::ForfeitReason;
use crate::engine::GameEnv;
use crate::error::AppError;
use crate::errors::domain::{ConflictKind, DomainError, ValidationKind};
use crate::repos::games::{Game, ProcessingClaim};
use crate::repos::players::GamePlayer;
use crate::repos::{games, players};
use crate::state::AppState;
use crate::trace_ctx;

/// Let the environment settle an expired clock on a scratch copy.
///
/// The environment reports the recording events and must leave the state
/// finished. A timeout is a forfeit unless the environment ruled it a draw
/// (insufficient material), in which case the annotation drops out.
pub(super) fn timeout_resolution(
    env: &dyn GameEnv,
    game: &Game,
    player_id: i64,
) -> Result<TurnResolution, AppError> {
    let mut scratch = game.state.clone();
    let events = env.finalize_timeout(&mut scratch, player_id)?;
    if !scratch.is_finished {
        return Err(AppError::internal(format!(
            "environment left game {} unfinished after timeout finalization",
            game.id
        )));
    }

    let result = env
        .extract_game_result(&scratch)?
        .with_forfeit(ForfeitReason::Timeout);
    result.ensure_consistent()?;

    Ok(TurnResolution {
        state: scratch,
        events,
        result: Some(result),
    })
}

impl TurnFlowService {
    pub(super) async fn settle_timeout(
        &self,
        state: &AppState,
        game: &Game,
        env: &dyn GameEnv,
        seats: &[GamePlayer],
        player_id: i64,
    ) -> Result<TurnOutcome, AppError> {
        info!(game_id = %game.id, player_id, "settling expired clock");
        let resolution = timeout_resolution(env, game, player_id)?;
        self.persist_turn(state, game, env, seats, resolution).await
    }

    /// Finalize a game whose current player ran out the clock.
    ///
    /// Rides the same lease protocol as a turn, without the expected-turn
    /// guard, and double-checks the clock under the lease: time may have
    /// been handed back between the caller's observation and the claim.
    pub async fn finalize_timeout(
        &self,
        state: &AppState,
        request_id: &str,
        game_id: &GameId,
        expected_player_id: i64,
    ) -> Result<TurnOutcome, AppError> {
        trace_ctx::with_trace_id(
            request_id.to_string(),
            self.finalize_timeout_scoped(state, request_id, game_id, expected_player_id),
        )
        .await
    }

    async fn finalize_timeout_scoped(
        &self,
        state: &AppState,
        request_id: &str,
        game_id: &GameId,
        expected_player_id: i64,
    ) -> Result<TurnOutcome, AppError> {
        let limits = state.limits;
        let claim = ProcessingClaim::new(
            game_id.as_str(),
            request_id,
            limits.processing_timeout,
            limits.heartbeat_timeout,
        );

        let game = with_txn(state, |txn| {
            Box::pin(async move { Ok(games::start_processing(txn, claim).await?) })
        })
        .await?;

        info!(game_id = %game_id, request_id, "timeout finalization lease claimed");

        let outcome = self
            .run_claimed_timeout(state, &game, expected_player_id)
            .await;
        self.release(state, game_id, request_id).await;
        outcome
    }

    async fn run_claimed_timeout(
        &self,
        state: &AppState,
        game: &Game,
        expected_player_id: i64,
    ) -> Result<TurnOutcome, AppError> {
        let env = state.registry.env(game.game_type)?;

        if game.state.is_finished || game.status.is_terminal() {
            return Err(DomainError::conflict(
                ConflictKind::AlreadyFinished,
                format!("Game {} is already finished", game.id),
            )
            .into());
        }
        if game.state.current_player_id != Some(expected_player_id) {
            return Err(DomainError::conflict(
                ConflictKind::NotPlayersTurn,
                format!(
                    "Player {expected_player_id} is not to move in game {}",
                    game.id
                ),
            )
            .into());
        }
        if !(env.uses_time_control()
            && env.time_expired(&game.state, OffsetDateTime::now_utc()))
        {
            return Err(DomainError::validation(
                ValidationKind::InvalidInput,
                format!("Game {} still has time remaining", game.id),
            )
            .into());
        }

        let seats = players::find_all_by_game(&state.db, &game.id).await?;
        self.settle_timeout(state, game, env.as_ref(), &seats, expected_player_id)
            .await
    }
}
