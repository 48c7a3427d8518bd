use sea_orm::DatabaseTransaction;
use time::OffsetDateTime;
use tracing::info;

use super::GameLifecycleService;
use crate::db::with_txn;
use crate::domain::events::EventDraft;
use crate::domain::ids::GameId;
use crate::entities::games::MatchmakingStatus;
use crate::error::AppError;
use crate::errors::domain::{DomainError, NotFoundKind};
use crate::repos::games::{Game, GameUpdate};
use crate::repos::{events, games, players};
use crate::state::AppState;

/// Cancel a game already loaded under a row lock.
///
/// The finished flag flips in the same commit as the status so the two
/// never drift. Every active player's leave time is set and the
/// cancellation is recorded.
pub(crate) async fn cancel_locked(
    txn: &DatabaseTransaction,
    game: Game,
    reason: &str,
) -> Result<Game, AppError> {
    games::ensure_status_transition(game.status, MatchmakingStatus::Cancelled)?;

    let now = OffsetDateTime::now_utc();
    let mut final_state = game.state.clone();
    final_state.is_finished = true;

    let updated = games::update_game(
        txn,
        GameUpdate::new(game.id.as_str(), game.version)
            .with_state(final_state.to_value())
            .with_status(MatchmakingStatus::Cancelled)
            .with_finished_at(now),
    )
    .await?;

    let members = players::find_all_by_game(txn, &game.id).await?;
    for member in members.iter().filter(|p| p.is_active()) {
        players::mark_left(txn, member.id, now).await?;
    }
    events::append_events(txn, &game.id, &[EventDraft::game_cancelled(reason)]).await?;
    Ok(updated)
}

impl GameLifecycleService {
    /// Cancel a game on a caller's request.
    ///
    /// Playground games are cancellable by anyone. Regular games require
    /// the caller to hold a seat, except when every seat belongs to a
    /// system agent, which opens cancellation back up.
    pub async fn delete_game(
        &self,
        state: &AppState,
        game_id: &GameId,
        caller_user_id: i64,
    ) -> Result<Game, AppError> {
        let txn_game_id = game_id.clone();
        let game = with_txn(state, |txn| {
            Box::pin(async move {
                let game = games::find_by_id_locked(txn, &txn_game_id)
                    .await?
                    .ok_or_else(|| {
                        DomainError::not_found(
                            NotFoundKind::Game,
                            format!("Game {txn_game_id} not found"),
                        )
                    })?;
                let members = players::find_all_by_game(txn, &game.id).await?;
                let permitted = game.is_playground
                    || members.iter().any(|p| p.user_id == Some(caller_user_id))
                    || members.iter().all(|p| p.user_id.is_none());
                if !permitted {
                    return Err(AppError::forbidden(format!(
                        "User {caller_user_id} may not cancel game {}",
                        game.id
                    )));
                }
                cancel_locked(txn, game, "cancelled by request").await
            })
        })
        .await?;

        info!(game_id = %game.id, caller_user_id, "game cancelled");
        Ok(game)
    }
}
