use time::OffsetDateTime;
use tracing::info;

use super::GameLifecycleService;
use crate::db::with_txn;
use crate::domain::events::EventDraft;
use crate::domain::ids::GameId;
use crate::domain::state::GameState;
use crate::engine::{GameEnv, SeatedPlayer};
use crate::entities::games::MatchmakingStatus;
use crate::error::AppError;
use crate::errors::domain::{ConflictKind, DomainError, NotFoundKind, ValidationKind};
use crate::repos::games::{Game, GameUpdate};
use crate::repos::players::GamePlayer;
use crate::repos::{events, games, players};
use crate::state::AppState;

/// Seat everyone and advance into the first round.
///
/// Join order comes from the environment, e.g. randomized colors in Chess.
/// Returns the seating order actually used.
pub(super) fn advance_into_play(
    env: &dyn GameEnv,
    state: &mut GameState,
    seats: &[SeatedPlayer],
) -> Result<Vec<i64>, DomainError> {
    let order = env.order_player_ids_for_start(seats.iter().map(|p| p.player_id).collect());
    for player_id in &order {
        let seat = seats
            .iter()
            .find(|p| p.player_id == *player_id)
            .ok_or_else(|| {
                DomainError::validation(
                    ValidationKind::InvalidInput,
                    format!("Seating order referenced unknown player {player_id}"),
                )
            })?;
        env.join_player(state, seat)?;
    }
    env.new_round(state)?;
    Ok(order)
}

pub(super) fn to_seated(player: &GamePlayer) -> SeatedPlayer {
    SeatedPlayer {
        player_id: player.id,
        agent_version_id: player.agent_version_id,
        display_name: player.display_name.clone(),
        is_system: player.is_system,
    }
}

impl GameLifecycleService {
    /// Move a WAITING game filled by matchmaking into play.
    ///
    /// The enrolled players join a rebuilt state; the waiting-phase state
    /// is disposable by design. Creation events stay where they were
    /// recorded, so only the start is appended here.
    pub async fn start_existing_game(
        &self,
        state: &AppState,
        game_id: &GameId,
    ) -> Result<Game, AppError> {
        let registry = state.registry.clone();
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
                if game.status != MatchmakingStatus::Waiting {
                    return Err(DomainError::conflict(
                        ConflictKind::GameAlreadyStarted,
                        format!("Game {} is {}", game.id, game.status),
                    )
                    .into());
                }

                let env = registry.env(game.game_type)?;
                let rules = registry.rules(game.game_type)?;
                let members = players::find_all_by_game(txn, &game.id).await?;
                let seated: Vec<SeatedPlayer> = members
                    .iter()
                    .filter(|p| p.is_active())
                    .map(to_seated)
                    .collect();
                if seated.len() < rules.min_players {
                    return Err(DomainError::validation(
                        ValidationKind::InvalidInput,
                        format!(
                            "Game {} has {} of {} required players",
                            game.id,
                            seated.len(),
                            rules.min_players
                        ),
                    )
                    .into());
                }

                let (mut play_state, _) = env.new_game(&game.id)?;
                let order = advance_into_play(env.as_ref(), &mut play_state, &seated)?;

                games::ensure_status_transition(game.status, MatchmakingStatus::InProgress)?;
                let updated = games::update_game(
                    txn,
                    GameUpdate::new(game.id.as_str(), game.version)
                        .with_state(play_state.to_value())
                        .with_status(MatchmakingStatus::InProgress)
                        .with_current_turn(play_state.turn)
                        .clear_waiting_deadline()
                        .with_started_at(OffsetDateTime::now_utc()),
                )
                .await?;
                events::append_events(txn, &game.id, &[EventDraft::game_started(&order)])
                    .await?;
                Ok(updated)
            })
        })
        .await?;

        info!(game_id = %game.id, "waiting game started");
        Ok(game)
    }
}
