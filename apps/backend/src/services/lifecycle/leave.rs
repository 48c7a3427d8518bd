use std::collections::HashSet;
use std::sync::Arc;

use sea_orm::DatabaseTransaction;
use time::OffsetDateTime;
use tracing::{info, warn};

use super::GameLifecycleService;
use crate::db::with_txn;
use crate::domain::events::EventDraft;
use crate::domain::ids::GameId;
use crate::domain::results::{ForfeitReason, GameResult};
use crate::engine::{GameRegistry, PlayerLeftOutcome, SeatedPlayer};
use crate::entities::games::{GameType, MatchmakingStatus};
use crate::error::AppError;
use crate::errors::domain::{ConflictKind, DomainError, NotFoundKind, ValidationKind};
use crate::repos::games::GameUpdate;
use crate::repos::players::{GamePlayer, PlayerCreate};
use crate::repos::{events, games, players};
use crate::scoring::PlayerAgent;
use crate::state::AppState;

/// How a mid-game departure was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerLeftResolution {
    /// The game keeps running. `replacement_player_id` is set when a
    /// fallback agent took over the vacated seat.
    Continued { replacement_player_id: Option<i64> },
    /// The remaining players won by forfeit.
    Finished { result: GameResult },
    /// Nobody was left worth playing for.
    Cancelled,
}

/// Everything the rating backend needs, captured inside the transaction so
/// the post-commit call does not re-read the game.
struct FinishNotice {
    game_type: GameType,
    players: Vec<PlayerAgent>,
    result: GameResult,
}

impl GameLifecycleService {
    /// Handle a player leaving an IN_PROGRESS game.
    ///
    /// The environment rules on its seat, but the engine refuses to keep a
    /// game running for nobody, or for system agents playing each other.
    /// Runs under the row lock, so a turn racing this departure loses its
    /// version check instead of writing over the outcome.
    pub async fn handle_player_left(
        &self,
        state: &AppState,
        game_id: &GameId,
        player_id: i64,
    ) -> Result<PlayerLeftResolution, AppError> {
        let (resolution, notice) = with_txn(state, |txn| {
            let registry = Arc::clone(&state.registry);
            let game_id = game_id.clone();
            Box::pin(async move { leave_in_txn(txn, registry, game_id, player_id).await })
        })
        .await?;

        if let Some(notice) = notice {
            if let Err(e) = state
                .ratings
                .update_ratings_after_game(game_id, notice.game_type, &notice.players, &notice.result)
                .await
            {
                warn!(game_id = %game_id, error = %e, "rating update failed");
            }
        }
        Ok(resolution)
    }
}

async fn leave_in_txn(
    txn: &DatabaseTransaction,
    registry: Arc<GameRegistry>,
    game_id: GameId,
    player_id: i64,
) -> Result<(PlayerLeftResolution, Option<FinishNotice>), AppError> {
    let game = games::find_by_id_locked(txn, &game_id).await?.ok_or_else(|| {
        DomainError::not_found(NotFoundKind::Game, format!("Game {game_id} not found"))
    })?;

    if game.status.is_terminal() || game.state.is_finished {
        return Err(DomainError::conflict(
            ConflictKind::AlreadyFinished,
            format!("Game {game_id} is already over"),
        )
        .into());
    }
    if game.status == MatchmakingStatus::Waiting {
        return Err(DomainError::validation(
            ValidationKind::InvalidInput,
            format!("Game {game_id} has not started; leave through matchmaking"),
        )
        .into());
    }

    let env = registry.env(game.game_type)?;
    let members = players::find_all_by_game(txn, &game_id).await?;
    let leaver = members
        .iter()
        .find(|p| p.id == player_id && p.is_active())
        .ok_or_else(|| {
            DomainError::not_found(
                NotFoundKind::Player,
                format!("Player {player_id} is not seated in game {game_id}"),
            )
        })?;

    let mut scratch = game.state.clone();
    let ruling = env.on_player_left(&mut scratch, player_id)?;

    let now = OffsetDateTime::now_utc();
    players::mark_left(txn, leaver.id, now).await?;

    let remaining: Vec<&GamePlayer> = members
        .iter()
        .filter(|p| p.is_active() && p.id != player_id)
        .collect();

    let ruling = if remaining.is_empty() {
        PlayerLeftOutcome::Cancel
    } else if ruling == PlayerLeftOutcome::Continue && remaining.iter().all(|p| p.is_system) {
        PlayerLeftOutcome::Finish
    } else {
        ruling
    };

    match ruling {
        PlayerLeftOutcome::Cancel => {
            games::ensure_status_transition(game.status, MatchmakingStatus::Cancelled)?;
            scratch.is_finished = true;
            games::update_game(
                txn,
                GameUpdate::new(game.id.as_str(), game.version)
                    .with_state(scratch.to_value())
                    .with_status(MatchmakingStatus::Cancelled)
                    .with_finished_at(now),
            )
            .await?;
            for member in &remaining {
                players::mark_left(txn, member.id, now).await?;
            }
            events::append_events(
                txn,
                &game_id,
                &[
                    EventDraft::player_left(player_id),
                    EventDraft::game_cancelled("no players remaining"),
                ],
            )
            .await?;
            info!(game_id = %game_id, player_id, "game cancelled after departure");
            Ok((PlayerLeftResolution::Cancelled, None))
        }
        PlayerLeftOutcome::Finish => {
            let remaining_ids: Vec<i64> = remaining.iter().map(|p| p.id).collect();
            env.finish_due_to_forfeit(&mut scratch, &remaining_ids)?;
            if !scratch.is_finished {
                return Err(AppError::internal(format!(
                    "environment left game {game_id} unfinished after forfeit"
                )));
            }
            let result = env
                .extract_game_result(&scratch)?
                .with_forfeit(ForfeitReason::Abandoned);
            result.ensure_consistent()?;

            games::ensure_status_transition(game.status, MatchmakingStatus::Finished)?;
            games::update_game(
                txn,
                GameUpdate::new(game.id.as_str(), game.version)
                    .with_state(scratch.to_value())
                    .with_status(MatchmakingStatus::Finished)
                    .with_finished_at(now),
            )
            .await?;
            for member in &remaining {
                players::mark_left(txn, member.id, now).await?;
            }
            events::append_events(
                txn,
                &game_id,
                &[
                    EventDraft::player_left(player_id),
                    EventDraft::agent_forfeit(player_id, ForfeitReason::Abandoned),
                    EventDraft::game_finished(&result),
                ],
            )
            .await?;

            let notice = (!game.is_playground).then(|| FinishNotice {
                game_type: game.game_type,
                players: members
                    .iter()
                    .map(|p| PlayerAgent {
                        player_id: p.id,
                        agent_version_id: p.agent_version_id,
                        user_id: p.user_id,
                    })
                    .collect(),
                result: result.clone(),
            });
            info!(game_id = %game_id, player_id, "game finished by abandonment");
            Ok((PlayerLeftResolution::Finished { result }, notice))
        }
        PlayerLeftOutcome::Continue => {
            let rules = registry.rules(game.game_type)?;
            let seated: HashSet<i64> = members.iter().map(|p| p.agent_version_id).collect();
            let mut drafts = vec![EventDraft::player_left(player_id)];

            let replacement_player_id = match rules
                .fallback_agents
                .iter()
                .find(|f| !seated.contains(&f.agent_version_id))
            {
                Some(fallback) => {
                    let seat = players::add_player(
                        txn,
                        PlayerCreate {
                            game_id: game_id.as_str().to_owned(),
                            user_id: None,
                            agent_version_id: fallback.agent_version_id,
                            display_name: fallback.display_name.clone(),
                            is_system: true,
                        },
                    )
                    .await?;
                    env.join_player(
                        &mut scratch,
                        &SeatedPlayer {
                            player_id: seat.id,
                            agent_version_id: seat.agent_version_id,
                            display_name: seat.display_name.clone(),
                            is_system: true,
                        },
                    )?;
                    drafts.push(EventDraft::player_joined(seat.id, &seat.display_name));
                    Some(seat.id)
                }
                None => None,
            };

            games::update_game(
                txn,
                GameUpdate::new(game.id.as_str(), game.version)
                    .with_state(scratch.to_value())
                    .with_current_turn(scratch.turn),
            )
            .await?;
            events::append_events(txn, &game_id, &drafts).await?;
            info!(
                game_id = %game_id,
                player_id,
                replaced = replacement_player_id.is_some(),
                "player left, game continues"
            );
            Ok((
                PlayerLeftResolution::Continued {
                    replacement_player_id,
                },
                None,
            ))
        }
    }
}
