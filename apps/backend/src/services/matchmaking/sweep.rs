use std::collections::HashSet;
use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, warn};

use super::MatchmakingService;
use crate::db::with_txn;
use crate::domain::events::EventDraft;
use crate::domain::ids::GameId;
use crate::entities::games::MatchmakingStatus;
use crate::error::AppError;
use crate::repos::players::PlayerCreate;
use crate::repos::{events, games, players};
use crate::services::lifecycle::cancel_locked;
use crate::state::AppState;

/// What the timeout sweep did to one expired WAITING game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepAction {
    /// The game reached its minimum and was started, with `backfilled`
    /// seats freshly filled by fallback agents.
    Started { game_id: GameId, backfilled: usize },
    /// The game could not be brought up to strength and was cancelled.
    Cancelled { game_id: GameId },
}

/// Phase-one verdict on an expired game, reached under its row lock.
enum SweepDecision {
    Start { backfilled: usize },
    Cancelled,
    Skip,
}

impl MatchmakingService {
    /// Act on every WAITING game whose deadline has passed: bring it up to
    /// its minimum player count with fallback agents and start it, or
    /// cancel it when that cannot be done.
    ///
    /// Games are handled independently; one failure is logged and the
    /// sweep moves on.
    pub async fn handle_waiting_timeouts(
        &self,
        state: &AppState,
    ) -> Result<Vec<SweepAction>, AppError> {
        let now = OffsetDateTime::now_utc();
        let expired = games::find_expired_waiting(&state.db, now).await?;

        let mut actions = Vec::new();
        for game in expired {
            match self.sweep_one(state, &game.id).await {
                Ok(Some(action)) => actions.push(action),
                Ok(None) => {}
                Err(e) => {
                    warn!(game_id = %game.id, error = %e, "waiting-timeout sweep failed for game");
                }
            }
        }
        Ok(actions)
    }

    /// Handle one expired game. Backfilling and cancellation commit under
    /// the row lock; the start runs in its own transaction afterwards,
    /// through the same path a filling join takes.
    async fn sweep_one(
        &self,
        state: &AppState,
        game_id: &GameId,
    ) -> Result<Option<SweepAction>, AppError> {
        let decision = with_txn(state, |txn| {
            let registry = Arc::clone(&state.registry);
            let game_id = game_id.clone();
            Box::pin(async move {
                let Some(game) = games::find_by_id_locked(txn, &game_id).await? else {
                    return Ok(SweepDecision::Skip);
                };
                let now = OffsetDateTime::now_utc();
                if game.status != MatchmakingStatus::Waiting
                    || game.waiting_deadline.map_or(true, |d| d > now)
                {
                    return Ok(SweepDecision::Skip);
                }
                let rules = registry.rules(game.game_type)?;

                let members = players::find_all_by_game(txn, &game_id).await?;
                let active = members.iter().filter(|p| p.is_active()).count();
                if active == 0 {
                    cancel_locked(txn, game, "no players joined").await?;
                    return Ok(SweepDecision::Cancelled);
                }
                if active >= rules.min_players {
                    return Ok(SweepDecision::Start { backfilled: 0 });
                }

                let seated: HashSet<i64> = members.iter().map(|p| p.agent_version_id).collect();
                let eligible: Vec<_> = rules
                    .fallback_agents
                    .iter()
                    .filter(|f| !seated.contains(&f.agent_version_id))
                    .collect();
                let needed = rules.min_players - active;
                if eligible.len() < needed {
                    cancel_locked(txn, game, "not enough players").await?;
                    return Ok(SweepDecision::Cancelled);
                }

                let mut drafts = Vec::with_capacity(needed);
                for fallback in eligible.into_iter().take(needed) {
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
                    drafts.push(EventDraft::player_joined(seat.id, &seat.display_name));
                }
                events::append_events(txn, &game_id, &drafts).await?;
                Ok(SweepDecision::Start { backfilled: needed })
            })
        })
        .await?;

        match decision {
            SweepDecision::Skip => Ok(None),
            SweepDecision::Cancelled => {
                info!(game_id = %game_id, "expired waiting game cancelled");
                Ok(Some(SweepAction::Cancelled {
                    game_id: game_id.clone(),
                }))
            }
            SweepDecision::Start { backfilled } => {
                self.lifecycle.start_existing_game(state, game_id).await?;
                info!(game_id = %game_id, backfilled, "expired waiting game started");
                Ok(Some(SweepAction::Started {
                    game_id: game_id.clone(),
                    backfilled,
                }))
            }
        }
    }
}
