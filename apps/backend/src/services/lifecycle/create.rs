use serde_json::Value;
use time::OffsetDateTime;
use tracing::info;

use super::start::advance_into_play;
use super::GameLifecycleService;
use crate::db::with_txn;
use crate::domain::events::EventDraft;
use crate::domain::ids::GameId;
use crate::domain::state::GameState;
use crate::engine::SeatedPlayer;
use crate::entities::games::{GameType, MatchmakingStatus};
use crate::error::AppError;
use crate::errors::domain::{DomainError, ValidationKind};
use crate::repos::games::{Game, GameCreate, GameUpdate};
use crate::repos::players::PlayerCreate;
use crate::repos::{events, games, players};
use crate::state::AppState;

/// One requested seat for [`GameLifecycleService::start_new_game`].
#[derive(Debug, Clone)]
pub struct AgentSeat {
    pub agent_version_id: i64,
    /// `None` seats a system-controlled agent.
    pub user_id: Option<i64>,
    pub display_name: String,
}

/// Inputs for starting a fully seated game in one step.
#[derive(Debug, Clone)]
pub struct StartGameSpec {
    pub game_type: GameType,
    /// One entry per seat, in caller order; the environment may reorder.
    pub agents: Vec<AgentSeat>,
    pub is_playground: bool,
    /// Playground-only state overlay applied after initialization.
    pub custom_state: Option<Value>,
}

impl StartGameSpec {
    pub fn new(game_type: GameType, agents: Vec<AgentSeat>) -> Self {
        Self {
            game_type,
            agents,
            is_playground: false,
            custom_state: None,
        }
    }

    pub fn playground(mut self) -> Self {
        self.is_playground = true;
        self
    }

    pub fn with_custom_state(mut self, state: Value) -> Self {
        self.custom_state = Some(state);
        self
    }
}

impl GameLifecycleService {
    /// Insert a zero-player WAITING game for matchmaking to fill.
    pub async fn create_empty_game(
        &self,
        state: &AppState,
        game_type: GameType,
        is_playground: bool,
    ) -> Result<Game, AppError> {
        let env = state.registry.env(game_type)?;
        let rules = state.registry.rules(game_type)?;

        let game_id = GameId::generate();
        let (fresh, creation_events) = env.new_game(&game_id)?;
        let deadline = OffsetDateTime::now_utc() + rules.waiting_timeout;

        let txn_game_id = game_id.clone();
        let game = with_txn(state, |txn| {
            Box::pin(async move {
                let mut create = GameCreate::new(txn_game_id.as_str(), game_type, fresh.to_value())
                    .with_current_turn(fresh.turn)
                    .with_waiting_deadline(deadline);
                if is_playground {
                    create = create.playground();
                }
                let created = games::create_game(txn, create).await?;
                events::append_events(txn, &txn_game_id, &creation_events).await?;
                Ok(created)
            })
        })
        .await?;

        info!(game_id = %game.id, game_type = %game_type, "created empty game");
        Ok(game)
    }

    /// Create, seat, and start a game in one transaction.
    ///
    /// Used for playground scenarios and system-driven matches; matchmade
    /// games go through [`GameLifecycleService::start_existing_game`]
    /// instead.
    pub async fn start_new_game(
        &self,
        state: &AppState,
        spec: StartGameSpec,
    ) -> Result<Game, AppError> {
        let StartGameSpec {
            game_type,
            agents,
            is_playground,
            custom_state,
        } = spec;

        if custom_state.is_some() && !is_playground {
            return Err(DomainError::validation(
                ValidationKind::InvalidInput,
                "Custom state is only allowed in playground games",
            )
            .into());
        }

        let env = state.registry.env(game_type)?;
        let rules = state.registry.rules(game_type)?;
        let seat_count = agents.len();
        if seat_count < rules.min_players || seat_count > rules.max_players {
            return Err(DomainError::validation(
                ValidationKind::InvalidInput,
                format!(
                    "{game_type} takes {}..={} players, got {seat_count}",
                    rules.min_players, rules.max_players
                ),
            )
            .into());
        }

        let game_id = GameId::generate();
        let (fresh, creation_events) = env.new_game(&game_id)?;

        let txn_env = env.clone();
        let txn_game_id = game_id.clone();
        let game = with_txn(state, |txn| {
            Box::pin(async move {
                let mut create =
                    GameCreate::new(txn_game_id.as_str(), game_type, fresh.to_value())
                        .with_current_turn(fresh.turn);
                if is_playground {
                    create = create.playground();
                }
                let created = games::create_game(txn, create).await?;

                let mut drafts = creation_events;
                let mut seated: Vec<SeatedPlayer> = Vec::with_capacity(agents.len());
                for agent in &agents {
                    let row = players::add_player(
                        txn,
                        PlayerCreate {
                            game_id: txn_game_id.as_str().to_string(),
                            user_id: agent.user_id,
                            agent_version_id: agent.agent_version_id,
                            display_name: agent.display_name.clone(),
                            is_system: agent.user_id.is_none(),
                        },
                    )
                    .await?;
                    drafts.push(EventDraft::player_joined(row.id, &row.display_name));
                    seated.push(SeatedPlayer {
                        player_id: row.id,
                        agent_version_id: row.agent_version_id,
                        display_name: row.display_name,
                        is_system: row.is_system,
                    });
                }

                let mut play_state = fresh;
                let order = advance_into_play(txn_env.as_ref(), &mut play_state, &seated)?;
                let play_state = match custom_state {
                    Some(custom) => {
                        let merged = overlay_custom_state(&play_state, custom)?;
                        txn_env.validate_custom_state(&merged)?;
                        merged
                    }
                    None => play_state,
                };
                drafts.push(EventDraft::game_started(&order));

                games::ensure_status_transition(created.status, MatchmakingStatus::InProgress)?;
                let updated = games::update_game(
                    txn,
                    GameUpdate::new(txn_game_id.as_str(), created.version)
                        .with_state(play_state.to_value())
                        .with_status(MatchmakingStatus::InProgress)
                        .with_current_turn(play_state.turn)
                        .with_started_at(OffsetDateTime::now_utc()),
                )
                .await?;
                events::append_events(txn, &txn_game_id, &drafts).await?;
                Ok(updated)
            })
        })
        .await?;

        info!(
            game_id = %game.id,
            game_type = %game_type,
            players = seat_count,
            "game started"
        );
        Ok(game)
    }
}

/// Merge a playground overlay onto a freshly initialized state.
///
/// Only the game-specific data merges. Turn bookkeeping and the finished
/// flag stay with the engine: a scenario may reshape the game data but
/// never the control fields.
fn overlay_custom_state(fresh: &GameState, custom: Value) -> Result<GameState, DomainError> {
    let overlay = GameState::from_client_value(custom)?;
    let mut merged = fresh.clone();
    for (key, value) in overlay.data {
        merged.data.insert(key, value);
    }
    Ok(merged)
}
