//! Seed helpers for integration tests.
//!
//! Started games go through the real lifecycle service so the seeded rows
//! match what production writes. Waiting games are seeded straight through
//! the repos where a test needs a deadline in the past or a seat layout
//! matchmaking would refuse.

use serde_json::{json, Value};
use time::OffsetDateTime;

use backend::db::with_txn;
use backend::domain::ids::GameId;
use backend::error::AppError;
use backend::repos::games::{Game, GameCreate, GameUpdate};
use backend::repos::players::{GamePlayer, PlayerCreate};
use backend::repos::{events, games, players};
use backend::services::lifecycle::{AgentSeat, StartGameSpec};
use backend::services::GameLifecycleService;
use backend::state::AppState;
use backend::GameType;

/// Start a counter game through the lifecycle service, one seat per entry
/// of `user_ids`, and return it with its seats.
pub async fn start_counter_game(
    state: &AppState,
    game_type: GameType,
    user_ids: &[i64],
) -> Result<(Game, Vec<GamePlayer>), AppError> {
    let seats = user_ids
        .iter()
        .map(|user_id| AgentSeat {
            agent_version_id: 100 + user_id,
            user_id: Some(*user_id),
            display_name: format!("user-{user_id}"),
        })
        .collect();

    let lifecycle = GameLifecycleService::new();
    let game = lifecycle
        .start_new_game(state, StartGameSpec::new(game_type, seats))
        .await?;
    let players = players::find_all_by_game(&state.db, &game.id).await?;
    Ok((game, players))
}

/// A two-player duel in the Chess slot, started and ready to process.
pub async fn start_duel(state: &AppState) -> Result<(Game, Vec<GamePlayer>), AppError> {
    start_counter_game(state, GameType::Chess, &[1, 2]).await
}

/// Insert a WAITING game directly through the repos, with one seat per
/// entry of `user_ids` and the given matchmaking deadline.
pub async fn seed_waiting_game(
    state: &AppState,
    game_type: GameType,
    user_ids: &[i64],
    deadline: OffsetDateTime,
) -> Result<(GameId, Vec<GamePlayer>), AppError> {
    let env = state.registry.env(game_type)?;
    let game_id = GameId::generate();
    let (fresh, _) = env.new_game(&game_id)?;

    let txn_game_id = game_id.clone();
    let user_ids = user_ids.to_vec();
    let seats = with_txn(state, |txn| {
        Box::pin(async move {
            games::create_game(
                txn,
                GameCreate::new(txn_game_id.as_str(), game_type, fresh.to_value())
                    .with_current_turn(fresh.turn)
                    .with_waiting_deadline(deadline),
            )
            .await?;

            let mut seats = Vec::with_capacity(user_ids.len());
            for user_id in user_ids {
                let seat = players::add_player(
                    txn,
                    PlayerCreate {
                        game_id: txn_game_id.as_str().to_string(),
                        user_id: Some(user_id),
                        agent_version_id: 100 + user_id,
                        display_name: format!("user-{user_id}"),
                        is_system: false,
                    },
                )
                .await?;
                seats.push(seat);
            }
            Ok(seats)
        })
    })
    .await?;

    Ok((game_id, seats))
}

/// Reload a game row.
pub async fn fetch_game(state: &AppState, game_id: &GameId) -> Result<Game, AppError> {
    Ok(games::require_game(&state.db, game_id).await?)
}

/// The event-type column of a game's log, in append order.
pub async fn event_log(state: &AppState, game_id: &GameId) -> Result<Vec<String>, AppError> {
    let stored = events::find_all_by_game(&state.db, game_id).await?;
    Ok(stored.into_iter().map(|e| e.event_type).collect())
}

/// Set one key in a game's state data, bypassing the services.
///
/// Goes through the versioned update, so the row's version advances by one.
pub async fn patch_game_data(
    state: &AppState,
    game_id: &GameId,
    key: &str,
    value: Value,
) -> Result<(), AppError> {
    let game = games::require_game(&state.db, game_id).await?;
    let mut next = game.state.clone();
    next.data.insert(key.to_string(), value);

    let update = GameUpdate::new(game.id.as_str(), game.version).with_state(next.to_value());
    with_txn(state, |txn| {
        Box::pin(async move {
            games::update_game(txn, update).await?;
            Ok(())
        })
    })
    .await
}

/// Flag the current player's clock as expired.
pub async fn expire_clock(state: &AppState, game_id: &GameId) -> Result<(), AppError> {
    patch_game_data(state, game_id, "clock_expired", json!(true)).await
}
