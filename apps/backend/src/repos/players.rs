//! Player repository functions for the domain layer.

use sea_orm::{ConnectionTrait, DatabaseTransaction};
use time::OffsetDateTime;

use crate::adapters::players_sea as players_adapter;
use crate::domain::ids::GameId;
use crate::entities::game_players;
use crate::errors::domain::{DomainError, InfraErrorKind};

pub use players_adapter::PlayerCreate;

/// Player domain model. The row id doubles as the player identity used in
/// game state, events, and results.
#[derive(Debug, Clone, PartialEq)]
pub struct GamePlayer {
    pub id: i64,
    pub game_id: GameId,
    /// `None` for system-controlled fallback agents.
    pub user_id: Option<i64>,
    pub agent_version_id: i64,
    pub display_name: String,
    pub is_system: bool,
    pub joined_at: OffsetDateTime,
    pub left_at: Option<OffsetDateTime>,
}

impl GamePlayer {
    /// Whether the player is still seated.
    pub fn is_active(&self) -> bool {
        self.left_at.is_none()
    }
}

impl TryFrom<game_players::Model> for GamePlayer {
    type Error = DomainError;

    fn try_from(model: game_players::Model) -> Result<Self, Self::Error> {
        let game_id = GameId::parse(&model.game_id).map_err(|_| {
            DomainError::infra(
                InfraErrorKind::DataCorruption,
                format!("Stored game id {:?} is not a ULID", model.game_id),
            )
        })?;

        Ok(Self {
            id: model.id,
            game_id,
            user_id: model.user_id,
            agent_version_id: model.agent_version_id,
            display_name: model.display_name,
            is_system: model.is_system,
            joined_at: model.joined_at,
            left_at: model.left_at,
        })
    }
}

/// Seat a player. The returned model carries the assigned player id.
pub async fn add_player(
    txn: &DatabaseTransaction,
    dto: PlayerCreate,
) -> Result<GamePlayer, DomainError> {
    let player = players_adapter::insert_player(txn, dto).await?;
    GamePlayer::try_from(player)
}

/// All players of a game in join order, departed ones included.
pub async fn find_all_by_game<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    game_id: &GameId,
) -> Result<Vec<GamePlayer>, DomainError> {
    let players = players_adapter::find_all_by_game(conn, game_id.as_str()).await?;
    players.into_iter().map(GamePlayer::try_from).collect()
}

/// The active (not-left) player a user holds in a game, if any.
pub async fn find_active_by_game_and_user<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    game_id: &GameId,
    user_id: i64,
) -> Result<Option<GamePlayer>, DomainError> {
    let player =
        players_adapter::find_active_by_game_and_user(conn, game_id.as_str(), user_id).await?;
    player.map(GamePlayer::try_from).transpose()
}

/// Number of players currently seated in a game.
pub async fn count_active<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    game_id: &GameId,
) -> Result<u64, DomainError> {
    let count = players_adapter::count_active_by_game(conn, game_id.as_str()).await?;
    Ok(count)
}

/// Set a player's leave time; idempotent, and an already-left player is
/// never overwritten.
pub async fn mark_left(
    txn: &DatabaseTransaction,
    player_id: i64,
    at: OffsetDateTime,
) -> Result<(), DomainError> {
    players_adapter::mark_left(txn, player_id, at).await?;
    Ok(())
}
