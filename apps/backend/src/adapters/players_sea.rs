//! SeaORM adapter for game players - generic over ConnectionTrait.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, Order, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::entities::game_players;

// Adapter functions return DbErr; repos layer maps to DomainError via From<DbErr>.

/// DTO for seating a player in a game.
#[derive(Debug, Clone)]
pub struct PlayerCreate {
    pub game_id: String,
    pub user_id: Option<i64>,
    pub agent_version_id: i64,
    pub display_name: String,
    pub is_system: bool,
}

/// Insert one player row. The returned row carries the assigned player id.
pub async fn insert_player<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    dto: PlayerCreate,
) -> Result<game_players::Model, sea_orm::DbErr> {
    let now = time::OffsetDateTime::now_utc();
    let player = game_players::ActiveModel {
        id: NotSet,
        game_id: Set(dto.game_id),
        user_id: Set(dto.user_id),
        agent_version_id: Set(dto.agent_version_id),
        display_name: Set(dto.display_name),
        is_system: Set(dto.is_system),
        joined_at: Set(now),
        left_at: Set(None),
    };

    player.insert(conn).await
}

/// All players of a game in join order, departed ones included.
pub async fn find_all_by_game<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    game_id: &str,
) -> Result<Vec<game_players::Model>, sea_orm::DbErr> {
    game_players::Entity::find()
        .filter(game_players::Column::GameId.eq(game_id))
        .order_by(game_players::Column::Id, Order::Asc)
        .all(conn)
        .await
}

/// The not-yet-left player row a user holds in a game, if any.
pub async fn find_active_by_game_and_user<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    game_id: &str,
    user_id: i64,
) -> Result<Option<game_players::Model>, sea_orm::DbErr> {
    game_players::Entity::find()
        .filter(game_players::Column::GameId.eq(game_id))
        .filter(game_players::Column::UserId.eq(user_id))
        .filter(game_players::Column::LeftAt.is_null())
        .one(conn)
        .await
}

/// Number of players currently seated in a game.
pub async fn count_active_by_game<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    game_id: &str,
) -> Result<u64, sea_orm::DbErr> {
    game_players::Entity::find()
        .filter(game_players::Column::GameId.eq(game_id))
        .filter(game_players::Column::LeftAt.is_null())
        .count(conn)
        .await
}

/// Set a player's leave time. Leave times are written exactly once; a player
/// already marked left is untouched, so the call is idempotent.
pub async fn mark_left<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    player_id: i64,
    at: time::OffsetDateTime,
) -> Result<(), sea_orm::DbErr> {
    game_players::Entity::update_many()
        .col_expr(game_players::Column::LeftAt, Expr::val(Some(at)).into())
        .filter(game_players::Column::Id.eq(player_id))
        .filter(game_players::Column::LeftAt.is_null())
        .exec(conn)
        .await?;

    Ok(())
}
