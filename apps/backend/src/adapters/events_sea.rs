//! SeaORM adapter for the game event log - generic over ConnectionTrait.

use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, NotSet, Order, QueryFilter, QueryOrder, Set,
};

use crate::domain::events::EventDraft;
use crate::entities::game_events;

// Adapter functions return DbErr; repos layer maps to DomainError via From<DbErr>.

/// Append a batch of events in draft order.
///
/// Pure append: never touches the game row or its version. A batch insert
/// keeps one lease-held unit of work at one round trip.
pub async fn insert_events<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    game_id: &str,
    drafts: &[EventDraft],
) -> Result<(), sea_orm::DbErr> {
    if drafts.is_empty() {
        return Ok(());
    }

    let now = time::OffsetDateTime::now_utc();
    let rows = drafts.iter().map(|draft| game_events::ActiveModel {
        id: NotSet,
        game_id: Set(game_id.to_string()),
        event_type: Set(draft.event_type.clone()),
        payload: Set(draft.payload.clone()),
        created_at: Set(now),
    });

    game_events::Entity::insert_many(rows).exec(conn).await?;

    Ok(())
}

/// All events of a game in append order.
pub async fn find_all_by_game<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    game_id: &str,
) -> Result<Vec<game_events::Model>, sea_orm::DbErr> {
    game_events::Entity::find()
        .filter(game_events::Column::GameId.eq(game_id))
        .order_by(game_events::Column::Id, Order::Asc)
        .all(conn)
        .await
}
