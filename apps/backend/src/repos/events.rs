//! Event log repository functions for the domain layer.

use sea_orm::{ConnectionTrait, DatabaseTransaction};

use crate::adapters::events_sea as events_adapter;
use crate::domain::events::{EventDraft, StoredEvent};
use crate::domain::ids::GameId;
use crate::entities::game_events;
use crate::errors::domain::{DomainError, InfraErrorKind};

impl TryFrom<game_events::Model> for StoredEvent {
    type Error = DomainError;

    fn try_from(model: game_events::Model) -> Result<Self, Self::Error> {
        let game_id = GameId::parse(&model.game_id).map_err(|_| {
            DomainError::infra(
                InfraErrorKind::DataCorruption,
                format!("Stored game id {:?} is not a ULID", model.game_id),
            )
        })?;

        Ok(Self {
            id: model.id,
            game_id,
            event_type: model.event_type,
            payload: model.payload,
            created_at: model.created_at,
        })
    }
}

/// Append a batch of events in draft order. Pure append; the game row and
/// its version are untouched.
pub async fn append_events(
    txn: &DatabaseTransaction,
    game_id: &GameId,
    drafts: &[EventDraft],
) -> Result<(), DomainError> {
    events_adapter::insert_events(txn, game_id.as_str(), drafts).await?;
    Ok(())
}

/// All events of a game in append order.
pub async fn find_all_by_game<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    game_id: &GameId,
) -> Result<Vec<StoredEvent>, DomainError> {
    let events = events_adapter::find_all_by_game(conn, game_id.as_str()).await?;
    events.into_iter().map(StoredEvent::try_from).collect()
}
