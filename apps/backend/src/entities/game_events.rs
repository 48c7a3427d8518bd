use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "game_events")]
pub struct Model {
    /// Monotonic append order within a game is carried by this key.
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(column_name = "game_id")]
    pub game_id: String,
    #[sea_orm(column_name = "event_type")]
    pub event_type: String,
    #[sea_orm(column_type = "Json")]
    pub payload: Json,
    #[sea_orm(column_name = "created_at")]
    pub created_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::games::Entity",
        from = "Column::GameId",
        to = "super::games::Column::Id"
    )]
    Game,
}

impl Related<super::games::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Game.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
