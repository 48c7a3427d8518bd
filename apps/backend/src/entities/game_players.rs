use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "game_players")]
pub struct Model {
    /// Doubles as the player identity used inside game state and results.
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(column_name = "game_id")]
    pub game_id: String,
    /// Owning user; `None` for system-controlled fallback agents.
    #[sea_orm(column_name = "user_id")]
    pub user_id: Option<i64>,
    #[sea_orm(column_name = "agent_version_id")]
    pub agent_version_id: i64,
    #[sea_orm(column_name = "display_name")]
    pub display_name: String,
    #[sea_orm(column_name = "is_system")]
    pub is_system: bool,
    #[sea_orm(column_name = "joined_at")]
    pub joined_at: OffsetDateTime,
    #[sea_orm(column_name = "left_at")]
    pub left_at: Option<OffsetDateTime>,
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
