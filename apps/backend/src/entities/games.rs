use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "game_type")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameType {
    #[sea_orm(string_value = "CHESS")]
    Chess,
    #[sea_orm(string_value = "TEXAS_HOLDEM")]
    TexasHoldem,
}

impl GameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::Chess => "CHESS",
            GameType::TexasHoldem => "TEXAS_HOLDEM",
        }
    }
}

impl std::fmt::Display for GameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "matchmaking_status")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchmakingStatus {
    #[sea_orm(string_value = "WAITING")]
    Waiting,
    #[sea_orm(string_value = "IN_PROGRESS")]
    InProgress,
    #[sea_orm(string_value = "FINISHED")]
    Finished,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl MatchmakingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchmakingStatus::Waiting => "WAITING",
            MatchmakingStatus::InProgress => "IN_PROGRESS",
            MatchmakingStatus::Finished => "FINISHED",
            MatchmakingStatus::Cancelled => "CANCELLED",
        }
    }

    /// Terminal statuses never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MatchmakingStatus::Finished | MatchmakingStatus::Cancelled
        )
    }
}

impl std::fmt::Display for MatchmakingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "games")]
pub struct Model {
    /// ULID assigned by the application, not the database.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(column_name = "game_type")]
    pub game_type: GameType,
    pub status: MatchmakingStatus,
    #[sea_orm(column_type = "Json")]
    pub state: Json,
    #[sea_orm(column_name = "version")]
    pub version: i32,
    #[sea_orm(column_name = "current_turn")]
    pub current_turn: i32,
    #[sea_orm(column_name = "processing_request_id")]
    pub processing_request_id: Option<String>,
    #[sea_orm(column_name = "processing_started_at")]
    pub processing_started_at: Option<OffsetDateTime>,
    #[sea_orm(column_name = "waiting_deadline")]
    pub waiting_deadline: Option<OffsetDateTime>,
    #[sea_orm(column_name = "is_playground")]
    pub is_playground: bool,
    #[sea_orm(column_name = "created_at")]
    pub created_at: OffsetDateTime,
    #[sea_orm(column_name = "updated_at")]
    pub updated_at: OffsetDateTime,
    #[sea_orm(column_name = "started_at")]
    pub started_at: Option<OffsetDateTime>,
    #[sea_orm(column_name = "finished_at")]
    pub finished_at: Option<OffsetDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::game_players::Entity")]
    GamePlayers,
    #[sea_orm(has_many = "super::game_events::Entity")]
    GameEvents,
}

impl Related<super::game_players::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GamePlayers.def()
    }
}

impl Related<super::game_events::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GameEvents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
