use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_query::extension::postgres::Type as PgType;
use sea_orm_migration::sea_query::{ColumnDef, ForeignKeyAction, Index, Table};

#[derive(DeriveMigrationName)]
pub struct Migration;

// ----- Iden enums for tables & columns -----
#[derive(Iden)]
enum Games {
    Table,
    Id,
    GameType,
    Status,
    State,
    Version,
    CurrentTurn,
    ProcessingRequestId,
    ProcessingStartedAt,
    WaitingDeadline,
    IsPlayground,
    CreatedAt,
    UpdatedAt,
    StartedAt,
    FinishedAt,
}

#[derive(Iden)]
enum GameTypeEnum {
    #[iden = "game_type"]
    Type,
}

#[derive(Iden)]
enum MatchmakingStatusEnum {
    #[iden = "matchmaking_status"]
    Type,
}

#[derive(Iden)]
enum GamePlayers {
    Table,
    Id,
    GameId,
    UserId,
    AgentVersionId,
    DisplayName,
    IsSystem,
    JoinedAt,
    LeftAt,
}

#[derive(Iden)]
enum GameEvents {
    Table,
    Id,
    GameId,
    EventType,
    Payload,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create Postgres enums
        manager
            .create_type(
                PgType::create()
                    .as_enum(GameTypeEnum::Type)
                    .values(["CHESS", "TEXAS_HOLDEM"])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                PgType::create()
                    .as_enum(MatchmakingStatusEnum::Type)
                    .values(["WAITING", "IN_PROGRESS", "FINISHED", "CANCELLED"])
                    .to_owned(),
            )
            .await?;

        // games table. Ids are ULIDs assigned by the application.
        manager
            .create_table(
                Table::create()
                    .table(Games::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Games::Id)
                            .string_len(26)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Games::GameType)
                            .custom(GameTypeEnum::Type)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Games::Status)
                            .custom(MatchmakingStatusEnum::Type)
                            .not_null()
                            .default("WAITING"),
                    )
                    .col(ColumnDef::new(Games::State).json().not_null())
                    .col(
                        ColumnDef::new(Games::Version)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Games::CurrentTurn)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Games::ProcessingRequestId)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Games::ProcessingStartedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Games::WaitingDeadline)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Games::IsPlayground)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Games::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Games::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Games::StartedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Games::FinishedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Matchmaking scans filter on status + game_type; the sweep orders
        // by deadline.
        manager
            .create_index(
                Index::create()
                    .name("ix_games_status_game_type")
                    .table(Games::Table)
                    .col(Games::Status)
                    .col(Games::GameType)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_games_waiting_deadline")
                    .table(Games::Table)
                    .col(Games::WaitingDeadline)
                    .to_owned(),
            )
            .await?;

        // game_players. The row id doubles as the player identity, so no
        // unique (game_id, user_id) constraint: a user may hold one active
        // seat and any number of departed ones.
        manager
            .create_table(
                Table::create()
                    .table(GamePlayers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GamePlayers::Id)
                            .big_integer()
                            .not_null()
                            .primary_key()
                            .auto_increment(),
                    )
                    .col(
                        ColumnDef::new(GamePlayers::GameId)
                            .string_len(26)
                            .not_null(),
                    )
                    .col(ColumnDef::new(GamePlayers::UserId).big_integer().null())
                    .col(
                        ColumnDef::new(GamePlayers::AgentVersionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GamePlayers::DisplayName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GamePlayers::IsSystem)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(GamePlayers::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GamePlayers::LeftAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_game_players_game_id")
                            .from(GamePlayers::Table, GamePlayers::GameId)
                            .to(Games::Table, Games::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_game_players_game_user")
                    .table(GamePlayers::Table)
                    .col(GamePlayers::GameId)
                    .col(GamePlayers::UserId)
                    .to_owned(),
            )
            .await?;

        // game_events. Append order within a game rides on the primary key.
        manager
            .create_table(
                Table::create()
                    .table(GameEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GameEvents::Id)
                            .big_integer()
                            .not_null()
                            .primary_key()
                            .auto_increment(),
                    )
                    .col(
                        ColumnDef::new(GameEvents::GameId)
                            .string_len(26)
                            .not_null(),
                    )
                    .col(ColumnDef::new(GameEvents::EventType).string().not_null())
                    .col(ColumnDef::new(GameEvents::Payload).json().not_null())
                    .col(
                        ColumnDef::new(GameEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_game_events_game_id")
                            .from(GameEvents::Table, GameEvents::GameId)
                            .to(Games::Table, Games::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_game_events_game_id")
                    .table(GameEvents::Table)
                    .col(GameEvents::GameId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // drop in reverse order + drop index before table
        manager
            .drop_index(
                Index::drop()
                    .name("ix_game_events_game_id")
                    .table(GameEvents::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(GameEvents::Table).to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("ix_game_players_game_user")
                    .table(GamePlayers::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(GamePlayers::Table).to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("ix_games_waiting_deadline")
                    .table(Games::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("ix_games_status_game_type")
                    .table(Games::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Games::Table).to_owned())
            .await?;

        // Drop enum types last; the tables above depend on them
        manager
            .drop_type(PgType::drop().name(MatchmakingStatusEnum::Type).to_owned())
            .await?;

        manager
            .drop_type(PgType::drop().name(GameTypeEnum::Type).to_owned())
            .await?;

        Ok(())
    }
}
