//! In-memory database plumbing for integration tests.
//!
//! Each test gets its own `sqlite::memory:` database with the schema
//! created straight from the entities, so tests are fully isolated and
//! need no external database or migrations.

use std::sync::Arc;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};

use backend::agents::AgentDecisionProvider;
use backend::engine::GameRegistry;
use backend::entities::{game_events, game_players, games};
use backend::error::AppError;
use backend::state::AppState;

/// Connect an isolated in-memory SQLite database and create the schema.
///
/// The pool is capped at one connection: every SQLite in-memory handle is
/// its own database, so a second connection would see empty tables.
pub async fn connect_test_db() -> Result<DatabaseConnection, AppError> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    let conn = Database::connect(options).await?;

    let builder = conn.get_database_backend();
    let schema = Schema::new(builder);
    conn.execute(builder.build(&schema.create_table_from_entity(games::Entity)))
        .await?;
    conn.execute(builder.build(&schema.create_table_from_entity(game_players::Entity)))
        .await?;
    conn.execute(builder.build(&schema.create_table_from_entity(game_events::Entity)))
        .await?;
    Ok(conn)
}

/// Build an [`AppState`] over a fresh in-memory database.
///
/// Rating and billing backends default to the no-op implementations; swap
/// them with the `AppState` builders where a test needs to observe calls.
pub async fn build_test_state(
    registry: GameRegistry,
    agents: Arc<dyn AgentDecisionProvider>,
) -> Result<AppState, AppError> {
    Ok(AppState::new(connect_test_db().await?, registry, agents))
}
