use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::config::db::{db_url, DbProfile};
use crate::error::AppError;

/// Unified database connector that supports different profiles.
/// This function does NOT create schema or run migrations; the deployment
/// owns the schema.
pub async fn connect_db(profile: DbProfile) -> Result<DatabaseConnection, AppError> {
    let url = db_url(profile)?;

    let mut options = ConnectOptions::new(url);
    // Statement logging is driven by the tracing filter, not sqlx itself
    options.sqlx_logging(false);

    let conn = Database::connect(options).await?;
    Ok(conn)
}
