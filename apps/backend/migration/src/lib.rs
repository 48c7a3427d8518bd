pub use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{DatabaseConnection, Statement};

mod m20260823_000001_init; // keep filename + module name in sync

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20260823_000001_init::Migration)]
    }
}

#[derive(Debug, Clone, Copy)]
pub enum MigrationCommand {
    Up,
    Down,
    Fresh,
    Reset,
    Refresh,
    Status,
}

impl MigrationCommand {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "fresh" => Some(Self::Fresh),
            "reset" => Some(Self::Reset),
            "refresh" => Some(Self::Refresh),
            "status" => Some(Self::Status),
            _ => None,
        }
    }
}

/// Run one migration command against an already-open connection.
///
/// Deployments own the schema through this runner; tests build theirs
/// straight from the entities instead.
pub async fn migrate(
    db: &DatabaseConnection,
    command: MigrationCommand,
) -> Result<(), DbErr> {
    let info = db_diagnostics(db).await?;
    tracing::info!("▶ cmd={command:?}  backend={}", info.backend);
    tracing::info!("▶ connected to: {}", info.name);
    tracing::info!("▶ runner sees {} migration(s)", info.defined);

    let result = match command {
        MigrationCommand::Up => Migrator::up(db, None).await,
        MigrationCommand::Down => Migrator::down(db, None).await,
        MigrationCommand::Fresh => Migrator::fresh(db).await,
        MigrationCommand::Reset => Migrator::reset(db).await,
        MigrationCommand::Refresh => Migrator::refresh(db).await,
        MigrationCommand::Status => Migrator::status(db).await,
    };

    match result {
        Ok(()) => {
            tracing::info!("✅ {command:?} OK");
            Ok(())
        }
        Err(e) => {
            tracing::error!("❌ {command:?} failed: {e}");
            Err(e)
        }
    }
}

#[derive(Debug)]
struct DbDiagnostics {
    backend: String,
    name: String,
    defined: usize,
}

async fn db_diagnostics(db: &DatabaseConnection) -> Result<DbDiagnostics, DbErr> {
    let backend = format!("{:?}", db.get_database_backend());

    let name_query = match db.get_database_backend() {
        sea_orm::DatabaseBackend::Postgres => Some("select current_database() as name"),
        sea_orm::DatabaseBackend::Sqlite => Some("select sqlite_version() as name"),
        _ => None,
    };
    let name = match name_query {
        Some(sql) => {
            let stmt = Statement::from_string(db.get_database_backend(), sql.to_owned());
            match db.query_one(stmt).await? {
                Some(row) => row.try_get("", "name")?,
                None => "<unknown>".to_owned(),
            }
        }
        None => "<unsupported>".to_owned(),
    };

    Ok(DbDiagnostics {
        backend,
        name,
        defined: <Migrator as MigratorTrait>::migrations().len(),
    })
}
