use clap::{Parser, ValueEnum};

use backend::config::db::DbProfile;
use backend::infra::db::connect_db;
use migration::{migrate, MigrationCommand};

#[derive(Clone, Copy, ValueEnum)]
enum Env {
    Prod,
    Test,
}

#[derive(Parser)]
#[command(name = "migration")]
#[command(about = "Gambit database migration tool")]
struct Args {
    /// up | down | fresh | reset | refresh | status
    command: String,

    /// Runtime environment
    #[arg(short, long, value_enum, default_value = "test")]
    env: Env,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .without_time()
        .with_target(false)
        .with_env_filter("migration=info,sqlx=warn")
        .init();

    let args = Args::parse();
    let Some(command) = MigrationCommand::parse(&args.command) else {
        eprintln!(
            "Unknown command: {}. Use: up | down | fresh | reset | refresh | status",
            args.command
        );
        std::process::exit(2);
    };
    let profile = match args.env {
        Env::Prod => DbProfile::Prod,
        Env::Test => DbProfile::Test,
    };

    let db = match connect_db(profile).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("❌ failed to connect: {e}");
            std::process::exit(1);
        }
    };

    if migrate(&db, command).await.is_err() {
        std::process::exit(1);
    }
}
