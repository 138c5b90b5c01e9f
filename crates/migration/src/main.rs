use clap::{Parser, Subcommand};
use sea_orm::Database;
use sea_orm_migration::prelude::*;

/// Schema maintenance for the spartito store.
#[derive(Parser, Debug)]
#[command(name = "spartito-migrate")]
struct Cli {
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./spartito.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Option<Step>,
}

#[derive(Subcommand, Debug)]
enum Step {
    /// Apply pending migrations (the default).
    Up {
        #[arg(long)]
        steps: Option<u32>,
    },
    /// Roll back the latest migrations, one unless `--steps` says otherwise.
    Down {
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
    /// Drop every table and migrate from scratch.
    Fresh,
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let db = Database::connect(&cli.database_url).await?;

    match cli.command.unwrap_or(Step::Up { steps: None }) {
        Step::Up { steps } => migration::Migrator::up(&db, steps).await?,
        Step::Down { steps } => migration::Migrator::down(&db, Some(steps)).await?,
        Step::Fresh => migration::Migrator::fresh(&db).await?,
        Step::Status => migration::Migrator::status(&db).await?,
    }

    Ok(())
}
