//! # Meetings API Main Entry Point

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use meetings::{
    config::ConfigLoader,
    db,
    migration::{Migrator, MigratorTrait},
    seeds,
    server::run_server,
    telemetry,
};

/// Meetings API server
#[derive(Parser)]
#[command(name = "meetings")]
#[command(about = "Meetings, tasks and events API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Apply migrations, seed and start the server (default)
    Serve,
    /// Apply pending migrations and exit
    Migrate,
    /// Create the bootstrap admin if missing and exit
    Seed,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;
    telemetry::init_tracing(&config).context("initializing telemetry")?;

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted) = config.redacted_json() {
        tracing::debug!(config = %redacted, "Effective configuration");
    }

    let db = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Migrate => {
            Migrator::up(&db, None).await.context("applying migrations")?;
            tracing::info!("Migrations applied");
        }
        Commands::Seed => {
            seeds::seed_bootstrap_admin(&db, &config, Utc::now()).await?;
        }
        Commands::Serve => {
            if config.run_migrations {
                Migrator::up(&db, None).await.context("applying migrations")?;
            }
            seeds::seed_bootstrap_admin(&db, &config, Utc::now()).await?;
            run_server(config, db).await?;
        }
    }

    Ok(())
}
