use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

mod app;
mod config;
mod db;
mod graphql;
mod routes;
mod state;

use crate::config::Settings;
use crate::db::{close_db, init_db, migrate};
use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(version, about = "API service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Manage the database schema
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
}

#[derive(Subcommand, Debug)]
enum MigrateAction {
    /// Apply pending migrations
    Upgrade,
    /// Revert the latest migration
    Downgrade,
    /// List recorded migrations
    History,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let settings = Arc::new(Settings::from_env().context("load settings")?);
    tracing::info!(
        environment = %settings.environment,
        debug = settings.debug,
        "settings loaded"
    );
    if settings.is_production() && settings.debug {
        tracing::warn!("debug is enabled in production");
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(settings).await,
        Command::Migrate { action } => run_migrate(&settings, action).await,
    }
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "api=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

async fn run_server(settings: Arc<Settings>) -> anyhow::Result<()> {
    let db = init_db(&settings).await?;

    let result = async {
        let addr = settings.addr()?;
        let app = app::build_app(AppState::new(db.pool.clone(), settings.clone()));
        app::serve(app, addr).await
    }
    .await;

    close_db(db).await;
    result
}

async fn run_migrate(settings: &Settings, action: MigrateAction) -> anyhow::Result<()> {
    let db = init_db(settings).await?;

    let result = async {
        match action {
            MigrateAction::Upgrade => {
                let applied = migrate::upgrade(&db.pool, &db.registry).await?;
                if applied.is_empty() {
                    tracing::info!("schema already up to date");
                }
                for version in applied {
                    println!("applied {version}");
                }
            }
            MigrateAction::Downgrade => match migrate::downgrade(&db.pool, db.registry.app()).await? {
                Some(version) => println!("reverted {version}"),
                None => println!("nothing to revert"),
            },
            MigrateAction::History => {
                for row in migrate::history(&db.pool, db.registry.app()).await? {
                    println!("{}", row.version);
                }
            }
        }
        anyhow::Ok(())
    }
    .await;

    close_db(db).await;
    result
}
