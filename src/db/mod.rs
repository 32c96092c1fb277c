use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::config::Settings;
use models::ModelRegistry;

pub mod migrate;
pub mod models;

/// Connection pool plus the models registered against it.
/// Not `Clone`: [`close_db`] consumes the only handle.
pub struct Database {
    pub pool: PgPool,
    pub registry: ModelRegistry,
}

/// Open the pool and register the models. Fails if the database is unreachable.
pub async fn init_db(settings: &Settings) -> anyhow::Result<Database> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&settings.database_url)
        .await
        .context("connect to database")?;

    let registry = ModelRegistry::default_models();
    info!(app = registry.app(), tables = ?registry.tables(), "database ready");
    Ok(Database { pool, registry })
}

/// Release every pooled connection.
pub async fn close_db(db: Database) {
    db.pool.close().await;
    info!("database connections closed");
}

pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|e| e.downcast_ref::<sqlx::Error>())
        .filter_map(|e| e.as_database_error())
        .any(|e| e.is_unique_violation())
}
