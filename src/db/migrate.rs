use sqlx::migrate::{Migrate, Migration, Migrator};
use sqlx::PgPool;
use tracing::info;

use crate::db::models::{Aerich, ModelRegistry};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("migration bookkeeping failed: {0}")]
    Database(#[from] sqlx::Error),
}

/// Version label stored in `aerich`, e.g. `20260226225928_init`.
pub fn version_label(migration: &Migration) -> String {
    format!("{}_{}", migration.version, migration.description)
}

fn up_migrations() -> impl Iterator<Item = &'static Migration> {
    MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
}

/// Apply pending migrations and record every applied version for the registry's app.
/// Returns the versions recorded by this call; empty when already up to date.
pub async fn upgrade(pool: &PgPool, registry: &ModelRegistry) -> Result<Vec<String>, MigrateError> {
    MIGRATOR.run(pool).await?;

    let content = registry.describe();
    let mut recorded = Vec::new();
    for migration in up_migrations() {
        let version = version_label(migration);
        if Aerich::exists(pool, &version, registry.app()).await? {
            continue;
        }
        Aerich::record(pool, &version, registry.app(), &content).await?;
        info!(%version, app = registry.app(), "migration recorded");
        recorded.push(version);
    }
    Ok(recorded)
}

/// Revert the latest applied migration. Returns its version label, or `None` if nothing was applied.
pub async fn downgrade(pool: &PgPool, app: &str) -> Result<Option<String>, MigrateError> {
    let mut applied = {
        let mut conn = pool.acquire().await?;
        conn.ensure_migrations_table().await?;
        conn.list_applied_migrations().await?
    };
    applied.sort_by_key(|m| m.version);

    let Some(latest) = applied.pop() else {
        return Ok(None);
    };
    let target = applied.last().map(|m| m.version).unwrap_or(0);
    MIGRATOR.undo(pool, target).await?;

    let version = up_migrations()
        .find(|m| m.version == latest.version)
        .map(version_label)
        .unwrap_or_else(|| latest.version.to_string());
    let removed = Aerich::delete_version(pool, &version, app).await?;
    info!(%version, app, removed, "migration reverted");
    Ok(Some(version))
}

pub async fn history(pool: &PgPool, app: &str) -> Result<Vec<Aerich>, MigrateError> {
    Ok(Aerich::history(pool, app).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Model, User};

    #[test]
    fn init_migration_is_embedded() {
        let labels: Vec<String> = up_migrations().map(version_label).collect();
        assert_eq!(labels, vec!["20260226225928_init".to_string()]);
    }

    #[test]
    fn init_migration_is_reversible_and_down_is_empty() {
        let down = MIGRATOR
            .iter()
            .find(|m| m.migration_type.is_down_migration())
            .expect("down migration");
        let statements: Vec<&str> = down
            .sql
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with("--"))
            .collect();
        assert!(statements.is_empty());
    }

    async fn public_tables(pool: &PgPool) -> sqlx::Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = 'public' AND table_name NOT LIKE '\_sqlx%'
            ORDER BY table_name
            "#,
        )
        .fetch_all(pool)
        .await
    }

    async fn columns(pool: &PgPool, table: &str) -> sqlx::Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT column_name::text
            FROM information_schema.columns
            WHERE table_schema = 'public' AND table_name = $1
            ORDER BY ordinal_position
            "#,
        )
        .bind(table)
        .fetch_all(pool)
        .await
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires DATABASE_URL pointing at a Postgres server"]
    async fn upgrade_creates_three_tables_once(pool: PgPool) -> anyhow::Result<()> {
        let registry = ModelRegistry::default_models();

        let first = upgrade(&pool, &registry).await?;
        assert_eq!(first, vec!["20260226225928_init".to_string()]);
        assert_eq!(public_tables(&pool).await?, vec!["aerich", "basemodel", "users"]);

        let user_columns: Vec<String> = User::fields().iter().map(|f| f.name.to_string()).collect();
        assert_eq!(columns(&pool, "users").await?, user_columns);
        assert_eq!(
            columns(&pool, "basemodel").await?,
            vec!["id", "created_at", "updated_at", "is_deleted"]
        );
        assert_eq!(
            columns(&pool, "aerich").await?,
            vec!["id", "version", "app", "content"]
        );

        let second = upgrade(&pool, &registry).await?;
        assert!(second.is_empty());
        assert_eq!(public_tables(&pool).await?.len(), 3);
        assert_eq!(history(&pool, registry.app()).await?.len(), 1);
        Ok(())
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires DATABASE_URL pointing at a Postgres server"]
    async fn downgrade_drops_bookkeeping_but_keeps_tables(pool: PgPool) -> anyhow::Result<()> {
        let registry = ModelRegistry::default_models();
        upgrade(&pool, &registry).await?;

        let reverted = downgrade(&pool, registry.app()).await?;
        assert_eq!(reverted.as_deref(), Some("20260226225928_init"));
        assert!(Aerich::latest(&pool, registry.app()).await?.is_none());
        assert_eq!(public_tables(&pool).await?.len(), 3);

        assert_eq!(downgrade(&pool, registry.app()).await?, None);
        Ok(())
    }
}
