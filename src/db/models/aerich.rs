use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use super::{Field, FieldType, Model};

/// Migration bookkeeping row: one per applied migration version and app.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Aerich {
    pub id: i32,
    pub version: String,
    pub app: String,
    pub content: serde_json::Value,
}

impl Model for Aerich {
    const MODEL_NAME: &'static str = "Aerich";
    const TABLE: &'static str = "aerich";

    fn fields() -> Vec<Field> {
        vec![
            Field::new("id", FieldType::Serial).primary_key(),
            Field::new("version", FieldType::Varchar(255)),
            Field::new("app", FieldType::Varchar(100)),
            Field::new("content", FieldType::Jsonb),
        ]
    }
}

impl Aerich {
    pub async fn record(
        db: &PgPool,
        version: &str,
        app: &str,
        content: &serde_json::Value,
    ) -> sqlx::Result<Aerich> {
        sqlx::query_as::<_, Aerich>(
            r#"
            INSERT INTO aerich (version, app, content)
            VALUES ($1, $2, $3)
            RETURNING id, version, app, content
            "#,
        )
        .bind(version)
        .bind(app)
        .bind(content)
        .fetch_one(db)
        .await
    }

    pub async fn exists(db: &PgPool, version: &str, app: &str) -> sqlx::Result<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS (SELECT 1 FROM aerich WHERE version = $1 AND app = $2)"#,
        )
        .bind(version)
        .bind(app)
        .fetch_one(db)
        .await
    }

    pub async fn latest(db: &PgPool, app: &str) -> sqlx::Result<Option<Aerich>> {
        sqlx::query_as::<_, Aerich>(
            r#"
            SELECT id, version, app, content
            FROM aerich
            WHERE app = $1
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(app)
        .fetch_optional(db)
        .await
    }

    /// Recorded versions for `app`, oldest first.
    pub async fn history(db: &PgPool, app: &str) -> sqlx::Result<Vec<Aerich>> {
        sqlx::query_as::<_, Aerich>(
            r#"
            SELECT id, version, app, content
            FROM aerich
            WHERE app = $1
            ORDER BY id ASC
            "#,
        )
        .bind(app)
        .fetch_all(db)
        .await
    }

    pub async fn delete_version(db: &PgPool, version: &str, app: &str) -> sqlx::Result<u64> {
        let result = sqlx::query(r#"DELETE FROM aerich WHERE version = $1 AND app = $2"#)
            .bind(version)
            .bind(app)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}
