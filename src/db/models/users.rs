use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use super::{BaseFields, Field, FieldType, Model};

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub base: BaseFields,
    pub email: String,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
}

/// Values supplied when creating a user. Flags left unset take the model defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
}

impl Model for User {
    const MODEL_NAME: &'static str = "User";
    const TABLE: &'static str = "users";

    fn fields() -> Vec<Field> {
        let mut fields = BaseFields::FIELDS.to_vec();
        fields.extend([
            Field::new("email", FieldType::Varchar(255)).unique(),
            Field::new("phone", FieldType::Varchar(20)).nullable(),
            Field::new("password_hash", FieldType::Varchar(255)).nullable(),
            Field::new("is_active", FieldType::Bool).default("true"),
            Field::new("is_verified", FieldType::Bool).default("false"),
        ]);
        fields
    }
}

impl User {
    pub fn new(new: NewUser) -> Self {
        Self {
            base: BaseFields::new(),
            email: new.email,
            phone: new.phone,
            password_hash: new.password_hash,
            is_active: new.is_active.unwrap_or(true),
            is_verified: new.is_verified.unwrap_or(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.base.id
    }

    /// Build and insert a new user.
    pub async fn create(db: &PgPool, new: NewUser) -> anyhow::Result<User> {
        let user = User::new(new);
        user.insert(db).await?;
        Ok(user)
    }

    pub async fn insert(&self, db: &PgPool) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, created_at, updated_at, is_deleted,
                               email, phone, password_hash, is_active, is_verified)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(self.base.id)
        .bind(self.base.created_at)
        .bind(self.base.updated_at)
        .bind(self.base.is_deleted)
        .bind(&self.email)
        .bind(&self.phone)
        .bind(&self.password_hash)
        .bind(self.is_active)
        .bind(self.is_verified)
        .execute(db)
        .await
        .context("insert user")?;
        info!(user_id = %self.base.id, "user inserted");
        Ok(())
    }

    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, created_at, updated_at, is_deleted,
                   email, phone, password_hash, is_active, is_verified
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, created_at, updated_at, is_deleted,
                   email, phone, password_hash, is_active, is_verified
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Persist the mutable columns. `id` and `created_at` are never written, and the stored
    /// `updated_at` never moves backwards even when saving from a stale copy.
    pub async fn save(&mut self, db: &PgPool) -> anyhow::Result<()> {
        self.base.touch();
        let updated_at = sqlx::query_scalar::<_, OffsetDateTime>(
            r#"
            UPDATE users
            SET updated_at = GREATEST(updated_at, $2), is_deleted = $3, email = $4,
                phone = $5, password_hash = $6, is_active = $7, is_verified = $8
            WHERE id = $1
            RETURNING updated_at
            "#,
        )
        .bind(self.base.id)
        .bind(self.base.updated_at)
        .bind(self.base.is_deleted)
        .bind(&self.email)
        .bind(&self.phone)
        .bind(&self.password_hash)
        .bind(self.is_active)
        .bind(self.is_verified)
        .fetch_optional(db)
        .await
        .context("update user")?;

        let Some(updated_at) = updated_at else {
            anyhow::bail!("user {} not found", self.base.id);
        };
        self.base.updated_at = updated_at;
        debug!(user_id = %self.base.id, "user saved");
        Ok(())
    }
}
