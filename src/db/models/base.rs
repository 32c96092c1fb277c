use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{Field, FieldType, Model};

/// Columns shared by every table. Embedded with `#[sqlx(flatten)]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct BaseFields {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    // Reserved; nothing reads or sets it yet.
    pub is_deleted: bool,
}

impl BaseFields {
    pub const FIELDS: [Field; 4] = [
        Field::new("id", FieldType::Uuid).primary_key(),
        Field::new("created_at", FieldType::Timestamptz),
        Field::new("updated_at", FieldType::Timestamptz),
        Field::new("is_deleted", FieldType::Bool).default("false"),
    ];

    pub fn new() -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            is_deleted: false,
        }
    }

    /// Marks a mutation. `updated_at` never moves backwards.
    pub fn touch(&mut self) {
        let now = OffsetDateTime::now_utc();
        if now > self.updated_at {
            self.updated_at = now;
        }
    }
}

impl Default for BaseFields {
    fn default() -> Self {
        Self::new()
    }
}

/// The `basemodel` ancestor table. Never instantiated on its own.
pub struct BaseModel;

impl Model for BaseModel {
    const MODEL_NAME: &'static str = "BaseModel";
    const TABLE: &'static str = "basemodel";

    fn fields() -> Vec<Field> {
        BaseFields::FIELDS.to_vec()
    }
}
