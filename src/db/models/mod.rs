//! Table mappings for persisted entities.
//!
//! Every entity embeds [`BaseFields`] and describes its columns through the
//! [`Model`] trait, which is enough to emit DDL compatible with the migration
//! scripts and to record the schema in migration bookkeeping.

use serde::Serialize;

mod aerich;
mod base;
mod users;

pub use aerich::Aerich;
pub use base::{BaseFields, BaseModel};
pub use users::{NewUser, User};

/// Application group the models are registered under.
pub const APP_LABEL: &str = "models";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "max_length", rename_all = "snake_case")]
pub enum FieldType {
    Uuid,
    Timestamptz,
    Bool,
    Varchar(u32),
    Serial,
    Jsonb,
}

impl FieldType {
    pub fn sql(&self) -> String {
        match self {
            FieldType::Uuid => "UUID".into(),
            FieldType::Timestamptz => "TIMESTAMPTZ".into(),
            FieldType::Bool => "BOOL".into(),
            FieldType::Varchar(n) => format!("VARCHAR({n})"),
            FieldType::Serial => "SERIAL".into(),
            FieldType::Jsonb => "JSONB".into(),
        }
    }
}

/// Column declaration. `default` is applied by the model on creation, not by the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: &'static str,
    pub field_type: FieldType,
    pub nullable: bool,
    pub unique: bool,
    pub primary_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
}

impl Field {
    pub const fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            nullable: false,
            unique: false,
            primary_key: false,
            default: None,
        }
    }

    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub const fn default(mut self, value: &'static str) -> Self {
        self.default = Some(value);
        self
    }

    fn column_sql(&self) -> String {
        let mut sql = format!("\"{}\" {}", self.name, self.field_type.sql());
        if !self.nullable {
            sql.push_str(" NOT NULL");
        }
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if self.unique {
            sql.push_str(" UNIQUE");
        }
        sql
    }
}

pub trait Model {
    const MODEL_NAME: &'static str;
    const TABLE: &'static str;

    fn fields() -> Vec<Field>;

    fn create_table_sql() -> String {
        let columns = Self::fields()
            .iter()
            .map(|f| format!("    {}", f.column_sql()))
            .collect::<Vec<_>>()
            .join(",\n");
        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (\n{}\n);",
            Self::TABLE,
            columns
        )
    }

    fn meta() -> ModelMeta {
        ModelMeta {
            model: Self::MODEL_NAME,
            table: Self::TABLE,
            fields: Self::fields(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelMeta {
    pub model: &'static str,
    pub table: &'static str,
    pub fields: Vec<Field>,
}

/// Models registered under one application label.
#[derive(Debug, Clone, Serialize)]
pub struct ModelRegistry {
    app: &'static str,
    models: Vec<ModelMeta>,
}

impl ModelRegistry {
    pub fn new(app: &'static str) -> Self {
        Self {
            app,
            models: Vec::new(),
        }
    }

    /// Users plus the migration bookkeeping table.
    pub fn default_models() -> Self {
        let mut registry = Self::new(APP_LABEL);
        registry.register::<User>();
        registry.register::<Aerich>();
        registry
    }

    pub fn register<M: Model>(&mut self) {
        if self.get(M::TABLE).is_none() {
            self.models.push(M::meta());
        }
    }

    pub fn app(&self) -> &'static str {
        self.app
    }

    pub fn get(&self, table: &str) -> Option<&ModelMeta> {
        self.models.iter().find(|m| m.table == table)
    }

    pub fn tables(&self) -> Vec<&'static str> {
        self.models.iter().map(|m| m.table).collect()
    }

    pub fn describe(&self) -> serde_json::Value {
        serde_json::json!(self)
    }
}
