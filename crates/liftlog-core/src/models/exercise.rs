//! Exercises, searchable by name.

use super::{expect_updated, validate_text, Entity, Model};
use crate::config::DatabaseConfig;
use crate::db::Database;
use crate::search::{IndexDocument, Searchable};
use crate::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: Option<i64>,
    /// Unique across all exercises.
    pub name: String,
}

impl Exercise {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    pub fn find_by_name(db: &Database, name: &str) -> Result<Option<Self>> {
        let conn = db.connection()?;
        let exercise = conn
            .query_row(
                &format!("SELECT {} FROM exercise WHERE name = ?1", Self::COLUMNS),
                params![name],
                Self::from_row,
            )
            .optional()?;
        Ok(exercise)
    }
}

impl Entity for Exercise {
    fn table_name(&self) -> &'static str {
        Self::TABLE
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn validate(&self) -> Result<()> {
        validate_text("name", &self.name, DatabaseConfig::NAME_MAX_LEN)
    }

    fn insert(&self, conn: &Connection) -> Result<i64> {
        conn.execute("INSERT INTO exercise (name) VALUES (?1)", params![self.name])?;
        Ok(conn.last_insert_rowid())
    }

    fn update(&self, conn: &Connection) -> Result<()> {
        let id = self.persisted_id()?;
        let rows = conn.execute(
            "UPDATE exercise SET name = ?1 WHERE id = ?2",
            params![self.name, id],
        )?;
        expect_updated(rows, Self::TABLE, id)
    }

    fn as_searchable(&self) -> Option<&dyn Searchable> {
        Some(self)
    }
}

impl Model for Exercise {
    const TABLE: &'static str = "exercise";
    const COLUMNS: &'static str = "id, name";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    }
}

impl Searchable for Exercise {
    fn namespace(&self) -> &'static str {
        Self::TABLE
    }

    fn document_id(&self) -> Option<i64> {
        self.id
    }

    fn index_fields(&self) -> IndexDocument {
        let mut fields = IndexDocument::new();
        fields.insert("name".to_string(), json!(self.name));
        fields
    }
}
