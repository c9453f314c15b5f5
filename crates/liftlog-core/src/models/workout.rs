//! Workouts, searchable by name.

use super::{expect_updated, validate_text, Entity, Model, WorkoutExercise};
use crate::config::DatabaseConfig;
use crate::db::Database;
use crate::search::{IndexDocument, Searchable};
use crate::Result;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workout {
    pub id: Option<i64>,
    pub name: String,
    /// Creator of the workout.
    pub user_id: Option<i64>,
}

impl Workout {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            user_id: None,
        }
    }

    pub fn with_creator(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Workouts created by a user, ordered by id.
    pub fn for_user(db: &Database, user_id: i64) -> Result<Vec<Self>> {
        Self::select_where(db, "user_id = ?1 ORDER BY id", [user_id])
    }

    /// The exercise lines of this workout.
    pub fn exercises(&self, db: &Database) -> Result<Vec<WorkoutExercise>> {
        WorkoutExercise::for_workout(db, self.persisted_id()?)
    }
}

impl Entity for Workout {
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
        conn.execute(
            "INSERT INTO workout (name, user_id) VALUES (?1, ?2)",
            params![self.name, self.user_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update(&self, conn: &Connection) -> Result<()> {
        let id = self.persisted_id()?;
        let rows = conn.execute(
            "UPDATE workout SET name = ?1, user_id = ?2 WHERE id = ?3",
            params![self.name, self.user_id, id],
        )?;
        expect_updated(rows, Self::TABLE, id)
    }

    fn as_searchable(&self) -> Option<&dyn Searchable> {
        Some(self)
    }
}

impl Model for Workout {
    const TABLE: &'static str = "workout";
    const COLUMNS: &'static str = "id, name, user_id";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            user_id: row.get(2)?,
        })
    }
}

impl Searchable for Workout {
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
