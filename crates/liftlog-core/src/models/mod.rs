//! Relational entities for Liftlog.
//!
//! [`Entity`] is the object-safe view a [`Session`](crate::Session) uses to
//! persist heterogeneous records; [`Model`] adds the typed, per-table
//! lookups. Types that also implement
//! [`Searchable`](crate::search::Searchable) are mirrored into the search
//! index on commit.

mod exercise;
mod user;
mod workout;
mod workout_exercise;

pub use exercise::Exercise;
pub use user::User;
pub use workout::Workout;
pub use workout_exercise::WorkoutExercise;

use crate::db::Database;
use crate::search::Searchable;
use crate::{LiftlogError, Result};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::fmt;

/// A record that can be written through a session.
pub trait Entity: fmt::Debug + Send + Sync {
    /// Table the record lives in.
    fn table_name(&self) -> &'static str;

    /// Primary key, or `None` before the first insert.
    fn id(&self) -> Option<i64>;

    /// Record the primary key assigned by an insert.
    fn set_id(&mut self, id: i64);

    /// Check field constraints before the record enters a session.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Insert the record, returning the new primary key.
    fn insert(&self, conn: &Connection) -> Result<i64>;

    /// Overwrite the stored row with this record's fields.
    fn update(&self, conn: &Connection) -> Result<()>;

    /// Remove the stored row.
    fn delete(&self, conn: &Connection) -> Result<()> {
        let id = self.persisted_id()?;
        let rows = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", self.table_name()),
            params![id],
        )?;
        if rows == 0 {
            return Err(LiftlogError::EntityNotFound {
                table: self.table_name().to_string(),
                id,
            });
        }
        Ok(())
    }

    /// The searchable view of this record, if its type opted in.
    fn as_searchable(&self) -> Option<&dyn Searchable> {
        None
    }

    /// Primary key, or a validation error for records never inserted.
    fn persisted_id(&self) -> Result<i64> {
        self.id().ok_or_else(|| {
            LiftlogError::validation(
                "id",
                format!("{} record has not been persisted", self.table_name()),
            )
        })
    }
}

/// Typed per-table access.
pub trait Model: Entity + Clone + Sized + 'static {
    const TABLE: &'static str;
    /// Column list in the order `from_row` reads them.
    const COLUMNS: &'static str;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Get a record by id.
    fn get(db: &Database, id: i64) -> Result<Option<Self>> {
        let conn = db.connection()?;
        let record = conn
            .query_row(
                &format!("SELECT {} FROM {} WHERE id = ?1", Self::COLUMNS, Self::TABLE),
                params![id],
                Self::from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Get a record by id, failing if it does not exist.
    fn require(db: &Database, id: i64) -> Result<Self> {
        Self::get(db, id)?.ok_or_else(|| LiftlogError::EntityNotFound {
            table: Self::TABLE.to_string(),
            id,
        })
    }

    /// All records, ordered by id.
    fn all(db: &Database) -> Result<Vec<Self>> {
        Self::select_where(db, "1=1 ORDER BY id", Vec::<i64>::new())
    }

    /// Records whose id is in `ids`, in storage order.
    ///
    /// An empty id set returns an empty list without querying.
    fn find_by_ids(db: &Database, ids: &[i64]) -> Result<Vec<Self>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders: Vec<_> = ids.iter().map(|_| "?").collect();
        Self::select_where(
            db,
            &format!("id IN ({})", placeholders.join(",")),
            ids.iter().copied(),
        )
    }

    /// Number of stored records.
    fn count(db: &Database) -> Result<usize> {
        db.count(Self::TABLE)
    }

    #[doc(hidden)]
    fn select_where<P>(db: &Database, clause: &str, params: P) -> Result<Vec<Self>>
    where
        P: IntoIterator,
        P::Item: rusqlite::ToSql,
    {
        let conn = db.connection()?;
        let sql = format!(
            "SELECT {} FROM {} WHERE {}",
            Self::COLUMNS,
            Self::TABLE,
            clause
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params), Self::from_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

/// Check a required, length-limited text field.
pub(crate) fn validate_text(field: &str, value: &str, max_len: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(LiftlogError::validation(field, "must not be empty"));
    }
    if value.chars().count() > max_len {
        return Err(LiftlogError::validation(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }
    Ok(())
}

/// Map an UPDATE that touched no rows to `EntityNotFound`.
pub(crate) fn expect_updated(rows: usize, table: &str, id: i64) -> Result<()> {
    if rows == 0 {
        return Err(LiftlogError::EntityNotFound {
            table: table.to_string(),
            id,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_text() {
        assert!(validate_text("name", "Bench Press", 128).is_ok());
        assert!(validate_text("name", "   ", 128).is_err());
        assert!(validate_text("name", &"x".repeat(129), 128).is_err());
    }

    #[test]
    fn test_find_by_ids_empty_skips_query() {
        let db = Database::open_in_memory().unwrap();
        let found = Exercise::find_by_ids(&db, &[]).unwrap();
        assert!(found.is_empty());
    }
}
