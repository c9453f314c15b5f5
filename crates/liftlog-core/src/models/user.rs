//! Application users. Not searchable.

use super::{expect_updated, validate_text, Entity, Model};
use crate::config::DatabaseConfig;
use crate::db::Database;
use crate::{LiftlogError, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<i64>,
    pub username: String,
    pub email: String,
}

impl User {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
            email: email.into(),
        }
    }

    /// Look up a user by username.
    pub fn find_by_username(db: &Database, username: &str) -> Result<Option<Self>> {
        let conn = db.connection()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM user WHERE username = ?1", Self::COLUMNS),
                params![username],
                Self::from_row,
            )
            .optional()?;
        Ok(user)
    }
}

impl Entity for User {
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
        validate_text("username", &self.username, DatabaseConfig::USERNAME_MAX_LEN)?;
        validate_text("email", &self.email, DatabaseConfig::EMAIL_MAX_LEN)?;
        if !self.email.contains('@') {
            return Err(LiftlogError::validation("email", "must contain '@'"));
        }
        Ok(())
    }

    fn insert(&self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO user (username, email) VALUES (?1, ?2)",
            params![self.username, self.email],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update(&self, conn: &Connection) -> Result<()> {
        let id = self.persisted_id()?;
        let rows = conn.execute(
            "UPDATE user SET username = ?1, email = ?2 WHERE id = ?3",
            params![self.username, self.email, id],
        )?;
        expect_updated(rows, Self::TABLE, id)
    }
}

impl Model for User {
    const TABLE: &'static str = "user";
    const COLUMNS: &'static str = "id, username, email";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(User::new("alice", "alice@example.com").validate().is_ok());
        assert!(User::new("", "alice@example.com").validate().is_err());
        assert!(User::new("alice", "not-an-email").validate().is_err());
    }

    #[test]
    fn test_not_searchable() {
        let user = User::new("alice", "alice@example.com");
        assert!(user.as_searchable().is_none());
    }

    #[test]
    fn test_find_by_username() {
        let db = Database::open_in_memory().unwrap();
        db.write(|tx| User::new("alice", "alice@example.com").insert(tx))
            .unwrap();

        let found = User::find_by_username(&db, "alice").unwrap().unwrap();
        assert_eq!(found.email, "alice@example.com");
        assert!(found.id.is_some());
        assert!(User::find_by_username(&db, "bob").unwrap().is_none());
    }
}
