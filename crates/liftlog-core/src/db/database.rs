//! SQLite database holding users, workouts and exercises.

use crate::config::DatabaseConfig;
use crate::{LiftlogError, Result};
use rusqlite::{Connection, Transaction};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Shared handle to the relational store.
///
/// Cloning the handle shares the underlying connection.
#[derive(Clone)]
pub struct Database {
    db_path: Option<PathBuf>,
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Create or open a database at the given path.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| LiftlogError::Io {
                    message: format!("Failed to create directory {}", parent.display()),
                    path: Some(parent.to_path_buf()),
                    source: Some(e),
                })?;
            }
        }

        let conn = Connection::open(&db_path)?;
        Self::configure_connection(&conn, true)?;
        Self::ensure_schema(&conn)?;

        info!("Opened database at {}", db_path.display());
        Ok(Self {
            db_path: Some(db_path),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure_connection(&conn, false)?;
        Self::ensure_schema(&conn)?;

        Ok(Self {
            db_path: None,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn configure_connection(conn: &Connection, wal: bool) -> Result<()> {
        if wal {
            conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        }
        conn.busy_timeout(DatabaseConfig::BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys=ON; PRAGMA temp_store=MEMORY;")?;
        Ok(())
    }

    /// Ensure the base schema exists.
    fn ensure_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                username VARCHAR(80) NOT NULL UNIQUE,
                email VARCHAR(120) NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS exercise (
                id INTEGER PRIMARY KEY,
                name VARCHAR(128) NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS workout (
                id INTEGER PRIMARY KEY,
                name VARCHAR(128) NOT NULL,
                user_id INTEGER REFERENCES user(id)
            );

            CREATE INDEX IF NOT EXISTS idx_workout_user ON workout(user_id);

            CREATE TABLE IF NOT EXISTS workout_exercises (
                id INTEGER PRIMARY KEY,
                workout_id INTEGER NOT NULL REFERENCES workout(id),
                exercise_id INTEGER NOT NULL REFERENCES exercise(id),
                sets INTEGER,
                reps_min INTEGER,
                reps_max INTEGER,
                superset INTEGER REFERENCES exercise(id),
                exercise_num INTEGER,
                warmup BOOLEAN DEFAULT 0,
                rest INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_workout_exercises_workout
                ON workout_exercises(workout_id);
            "#,
        )?;

        debug!("Ensured relational schema");
        Ok(())
    }

    /// Get the database path, or `None` for an in-memory database.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Lock the shared connection.
    pub fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| LiftlogError::lock_poisoned())
    }

    /// Run `f` inside a write transaction.
    ///
    /// The transaction commits when `f` returns `Ok`; any error rolls it back.
    /// The connection lock is released before this returns.
    pub fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Count rows in a table.
    pub fn count(&self, table: &str) -> Result<usize> {
        let conn = self.connection()?;
        let count: usize =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }
}
