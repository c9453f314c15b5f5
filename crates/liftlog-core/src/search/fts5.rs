//! SQLite FTS5 index backend.
//!
//! Documents from every namespace share one FTS5 virtual table; the
//! namespace and id are stored as unindexed columns and the text fields are
//! flattened into a single indexed `body` column.

use super::client::{page_offset, IndexClient, IndexDocument, SearchHits};
use super::query::build_fts5_query;
use crate::config::SearchConfig;
use crate::{LiftlogError, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info};

/// Statistics about an FTS5 index.
#[derive(Debug, Clone)]
pub struct Fts5Stats {
    pub table_name: String,
    pub row_count: usize,
    pub tokenizer: String,
}

/// FTS5-backed [`IndexClient`].
pub struct Fts5Index {
    db_path: Option<PathBuf>,
    conn: Arc<Mutex<Connection>>,
    table_name: String,
    tokenizer: String,
}

impl Fts5Index {
    /// Create or open an index database at the given path.
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
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::with_connection(conn, Some(db_path))
    }

    /// Open a private in-memory index.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, None)
    }

    fn with_connection(conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        let index = Self {
            db_path,
            conn: Arc::new(Mutex::new(conn)),
            table_name: SearchConfig::FTS5_TABLE_NAME.to_string(),
            tokenizer: SearchConfig::FTS5_TOKENIZER.to_string(),
        };
        index.create_table()?;
        Ok(index)
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| LiftlogError::lock_poisoned())
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Create the FTS5 virtual table.
    fn create_table(&self) -> Result<()> {
        let conn = self.connection()?;
        let sql = format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS {} USING fts5(
                namespace UNINDEXED,
                doc_id UNINDEXED,
                fields UNINDEXED,
                body,
                tokenize='{}'
            )",
            self.table_name, self.tokenizer
        );
        conn.execute(&sql, [])?;
        debug!("Ensured FTS5 table: {}", self.table_name);
        Ok(())
    }

    /// Check if the FTS5 table exists.
    pub fn table_exists(&self) -> Result<bool> {
        let conn = self.connection()?;
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [&self.table_name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Remove every document in a namespace.
    pub fn clear_namespace(&self, namespace: &str) -> Result<usize> {
        let conn = self.connection()?;
        let removed = conn.execute(
            &format!("DELETE FROM {} WHERE namespace = ?1", self.table_name),
            params![namespace],
        )?;
        info!("Cleared {} documents from {}", removed, namespace);
        Ok(removed)
    }

    /// Optimize the FTS5 index.
    pub fn optimize(&self) -> Result<()> {
        let conn = self.connection()?;
        let sql = format!(
            "INSERT INTO {}({}) VALUES('optimize')",
            self.table_name, self.table_name
        );
        conn.execute(&sql, [])?;
        debug!("Optimized FTS5 index");
        Ok(())
    }

    /// Get statistics about the FTS5 index.
    pub fn stats(&self) -> Result<Fts5Stats> {
        let conn = self.connection()?;
        let row_count: usize = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.table_name),
            [],
            |row| row.get(0),
        )?;

        Ok(Fts5Stats {
            table_name: self.table_name.clone(),
            row_count,
            tokenizer: self.tokenizer.clone(),
        })
    }

    fn upsert_document(&self, namespace: &str, id: i64, fields: &IndexDocument) -> Result<()> {
        let fields_json = serde_json::to_string(fields)?;
        let body = flatten_fields(fields);

        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "DELETE FROM {} WHERE namespace = ?1 AND doc_id = ?2",
                self.table_name
            ),
            params![namespace, id],
        )?;
        tx.execute(
            &format!(
                "INSERT INTO {} (namespace, doc_id, fields, body) VALUES (?1, ?2, ?3, ?4)",
                self.table_name
            ),
            params![namespace, id, fields_json, body],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn delete_document(&self, namespace: &str, id: i64) -> Result<()> {
        let conn = self.connection()?;
        conn.execute(
            &format!(
                "DELETE FROM {} WHERE namespace = ?1 AND doc_id = ?2",
                self.table_name
            ),
            params![namespace, id],
        )?;
        Ok(())
    }

    fn search_documents(
        &self,
        namespace: &str,
        expression: &str,
        page: usize,
        per_page: usize,
    ) -> Result<SearchHits> {
        // page_offset keeps offset + per_page within i64.
        let offset = page_offset(page, per_page)? as i64;
        let fts5_query = build_fts5_query(expression);
        if fts5_query.is_empty() {
            return Ok(SearchHits::empty());
        }

        let conn = self.connection()?;
        let table = &self.table_name;

        let count_sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} MATCH ?1 AND namespace = ?2",
            table, table
        );
        let total: usize = match conn.query_row(&count_sql, params![fts5_query, namespace], |row| {
            row.get(0)
        }) {
            Ok(total) => total,
            Err(e) => {
                // Malformed MATCH expressions surface here, not at prepare time.
                error!("FTS5 count query failed for {:?}: {}", fts5_query, e);
                return Ok(SearchHits::empty());
            }
        };
        if total == 0 {
            return Ok(SearchHits::empty());
        }

        let sql = format!(
            "SELECT CAST(doc_id AS INTEGER) FROM {} WHERE {} MATCH ?1 AND namespace = ?2
             ORDER BY rank, CAST(doc_id AS INTEGER) LIMIT ?3 OFFSET ?4",
            table, table
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![fts5_query, namespace, per_page as i64, offset],
            |row| row.get::<_, i64>(0),
        )?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }

        Ok(SearchHits { ids, total })
    }
}

/// Join the text and numeric field values into one searchable body.
fn flatten_fields(fields: &IndexDocument) -> String {
    fields
        .values()
        .filter_map(|value| match value {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl IndexClient for Fts5Index {
    async fn index(&self, namespace: &str, id: i64, fields: &IndexDocument) -> Result<()> {
        self.upsert_document(namespace, id, fields)
    }

    async fn delete(&self, namespace: &str, id: i64) -> Result<()> {
        self.delete_document(namespace, id)
    }

    async fn search(
        &self,
        namespace: &str,
        expression: &str,
        page: usize,
        per_page: usize,
    ) -> Result<SearchHits> {
        self.search_documents(namespace, expression, page, per_page)
    }

    async fn available(&self) -> bool {
        self.table_exists().unwrap_or(false)
    }

    fn backend_name(&self) -> &'static str {
        "fts5"
    }
}
