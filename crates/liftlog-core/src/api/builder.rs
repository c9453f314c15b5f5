//! Builder for configuring Liftlog initialization.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{FailurePolicy, SearchEndpoint, Settings};
use crate::db::Database;
use crate::error::Result;
use crate::search::{IndexClient, SearchIndex};
use crate::sync::IndexSynchronizer;
use crate::Liftlog;
use tracing::info;

enum DatabaseSource {
    Path(PathBuf),
    InMemory,
}

enum SearchSource {
    Endpoint(Option<String>),
    Client(Arc<dyn IndexClient>),
}

/// Builder for configuring Liftlog initialization.
///
/// # Example
///
/// ```rust,ignore
/// use liftlog_core::{FailurePolicy, Liftlog};
///
/// let app = Liftlog::builder()
///     .database_path("./liftlog.db")
///     .search_url("http://localhost:9200")
///     .failure_policy(FailurePolicy::Isolate)
///     .build()?;
/// ```
pub struct LiftlogBuilder {
    database: DatabaseSource,
    search: SearchSource,
    failure_policy: FailurePolicy,
}

impl LiftlogBuilder {
    /// Create a builder with an in-memory database and no search backend.
    pub fn new() -> Self {
        Self {
            database: DatabaseSource::InMemory,
            search: SearchSource::Endpoint(None),
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Start from resolved [`Settings`].
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new()
            .database_path(settings.database_path.clone())
            .search_url_opt(settings.search_url.clone())
            .failure_policy(settings.failure_policy)
    }

    /// Store data in the SQLite file at `path`.
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database = DatabaseSource::Path(path.into());
        self
    }

    /// Store data in a private in-memory database.
    pub fn in_memory(mut self) -> Self {
        self.database = DatabaseSource::InMemory;
        self
    }

    /// Search endpoint URL; see [`SearchEndpoint::parse`].
    pub fn search_url(self, url: impl Into<String>) -> Self {
        self.search_url_opt(Some(url.into()))
    }

    fn search_url_opt(mut self, url: Option<String>) -> Self {
        self.search = SearchSource::Endpoint(url);
        self
    }

    /// Use an already-constructed index client.
    pub fn search_client(mut self, client: Arc<dyn IndexClient>) -> Self {
        self.search = SearchSource::Client(client);
        self
    }

    /// How post-commit index failures are handled.
    ///
    /// Default: [`FailurePolicy::Isolate`]
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Build the Liftlog instance.
    pub fn build(self) -> Result<Liftlog> {
        let db = match self.database {
            DatabaseSource::Path(path) => Database::open(path)?,
            DatabaseSource::InMemory => Database::open_in_memory()?,
        };

        let index = match self.search {
            SearchSource::Endpoint(url) => {
                SearchIndex::connect(&SearchEndpoint::parse(url.as_deref())?)?
            }
            SearchSource::Client(client) => SearchIndex::new(client),
        };

        info!(
            "Liftlog ready (search backend: {}, failure policy: {})",
            index.backend_name(),
            self.failure_policy
        );

        Ok(Liftlog {
            db,
            synchronizer: IndexSynchronizer::new(index, self.failure_policy),
        })
    }
}

impl Default for LiftlogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::MemoryIndex;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let app = LiftlogBuilder::new().build().unwrap();
        assert!(app.database().db_path().is_none());
        assert!(!app.search_index().is_configured());
        assert_eq!(app.synchronizer().policy(), FailurePolicy::Isolate);
    }

    #[test]
    fn test_from_settings() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings {
            database_path: temp_dir.path().join("liftlog.db"),
            search_url: Some(format!("fts5:{}", temp_dir.path().join("search.db").display())),
            failure_policy: FailurePolicy::Propagate,
        };

        let app = LiftlogBuilder::from_settings(&settings).build().unwrap();
        assert!(app.database().db_path().is_some());
        assert_eq!(app.search_index().backend_name(), "fts5");
        assert_eq!(app.synchronizer().policy(), FailurePolicy::Propagate);
    }

    #[test]
    fn test_custom_client_and_bad_url() {
        let app = LiftlogBuilder::new()
            .search_client(Arc::new(MemoryIndex::new()))
            .build()
            .unwrap();
        assert_eq!(app.search_index().backend_name(), "memory");

        assert!(LiftlogBuilder::new().search_url("gopher://x").build().is_err());
    }
}
