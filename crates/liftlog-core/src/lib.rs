//! Liftlog Core - workouts, exercises and write-through full-text search.
//!
//! This crate owns the relational store for a fitness tracker and keeps a
//! search index in step with it: every committed insert, update or delete of
//! a searchable record is mirrored into the index after the SQL transaction
//! succeeds, and searches map ranked index hits back to rows in rank order.
//!
//! # Example
//!
//! ```rust,ignore
//! use liftlog_core::{Liftlog, Workout};
//!
//! #[tokio::main]
//! async fn main() -> liftlog_core::Result<()> {
//!     let app = Liftlog::builder()
//!         .database_path("liftlog.db")
//!         .search_url("http://localhost:9200")
//!         .build()?;
//!
//!     let mut session = app.session();
//!     session.add(Workout::new("Push Day"))?;
//!     session.commit().await?;
//!
//!     let (workouts, total) = app.search_records::<Workout>("push", 1, 10).await?;
//!     println!("{} of {} matches", workouts.len(), total);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod search;
pub mod session;
pub mod sync;

mod api;

pub use config::{FailurePolicy, SearchEndpoint, Settings};
pub use db::Database;
pub use error::{LiftlogError, Result};
pub use models::{Entity, Exercise, Model, User, Workout, WorkoutExercise};
pub use search::{
    ElasticsearchClient, Fts5Index, IndexClient, IndexDocument, MemoryIndex, RankedQuery,
    SearchHits, SearchIndex, Searchable, SearchableModel,
};
pub use session::{CommitSummary, Session};
pub use sync::{ChangeSet, ChangeTracker, IndexSynchronizer, SyncReport, TransactionContext};

pub use api::LiftlogBuilder;

/// Main entry point: the relational store plus the search synchronizer.
///
/// Built once at startup; sessions borrow both for the duration of a commit.
pub struct Liftlog {
    db: Database,
    synchronizer: IndexSynchronizer,
}

impl Liftlog {
    /// Create a builder for Liftlog.
    pub fn builder() -> LiftlogBuilder {
        LiftlogBuilder::new()
    }

    /// Open using resolved settings.
    pub fn open(settings: &Settings) -> Result<Self> {
        LiftlogBuilder::from_settings(settings).build()
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn search_index(&self) -> &SearchIndex {
        self.synchronizer.index()
    }

    pub fn synchronizer(&self) -> &IndexSynchronizer {
        &self.synchronizer
    }

    /// Start a unit of work.
    pub fn session(&self) -> Session<'_> {
        Session::new(&self.db, &self.synchronizer)
    }

    /// Whether a search backend is configured and reachable.
    pub async fn search_available(&self) -> bool {
        self.search_index().available().await
    }

    /// Search `T`'s namespace; see [`SearchableModel::search`].
    pub async fn search<T: SearchableModel>(
        &self,
        expression: &str,
        page: usize,
        per_page: usize,
    ) -> Result<(RankedQuery<T>, usize)> {
        T::search(self.search_index(), expression, page, per_page).await
    }

    /// Search and load the matching rows in rank order.
    pub async fn search_records<T: SearchableModel>(
        &self,
        expression: &str,
        page: usize,
        per_page: usize,
    ) -> Result<(Vec<T>, usize)> {
        let (query, total) = self.search::<T>(expression, page, per_page).await?;
        Ok((query.fetch(&self.db)?, total))
    }

    /// Rebuild `T`'s namespace from the relational store.
    pub async fn reindex<T: SearchableModel>(&self) -> Result<usize> {
        T::reindex(&self.db, self.search_index()).await
    }
}
