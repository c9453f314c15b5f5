//! The searchable capability and rank-preserving result materialization.

use super::client::{IndexDocument, SearchIndex};
use crate::db::Database;
use crate::models::{Entity, Model};
use crate::Result;
use std::collections::HashMap;
use std::marker::PhantomData;
use tracing::info;

/// Opt-in capability for entities mirrored into the search index.
///
/// Implementors return `Some(self)` from
/// [`Entity::as_searchable`](crate::models::Entity::as_searchable) so the
/// synchronizer can find them in a change set.
pub trait Searchable: Send + Sync {
    /// Index namespace; the entity's table name.
    fn namespace(&self) -> &'static str;

    /// Document key; `None` until the entity has been inserted.
    fn document_id(&self) -> Option<i64>;

    /// Fields sent to the index.
    fn index_fields(&self) -> IndexDocument;
}

/// Lazy, rank-ordered selection of rows by id.
///
/// Nothing touches the database until [`fetch`](RankedQuery::fetch); an empty
/// query never issues SQL.
#[derive(Debug, Clone)]
pub struct RankedQuery<T> {
    ids: Vec<i64>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Model> RankedQuery<T> {
    pub fn new(ids: Vec<i64>) -> Self {
        Self {
            ids,
            _marker: PhantomData,
        }
    }

    /// A query that matches nothing.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Ids in rank order.
    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Load the rows, ordered exactly as the index ranked them.
    ///
    /// Ids whose rows no longer exist are skipped.
    pub fn fetch(&self, db: &Database) -> Result<Vec<T>> {
        if self.ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_id: HashMap<i64, T> = T::find_by_ids(db, &self.ids)?
            .into_iter()
            .filter_map(|row| row.id().map(|id| (id, row)))
            .collect();

        Ok(self.ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}

/// `search()` and `reindex()` for every searchable model.
#[allow(async_fn_in_trait)]
pub trait SearchableModel: Model + Searchable {
    /// Search this model's namespace. `page` starts at 1.
    ///
    /// Returns the lazy rank-ordered query and the total match count.
    async fn search(
        index: &SearchIndex,
        expression: &str,
        page: usize,
        per_page: usize,
    ) -> Result<(RankedQuery<Self>, usize)> {
        let hits = index
            .query_index(Self::TABLE, expression, page, per_page)
            .await?;
        if hits.total == 0 {
            return Ok((RankedQuery::empty(), 0));
        }
        Ok((RankedQuery::new(hits.ids), hits.total))
    }

    /// Upsert every stored row into the index, returning the number of upserts.
    async fn reindex(db: &Database, index: &SearchIndex) -> Result<usize> {
        if !index.is_configured() {
            info!("Skipping reindex of {}: no search backend", Self::TABLE);
            return Ok(0);
        }

        let records = Self::all(db)?;
        for record in &records {
            index.add_to_index(record).await?;
        }

        info!("Reindexed {} {} records", records.len(), Self::TABLE);
        Ok(records.len())
    }
}

impl<T: Model + Searchable> SearchableModel for T {}
