//! Index client contract and the configured-or-not handle around it.

use super::elasticsearch::ElasticsearchClient;
use super::fts5::Fts5Index;
use super::memory::MemoryIndex;
use super::searchable::Searchable;
use crate::config::SearchEndpoint;
use crate::{LiftlogError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Indexable fields of one entity, as sent to the backend.
pub type IndexDocument = serde_json::Map<String, serde_json::Value>;

/// Ranked identifiers for one page of results, plus the total match count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHits {
    pub ids: Vec<i64>,
    pub total: usize,
}

impl SearchHits {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Row offset of a 1-indexed page.
///
/// Rejects a zero page or page size, and any page whose last row would not
/// fit in an `i64`, so backends can pass the offset and size straight to
/// SQL or HTTP.
pub fn page_offset(page: usize, per_page: usize) -> Result<usize> {
    if page == 0 {
        return Err(LiftlogError::validation("page", "pages start at 1"));
    }
    if per_page == 0 {
        return Err(LiftlogError::validation("per_page", "must be at least 1"));
    }
    (page - 1)
        .checked_mul(per_page)
        .filter(|offset| {
            offset
                .checked_add(per_page)
                .is_some_and(|end| i64::try_from(end).is_ok())
        })
        .ok_or_else(|| {
            LiftlogError::validation(
                "page",
                format!("page {} of size {} is out of range", page, per_page),
            )
        })
}

/// Operations consumed from a search backend.
///
/// `page` is 1-indexed; [`SearchIndex`] validates it with [`page_offset`]
/// before calling in.
#[async_trait]
pub trait IndexClient: Send + Sync {
    /// Upsert the document for `id` in `namespace`, overwriting any previous one.
    async fn index(&self, namespace: &str, id: i64, fields: &IndexDocument) -> Result<()>;

    /// Remove the document for `id`. Removing a missing document succeeds.
    async fn delete(&self, namespace: &str, id: i64) -> Result<()>;

    /// Query `namespace`, returning one page of ids in relevance order.
    async fn search(
        &self,
        namespace: &str,
        expression: &str,
        page: usize,
        per_page: usize,
    ) -> Result<SearchHits>;

    /// Whether the backend is reachable.
    async fn available(&self) -> bool;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}

/// Shared handle to the configured search backend, if any.
///
/// With no backend every operation completes immediately without I/O:
/// writes do nothing and searches return no hits.
#[derive(Clone, Default)]
pub struct SearchIndex {
    client: Option<Arc<dyn IndexClient>>,
}

impl SearchIndex {
    /// A handle with no backend.
    pub fn unconfigured() -> Self {
        Self { client: None }
    }

    /// Wrap an existing client.
    pub fn new(client: Arc<dyn IndexClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// Build the backend named by `endpoint`.
    pub fn connect(endpoint: &SearchEndpoint) -> Result<Self> {
        let client: Arc<dyn IndexClient> = match endpoint {
            SearchEndpoint::Unconfigured => {
                info!("No search endpoint configured; search is disabled");
                return Ok(Self::unconfigured());
            }
            SearchEndpoint::Elasticsearch(url) => Arc::new(ElasticsearchClient::new(url.clone())?),
            SearchEndpoint::Fts5(path) => Arc::new(Fts5Index::open(path)?),
            SearchEndpoint::Memory => Arc::new(MemoryIndex::new()),
        };
        info!("Using {} search backend", client.backend_name());
        Ok(Self::new(client))
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    pub fn backend_name(&self) -> &'static str {
        self.client
            .as_ref()
            .map(|c| c.backend_name())
            .unwrap_or("none")
    }

    /// Whether a backend is configured and reachable.
    pub async fn available(&self) -> bool {
        match &self.client {
            Some(client) => client.available().await,
            None => false,
        }
    }

    /// Upsert the index document for a searchable record.
    pub async fn add_to_index(&self, record: &dyn Searchable) -> Result<()> {
        let Some(client) = &self.client else {
            return Ok(());
        };
        let namespace = record.namespace();
        let id = persisted_document_id(record)?;
        let fields = record.index_fields();

        client.index(namespace, id, &fields).await?;
        debug!("Indexed {}/{}", namespace, id);
        Ok(())
    }

    /// Remove the index document for a searchable record.
    pub async fn remove_from_index(&self, record: &dyn Searchable) -> Result<()> {
        let Some(client) = &self.client else {
            return Ok(());
        };
        let namespace = record.namespace();
        let id = persisted_document_id(record)?;

        client.delete(namespace, id).await?;
        debug!("Removed {}/{} from index", namespace, id);
        Ok(())
    }

    /// Query one namespace. `page` starts at 1.
    pub async fn query_index(
        &self,
        namespace: &str,
        expression: &str,
        page: usize,
        per_page: usize,
    ) -> Result<SearchHits> {
        page_offset(page, per_page)?;
        let Some(client) = &self.client else {
            return Ok(SearchHits::empty());
        };

        let hits = client.search(namespace, expression, page, per_page).await?;
        debug!(
            "Search {:?} in {} page {} returned {} of {} hits",
            expression,
            namespace,
            page,
            hits.ids.len(),
            hits.total
        );
        Ok(hits)
    }
}

impl std::fmt::Debug for SearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchIndex")
            .field("backend", &self.backend_name())
            .finish()
    }
}

fn persisted_document_id(record: &dyn Searchable) -> Result<i64> {
    record.document_id().ok_or_else(|| {
        LiftlogError::validation(
            "id",
            format!("{} record has no id to index under", record.namespace()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Exercise;

    #[tokio::test]
    async fn test_unconfigured_is_noop() {
        let index = SearchIndex::unconfigured();
        let mut squat = Exercise::new("Squat");
        squat.id = Some(1);

        assert!(!index.is_configured());
        assert!(!index.available().await);
        index.add_to_index(&squat).await.unwrap();
        index.remove_from_index(&squat).await.unwrap();

        let hits = index.query_index("exercise", "squat", 1, 10).await.unwrap();
        assert_eq!(hits, SearchHits::empty());
    }

    #[tokio::test]
    async fn test_page_validation() {
        let index = SearchIndex::unconfigured();
        assert!(index.query_index("exercise", "squat", 0, 10).await.is_err());
        assert!(index.query_index("exercise", "squat", 1, 0).await.is_err());

        let err = index
            .query_index("exercise", "squat", usize::MAX, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, LiftlogError::Validation { ref field, .. } if field == "page"));
        assert!(index
            .query_index("exercise", "squat", 1, usize::MAX)
            .await
            .is_err());
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(1, 25).unwrap(), 0);
        assert_eq!(page_offset(3, 10).unwrap(), 20);
        assert!(page_offset(usize::MAX, 10).is_err());
        assert!(page_offset(usize::MAX / 2, 4).is_err());
        // Offset fits but the page end does not.
        assert!(page_offset(2, i64::MAX as usize).is_err());
        assert_eq!(page_offset(1, i64::MAX as usize).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unsaved_record_is_rejected() {
        let memory = Arc::new(MemoryIndex::recording());
        let index = SearchIndex::new(memory.clone());

        let err = index.add_to_index(&Exercise::new("Squat")).await.unwrap_err();
        assert!(matches!(err, LiftlogError::Validation { .. }));
        assert!(memory.calls().is_empty());
    }

    #[test]
    fn test_connect_unconfigured() {
        let index = SearchIndex::connect(&SearchEndpoint::Unconfigured).unwrap();
        assert!(!index.is_configured());
        assert_eq!(index.backend_name(), "none");

        let index = SearchIndex::connect(&SearchEndpoint::Memory).unwrap();
        assert_eq!(index.backend_name(), "memory");
    }
}
