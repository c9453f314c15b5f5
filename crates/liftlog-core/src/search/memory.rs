//! In-process index backend.
//!
//! Keeps documents in memory, which makes it the backend of choice for
//! running without a search service. Tests can ask it to record every call.

use super::client::{page_offset, IndexClient, IndexDocument, SearchHits};
use super::query::tokenize;
use crate::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// A call received by a [`MemoryIndex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexCall {
    Index { namespace: String, id: i64 },
    Delete { namespace: String, id: i64 },
    Search { namespace: String, expression: String },
}

#[derive(Default)]
struct MemoryState {
    namespaces: BTreeMap<String, BTreeMap<i64, IndexDocument>>,
    calls: Vec<IndexCall>,
}

impl MemoryState {
    fn record(&mut self, enabled: bool, call: impl FnOnce() -> IndexCall) {
        if enabled {
            self.calls.push(call());
        }
    }
}

/// In-memory [`IndexClient`].
///
/// Scoring counts how many document tokens start with a query term; ties
/// are broken by ascending id.
#[derive(Default)]
pub struct MemoryIndex {
    state: Mutex<MemoryState>,
    record_calls: bool,
}

impl MemoryIndex {
    /// An index that keeps documents only.
    pub fn new() -> Self {
        Self::default()
    }

    /// An index that also logs every call, for assertions in tests.
    pub fn recording() -> Self {
        Self {
            record_calls: true,
            ..Self::default()
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every call received so far, oldest first. Always empty unless built
    /// with [`MemoryIndex::recording`].
    pub fn calls(&self) -> Vec<IndexCall> {
        self.state().calls.clone()
    }

    /// Forget recorded calls, keeping documents.
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// The stored document for `id`, if any.
    pub fn document(&self, namespace: &str, id: i64) -> Option<IndexDocument> {
        self.state()
            .namespaces
            .get(namespace)
            .and_then(|docs| docs.get(&id))
            .cloned()
    }

    /// Ids stored in a namespace, ascending.
    pub fn ids(&self, namespace: &str) -> Vec<i64> {
        self.state()
            .namespaces
            .get(namespace)
            .map(|docs| docs.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Number of documents in a namespace.
    pub fn len(&self, namespace: &str) -> usize {
        self.state()
            .namespaces
            .get(namespace)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    pub fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace) == 0
    }
}

fn score(document: &IndexDocument, terms: &[String]) -> usize {
    let tokens: Vec<String> = document
        .values()
        .filter_map(|v| v.as_str())
        .flat_map(tokenize)
        .collect();

    terms
        .iter()
        .map(|term| tokens.iter().filter(|t| t.starts_with(term.as_str())).count())
        .sum()
}

#[async_trait]
impl IndexClient for MemoryIndex {
    async fn index(&self, namespace: &str, id: i64, fields: &IndexDocument) -> Result<()> {
        let mut state = self.state();
        state.record(self.record_calls, || IndexCall::Index {
            namespace: namespace.to_string(),
            id,
        });
        state
            .namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(id, fields.clone());
        Ok(())
    }

    async fn delete(&self, namespace: &str, id: i64) -> Result<()> {
        let mut state = self.state();
        state.record(self.record_calls, || IndexCall::Delete {
            namespace: namespace.to_string(),
            id,
        });
        if let Some(docs) = state.namespaces.get_mut(namespace) {
            docs.remove(&id);
        }
        Ok(())
    }

    async fn search(
        &self,
        namespace: &str,
        expression: &str,
        page: usize,
        per_page: usize,
    ) -> Result<SearchHits> {
        let offset = page_offset(page, per_page)?;
        let mut state = self.state();
        state.record(self.record_calls, || IndexCall::Search {
            namespace: namespace.to_string(),
            expression: expression.to_string(),
        });

        let terms = tokenize(expression);
        if terms.is_empty() {
            return Ok(SearchHits::empty());
        }

        let mut scored: Vec<(usize, i64)> = state
            .namespaces
            .get(namespace)
            .map(|docs| {
                docs.iter()
                    .map(|(id, doc)| (score(doc, &terms), *id))
                    .filter(|(score, _)| *score > 0)
                    .collect()
            })
            .unwrap_or_default();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let total = scored.len();
        let ids = scored
            .into_iter()
            .skip(offset)
            .take(per_page)
            .map(|(_, id)| id)
            .collect();

        Ok(SearchHits { ids, total })
    }

    async fn available(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
