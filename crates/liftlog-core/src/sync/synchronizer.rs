//! Post-commit replay of a captured change set against the search index.

use super::tracker::TransactionContext;
use crate::config::FailurePolicy;
use crate::search::{SearchIndex, Searchable};
use crate::Result;
use serde::Serialize;
use tracing::{debug, warn};

/// Kind of index mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    Upsert,
    Delete,
}

/// An index mutation that failed after the relational commit.
#[derive(Debug, Clone, Serialize)]
pub struct SyncFailure {
    pub operation: SyncOperation,
    pub namespace: &'static str,
    pub id: Option<i64>,
    pub error: String,
}

/// Outcome of one [`IndexSynchronizer::apply`] run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub upserted: usize,
    pub removed: usize,
    /// Entities in the change set whose type is not searchable.
    pub skipped: usize,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    /// True when every index mutation succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Post-commit hook mirroring committed changes into the search index.
///
/// Built once at startup and shared by every session.
#[derive(Debug, Clone)]
pub struct IndexSynchronizer {
    index: SearchIndex,
    policy: FailurePolicy,
}

impl IndexSynchronizer {
    pub fn new(index: SearchIndex, policy: FailurePolicy) -> Self {
        Self { index, policy }
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Drain the context's change set into the index.
    ///
    /// Upserts added then updated searchable entities and deletes removed
    /// ones, each collection in capture order. The context is left empty, so
    /// a second call without a new commit does nothing. Backend failures
    /// follow the configured [`FailurePolicy`].
    pub async fn apply(&self, context: &mut TransactionContext) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let Some(changes) = context.take_changes() else {
            return Ok(report);
        };

        if !self.index.is_configured() {
            debug!("No search backend; dropping {} captured changes", changes.len());
            return Ok(report);
        }

        for entity in changes.added.iter().chain(changes.updated.iter()) {
            let Some(record) = entity.as_searchable() else {
                report.skipped += 1;
                continue;
            };
            let result = self.index.add_to_index(record).await;
            self.record(&mut report, SyncOperation::Upsert, record, result)?;
        }

        for entity in &changes.deleted {
            let Some(record) = entity.as_searchable() else {
                report.skipped += 1;
                continue;
            };
            let result = self.index.remove_from_index(record).await;
            self.record(&mut report, SyncOperation::Delete, record, result)?;
        }

        debug!(
            "Index sync: {} upserted, {} removed, {} skipped, {} failed",
            report.upserted,
            report.removed,
            report.skipped,
            report.failures.len()
        );
        Ok(report)
    }

    fn record(
        &self,
        report: &mut SyncReport,
        operation: SyncOperation,
        record: &dyn Searchable,
        result: Result<()>,
    ) -> Result<()> {
        match result {
            Ok(()) => {
                match operation {
                    SyncOperation::Upsert => report.upserted += 1,
                    SyncOperation::Delete => report.removed += 1,
                }
                Ok(())
            }
            Err(e) if self.policy == FailurePolicy::Propagate => Err(e),
            Err(e) => {
                warn!(
                    "Index {:?} failed for {}/{:?}; relational row is committed: {}",
                    operation,
                    record.namespace(),
                    record.document_id(),
                    e
                );
                report.failures.push(SyncFailure {
                    operation,
                    namespace: record.namespace(),
                    id: record.document_id(),
                    error: e.to_string(),
                });
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Exercise, Workout};
    use crate::search::{IndexClient, IndexDocument, MemoryIndex, SearchHits};
    use crate::sync::ChangeSet;
    use crate::LiftlogError;
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Fails every call touching `bad_id`, otherwise delegates to memory.
    struct FlakyIndex {
        inner: MemoryIndex,
        bad_id: i64,
    }

    #[async_trait]
    impl IndexClient for FlakyIndex {
        async fn index(&self, namespace: &str, id: i64, fields: &IndexDocument) -> Result<()> {
            if id == self.bad_id {
                return Err(LiftlogError::search(namespace, "shard unavailable"));
            }
            self.inner.index(namespace, id, fields).await
        }

        async fn delete(&self, namespace: &str, id: i64) -> Result<()> {
            if id == self.bad_id {
                return Err(LiftlogError::search(namespace, "shard unavailable"));
            }
            self.inner.delete(namespace, id).await
        }

        async fn search(
            &self,
            namespace: &str,
            expression: &str,
            page: usize,
            per_page: usize,
        ) -> Result<SearchHits> {
            self.inner.search(namespace, expression, page, per_page).await
        }

        async fn available(&self) -> bool {
            true
        }

        fn backend_name(&self) -> &'static str {
            "flaky"
        }
    }

    fn exercise(id: i64, name: &str) -> Box<dyn crate::models::Entity> {
        let mut exercise = Exercise::new(name);
        exercise.id = Some(id);
        Box::new(exercise)
    }

    fn context_with(added: Vec<Box<dyn crate::models::Entity>>) -> TransactionContext {
        let mut context = TransactionContext::default();
        context.store(ChangeSet {
            added,
            ..Default::default()
        });
        context
    }

    fn flaky(bad_id: i64) -> Arc<FlakyIndex> {
        Arc::new(FlakyIndex {
            inner: MemoryIndex::new(),
            bad_id,
        })
    }

    #[tokio::test]
    async fn test_isolate_continues_past_failure() {
        let client = flaky(2);
        let sync = IndexSynchronizer::new(SearchIndex::new(client.clone()), FailurePolicy::Isolate);
        let mut context = context_with(vec![
            exercise(1, "Squat"),
            exercise(2, "Lunge"),
            exercise(3, "Row"),
        ]);

        let report = sync.apply(&mut context).await.unwrap();
        assert_eq!(report.upserted, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].id, Some(2));
        assert_eq!(report.failures[0].operation, SyncOperation::Upsert);
        assert!(!report.is_clean());
        assert_eq!(client.inner.ids("exercise"), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_propagate_aborts_batch() {
        let client = flaky(2);
        let sync =
            IndexSynchronizer::new(SearchIndex::new(client.clone()), FailurePolicy::Propagate);
        let mut context = context_with(vec![
            exercise(1, "Squat"),
            exercise(2, "Lunge"),
            exercise(3, "Row"),
        ]);

        let err = sync.apply(&mut context).await.unwrap_err();
        assert!(err.is_search_backend());
        assert_eq!(client.inner.ids("exercise"), vec![1]);
        assert!(context.changes().is_none());
    }

    #[tokio::test]
    async fn test_order_and_skips() {
        let memory = Arc::new(MemoryIndex::recording());
        let sync = IndexSynchronizer::new(SearchIndex::new(memory.clone()), FailurePolicy::Isolate);

        let mut workout = Workout::new("Legs");
        workout.id = Some(5);
        let mut user = crate::models::User::new("alice", "alice@example.com");
        user.id = Some(5);

        let mut context = TransactionContext::default();
        context.store(ChangeSet {
            added: vec![exercise(2, "Squat"), Box::new(user)],
            updated: vec![exercise(1, "Bench")],
            deleted: vec![Box::new(workout)],
        });

        let report = sync.apply(&mut context).await.unwrap();
        assert_eq!((report.upserted, report.removed, report.skipped), (2, 1, 1));

        let calls = memory.calls();
        assert_eq!(
            calls,
            vec![
                crate::search::IndexCall::Index {
                    namespace: "exercise".into(),
                    id: 2,
                },
                crate::search::IndexCall::Index {
                    namespace: "exercise".into(),
                    id: 1,
                },
                crate::search::IndexCall::Delete {
                    namespace: "workout".into(),
                    id: 5,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_change_set_is_noop() {
        let sync = IndexSynchronizer::new(SearchIndex::unconfigured(), FailurePolicy::Propagate);
        let report = sync.apply(&mut TransactionContext::default()).await.unwrap();
        assert_eq!(report.upserted + report.removed + report.skipped, 0);
    }
}
