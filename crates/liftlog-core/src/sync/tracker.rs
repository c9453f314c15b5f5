//! Pre-commit capture of a session's pending changes.

use crate::models::Entity;
use crate::session::Session;
use tracing::debug;

/// Entities pending in one transaction, in the order they were queued.
///
/// An entity appears in at most one of the three collections.
#[derive(Debug, Default)]
pub struct ChangeSet {
    pub(crate) added: Vec<Box<dyn Entity>>,
    pub(crate) updated: Vec<Box<dyn Entity>>,
    pub(crate) deleted: Vec<Box<dyn Entity>>,
}

impl ChangeSet {
    pub fn added(&self) -> &[Box<dyn Entity>] {
        &self.added
    }

    pub fn updated(&self) -> &[Box<dyn Entity>] {
        &self.updated
    }

    pub fn deleted(&self) -> &[Box<dyn Entity>] {
        &self.deleted
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.updated.len() + self.deleted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// State scoped to one commit of one session.
///
/// Holds the captured [`ChangeSet`] between pre-commit and post-commit; it is
/// empty before capture and again after the synchronizer drains it.
#[derive(Debug, Default)]
pub struct TransactionContext {
    changes: Option<ChangeSet>,
}

impl TransactionContext {
    pub fn changes(&self) -> Option<&ChangeSet> {
        self.changes.as_ref()
    }

    pub(crate) fn changes_mut(&mut self) -> Option<&mut ChangeSet> {
        self.changes.as_mut()
    }

    pub(crate) fn store(&mut self, changes: ChangeSet) {
        self.changes = Some(changes);
    }

    /// Remove and return the captured change set, leaving the context empty.
    pub fn take_changes(&mut self) -> Option<ChangeSet> {
        self.changes.take()
    }
}

/// Pre-commit hook.
pub struct ChangeTracker;

impl ChangeTracker {
    /// Move the session's pending entities into its transaction context.
    ///
    /// Every pending entity is captured whether or not it is searchable.
    /// Only in-memory state is touched.
    pub fn capture(session: &mut Session<'_>) {
        let changes = session.pending.drain();
        debug!(
            "Captured change set: {} added, {} updated, {} deleted",
            changes.added.len(),
            changes.updated.len(),
            changes.deleted.len()
        );
        session.context.store(changes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FailurePolicy;
    use crate::db::Database;
    use crate::models::{Exercise, User, Workout};
    use crate::search::SearchIndex;
    use crate::sync::IndexSynchronizer;

    #[test]
    fn test_capture_moves_every_pending_entity() {
        let db = Database::open_in_memory().unwrap();
        let sync = IndexSynchronizer::new(SearchIndex::unconfigured(), FailurePolicy::Isolate);
        let mut session = Session::new(&db, &sync);

        let mut bench = Exercise::new("Bench");
        bench.id = Some(4);
        let mut legs = Workout::new("Legs");
        legs.id = Some(2);

        session.add(Exercise::new("Squat")).unwrap();
        session.add(User::new("dana", "dana@example.com")).unwrap();
        session.update(bench).unwrap();
        session.delete(legs).unwrap();

        ChangeTracker::capture(&mut session);
        assert!(session.is_clean());

        let changes = session.context().changes().unwrap();
        assert_eq!(changes.len(), 4);
        let added: Vec<_> = changes.added().iter().map(|e| e.table_name()).collect();
        assert_eq!(added, vec!["exercise", "user"]);
        assert_eq!(changes.updated()[0].id(), Some(4));
        assert_eq!(changes.deleted()[0].table_name(), "workout");
    }

    #[test]
    fn test_capture_of_clean_session_is_empty() {
        let db = Database::open_in_memory().unwrap();
        let sync = IndexSynchronizer::new(SearchIndex::unconfigured(), FailurePolicy::Isolate);
        let mut session = Session::new(&db, &sync);

        ChangeTracker::capture(&mut session);
        assert!(session.context().changes().unwrap().is_empty());
        assert!(session.context_mut().take_changes().is_some());
        assert!(session.context().changes().is_none());
    }
}
