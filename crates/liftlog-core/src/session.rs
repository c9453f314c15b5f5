//! Unit of work over the relational store.
//!
//! Entities queued on a [`Session`] are written in one SQL transaction by
//! [`Session::commit`], which also mirrors searchable changes into the index.

use crate::db::Database;
use crate::models::Entity;
use crate::sync::{ChangeSet, ChangeTracker, IndexSynchronizer, SyncReport, TransactionContext};
use crate::{LiftlogError, Result};
use tracing::{debug, warn};

/// Entities queued since the last commit.
#[derive(Debug, Default)]
pub(crate) struct PendingChanges {
    new: Vec<Box<dyn Entity>>,
    dirty: Vec<Box<dyn Entity>>,
    deleted: Vec<Box<dyn Entity>>,
}

impl PendingChanges {
    fn position(list: &[Box<dyn Entity>], table: &str, id: i64) -> Option<usize> {
        list.iter().position(|e| e.table_name() == table && e.id() == Some(id))
    }

    pub(crate) fn drain(&mut self) -> ChangeSet {
        ChangeSet {
            added: std::mem::take(&mut self.new),
            updated: std::mem::take(&mut self.dirty),
            deleted: std::mem::take(&mut self.deleted),
        }
    }

    fn clear(&mut self) -> usize {
        let count = self.new.len() + self.dirty.len() + self.deleted.len();
        self.new.clear();
        self.dirty.clear();
        self.deleted.clear();
        count
    }
}

/// Rows written by a commit.
#[derive(Debug, Clone, Default)]
pub struct CommitSummary {
    /// Table and assigned id of each inserted row, in insertion order.
    pub inserted: Vec<(&'static str, i64)>,
    pub updated: usize,
    pub deleted: usize,
    pub sync: SyncReport,
}

impl CommitSummary {
    /// Ids assigned to rows inserted into `table`.
    pub fn inserted_ids(&self, table: &str) -> Vec<i64> {
        self.inserted
            .iter()
            .filter(|(t, _)| *t == table)
            .map(|(_, id)| *id)
            .collect()
    }
}

/// A unit of work bound to one database and one synchronizer.
pub struct Session<'a> {
    db: &'a Database,
    synchronizer: &'a IndexSynchronizer,
    pub(crate) pending: PendingChanges,
    pub(crate) context: TransactionContext,
}

impl<'a> Session<'a> {
    pub fn new(db: &'a Database, synchronizer: &'a IndexSynchronizer) -> Self {
        Self {
            db,
            synchronizer,
            pending: PendingChanges::default(),
            context: TransactionContext::default(),
        }
    }

    /// Queue a new entity for insertion.
    ///
    /// An entity that already has an id is queued as an update instead.
    pub fn add<E: Entity + 'static>(&mut self, entity: E) -> Result<()> {
        if entity.id().is_some() {
            return self.update(entity);
        }
        entity.validate()?;
        self.pending.new.push(Box::new(entity));
        Ok(())
    }

    /// Queue a persistent entity to be overwritten.
    pub fn update<E: Entity + 'static>(&mut self, entity: E) -> Result<()> {
        let id = entity.persisted_id()?;
        entity.validate()?;
        let table = entity.table_name();

        if PendingChanges::position(&self.pending.deleted, table, id).is_some() {
            return Err(LiftlogError::validation(
                "id",
                format!("{} {} is already pending deletion", table, id),
            ));
        }

        match PendingChanges::position(&self.pending.dirty, table, id) {
            Some(pos) => self.pending.dirty[pos] = Box::new(entity),
            None => self.pending.dirty.push(Box::new(entity)),
        }
        Ok(())
    }

    /// Queue a persistent entity for deletion.
    pub fn delete<E: Entity + 'static>(&mut self, entity: E) -> Result<()> {
        let id = entity.persisted_id()?;
        let table = entity.table_name();

        if let Some(pos) = PendingChanges::position(&self.pending.dirty, table, id) {
            self.pending.dirty.remove(pos);
        }
        if PendingChanges::position(&self.pending.deleted, table, id).is_none() {
            self.pending.deleted.push(Box::new(entity));
        }
        Ok(())
    }

    /// Number of queued entities.
    pub fn pending_len(&self) -> usize {
        self.pending.new.len() + self.pending.dirty.len() + self.pending.deleted.len()
    }

    pub fn is_clean(&self) -> bool {
        self.pending_len() == 0
    }

    /// Per-commit state; holds the captured change set between capture and
    /// index synchronization.
    pub fn context(&self) -> &TransactionContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut TransactionContext {
        &mut self.context
    }

    /// Discard every queued change.
    pub fn rollback(&mut self) {
        let discarded = self.pending.clear();
        if discarded > 0 {
            debug!("Rolled back {} pending changes", discarded);
        }
    }

    /// Write queued changes in one transaction, then mirror them into the
    /// search index.
    ///
    /// If the SQL transaction fails it is rolled back, the captured changes
    /// are discarded without touching the index, and the error is returned.
    /// Once the transaction has committed, index failures are handled by the
    /// synchronizer's failure policy.
    pub async fn commit(&mut self) -> Result<CommitSummary> {
        ChangeTracker::capture(self);

        let mut summary = match self.flush() {
            Ok(summary) => summary,
            Err(e) => {
                self.context.take_changes();
                warn!("Commit failed, transaction rolled back: {}", e);
                return Err(e);
            }
        };

        summary.sync = self.synchronizer.apply(&mut self.context).await?;
        Ok(summary)
    }

    /// Write the captured change set: inserts, then updates, then deletes.
    fn flush(&mut self) -> Result<CommitSummary> {
        let Some(changes) = self.context.changes_mut() else {
            return Ok(CommitSummary::default());
        };
        if changes.is_empty() {
            return Ok(CommitSummary::default());
        }

        let assigned = self.db.write(|tx| {
            let mut assigned = Vec::with_capacity(changes.added.len());
            for entity in &changes.added {
                assigned.push(entity.insert(tx)?);
            }
            for entity in &changes.updated {
                entity.update(tx)?;
            }
            for entity in &changes.deleted {
                entity.delete(tx)?;
            }
            Ok(assigned)
        })?;

        let mut summary = CommitSummary {
            updated: changes.updated.len(),
            deleted: changes.deleted.len(),
            ..Default::default()
        };
        for (entity, id) in changes.added.iter_mut().zip(assigned) {
            entity.set_id(id);
            summary.inserted.push((entity.table_name(), id));
        }

        debug!(
            "Committed {} inserts, {} updates, {} deletes",
            summary.inserted.len(),
            summary.updated,
            summary.deleted
        );
        Ok(summary)
    }
}
